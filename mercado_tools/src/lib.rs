//! Mercado Tools
//!
//! A small client library for the Mercado Pago payments API, as used by the terminal payment
//! server's ingestion engine. The provider has shipped several incompatible report endpoints
//! over time; this crate hides all of that behind [`MercadoApi`] and the [`MercadoEndpoint`]
//! strategy, and hands callers a single canonical record shape, [`NormalizedPayment`].

mod api;
mod config;
mod data_objects;
mod error;

pub use api::MercadoApi;
pub use config::{MercadoConfig, DEFAULT_MERCADO_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
pub use data_objects::{MercadoEndpoint, NormalizedPayment};
pub use error::MercadoApiError;
