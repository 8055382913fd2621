//! Terminal Payment Engine
//!
//! The core of a service that polls an external payment provider on behalf of many independent
//! merchants, deduplicates the resulting records into durable storage, and serves them to
//! authenticated field devices (point-of-sale terminals).
//!
//! The library is divided into three main sections:
//! 1. Database management ([`mod@sqlite`] and the contracts in [`mod@traits`]). SQLite is the
//!    supported backend. You should never need to access the database directly; use the public
//!    APIs instead. The record types live in [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@api`]): the ingestion engine that runs once per scheduler
//!    tick, and the device gateway that authenticates terminals and serves their merchant's
//!    payment feed.
//! 3. The credential vault ([`mod@vault`]): authenticated encryption for provider access
//!    tokens at rest and one-way hashing for device API keys.
//!
//! Provider access is abstracted behind the [`traits::PaymentFeed`] trait so that the engine
//! never sees provider-specific JSON; see the `mercado_tools` crate for the concrete client.
pub mod api;
pub mod db_types;
mod sqlite;
pub mod traits;
pub mod vault;

pub use api::{
    DeviceApi,
    DeviceApiError,
    IngestApi,
    IngestError,
    IngestOptions,
    IngestSummary,
    MerchantBinding,
    PassOutcome,
    RegisterDevice,
    RegisteredDevice,
    BLOCKED_DEVICE_MESSAGE,
};
pub use sqlite::{SqliteDatabase, MIGRATOR};
pub use traits::{DeviceManagement, PaymentFeed, PaymentStore};
