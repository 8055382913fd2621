//! The engine's public API.
//!
//! [`IngestApi`] runs the multi-tenant polling loop; [`DeviceApi`] is the gateway that
//! authenticates field devices and serves their merchant's payment feed.
mod device;
mod errors;
mod ingest;

pub use device::{
    DeviceApi,
    MerchantBinding,
    RegisterDevice,
    RegisteredDevice,
    BLOCKED_DEVICE_MESSAGE,
    DEFAULT_PAYMENT_LIMIT,
    MAX_PAYMENT_LIMIT,
};
pub use errors::{DeviceApiError, IngestError};
pub use ingest::{IngestApi, IngestOptions, IngestSummary, MerchantPollOutcome, PassOutcome};
