//! Contracts between the engine and its collaborators.
//!
//! * [`PaymentStore`] is the durable storage contract for the ingestion side: listing
//!   merchants, committing a deduplicated batch per merchant, and reading the recent feed.
//! * [`DeviceManagement`] is the storage contract for the device gateway: device lookup and
//!   registration, liveness bookkeeping, and the merchant rows the admin surface produces.
//! * [`PaymentFeed`] abstracts the outbound provider call, so the engine never sees raw
//!   provider JSON and tests can script the feed.
//!
//! All methods take `&self` and backends are `Clone`; the SQLite backend hands out pooled
//! connections per call.
mod device_management;
mod payment_feed;
mod payment_store;

pub use device_management::{DeviceManagement, DeviceStoreError};
pub use payment_feed::{PaymentFeed, PaymentFeedError};
pub use payment_store::{InsertBatchResult, PaymentStore, PaymentStoreError};
