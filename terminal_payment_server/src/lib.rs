//! # Terminal payment server
//!
//! The REST front end for the terminal payment engine. It is responsible for:
//! * Scheduling the background ingestion worker that polls the payment provider for every
//!   merchant on file.
//! * Authenticating point-of-sale devices and serving their merchant's payment feed.
//! * A small operator surface for managing merchants and blocking devices.
//!
//! ## Configuration
//! The server is configured via `TPS_*` environment variables. See [config](config/index.html)
//! for the full list.
//!
//! ## Routes
//! * `/health`: a health check that returns a 200 OK response.
//! * `/register`: device registration. The only route that returns a plaintext API key.
//! * `/status`, `/payments`, `/heartbeat`: the device surface, authenticated by bearer key.
//! * `/poll` and `/admin/...`: the operator surface, authenticated by the operator key.
pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod poll_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
