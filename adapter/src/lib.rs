//! # Data API Adapter Library
//!
//! Persistence adapter that maps an authentication framework's entities
//! (users, sessions, verification tokens, accounts) onto a remote HTTP data
//! API, with bulk operations, retry with backoff and validated configuration.
//!
//! ## Modules
//!
//! - [`adapter`] - [`DataApiAdapter`](adapter::DataApiAdapter), wiring configuration into components
//! - [`bulk_operations`] - Batch processor and `update_many` / `delete_many` / `create_many`
//! - [`common`] - Error taxonomy, retry executor and rate limiting
//! - [`config`] - Configuration types, validation and health checks
//! - [`entities`] - Entity operations, mapping and response normalization
//! - [`http`] - Transport seam and its reqwest, retry and cache layers
//! - [`model`] - Model types and record helpers
//! - [`registry`] - Caller-owned adapter registry
//! - [`utils`] - Environment variable helpers
//!
//! The library logs through the `log` facade and never installs a logger.

pub mod adapter;
pub mod bulk_operations;
pub mod common;
pub mod config;
pub mod entities;
pub mod http;
pub mod model;
pub mod registry;
pub mod utils;

pub use adapter::DataApiAdapter;
pub use common::{DataApiError, DataApiResult, ErrorKind};
pub use registry::AdapterRegistry;
