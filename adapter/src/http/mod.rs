//! HTTP plumbing between the adapter and the remote data API.
//!
//! - `transport`: the [`HttpTransport`] seam plus URL helpers
//! - `reqwest_transport`: production transport with auth headers and throttling
//! - `retrying`: per-request retry decorator
//! - `cache`: GET response cache decorator

pub mod cache;
pub mod reqwest_transport;
pub mod retrying;
pub mod transport;

pub use cache::{CachedTransport, ResponseCache};
pub use reqwest_transport::ReqwestTransport;
pub use retrying::RetryingTransport;
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, SharedTransport, resource_url,
    with_query,
};
