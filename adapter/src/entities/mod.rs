//! Entity-level collaborators of the bulk engine.
//!
//! - `operations`: the [`EntityOperations`] contract
//! - `http_operations`: REST implementation for any model
//! - `mapper`: API paths, field renames and pre-insert validation
//! - `normalizer`: response-shape normalization

pub mod http_operations;
pub mod mapper;
pub mod normalizer;
pub mod operations;

pub use http_operations::HttpEntityOperations;
pub use mapper::{EntityMapper, ValidationOutcome};
pub use normalizer::{normalize_array_response, normalize_single_response};
pub use operations::{EntityOperations, SharedEntityOperations};
