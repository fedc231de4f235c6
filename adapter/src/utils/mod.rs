//! Small helpers shared across the adapter.

pub mod env;

pub use env::{EnvUtils, EnvVarError};
