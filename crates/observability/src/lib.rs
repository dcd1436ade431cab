//! Observability wiring for the authorization service.

pub mod tracing;

pub use tracing::init;
