//! `warden-core` — shared kernel for the authorization service.
//!
//! Typed identifiers and the domain error model. No I/O, no HTTP.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{RequestId, UserId};
