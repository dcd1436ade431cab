//! `warden-api` — HTTP surface of the authorization service.

pub mod app;
pub mod context;
pub mod middleware;
