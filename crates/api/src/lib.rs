//! HTTP API: cookie sessions, impersonation and tenant-scoped resources.

pub mod app;
pub mod config;
pub mod context;
pub mod cookies;
pub mod middleware;
