//! HTTP API: server config, routing, and request/response mapping.

pub mod app;
pub mod config;

pub use config::ApiConfig;
