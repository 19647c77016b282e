//! HTTP API: configuration, session cookies, access enforcement and routes.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
