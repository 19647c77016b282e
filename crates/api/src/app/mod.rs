//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage, policies and the identity service
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Every route, public or not, sits behind the session middleware: it is
/// what decides whether a path needs a login.
pub fn build_app(services: Arc<AppServices>) -> Router {
    routes::router()
        .fallback(routes::system::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services.clone()))
                .layer(axum::middleware::from_fn_with_state(
                    services,
                    middleware::session_middleware,
                )),
        )
}
