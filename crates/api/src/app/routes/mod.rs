use axum::{
    Router,
    routing::{get, post},
};

pub mod access_rules;
pub mod auth;
pub mod dashboards;
pub mod shipper;
pub mod system;

/// Router for every endpoint. Access rules are enforced by the session
/// middleware layered on top, not per route.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/whoami", get(system::whoami))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/register", post(auth::register))
        .route("/admin/dashboard", get(dashboards::admin))
        .route("/warehouse/dashboard", get(dashboards::warehouse))
        .route("/shipper/dashboard", get(dashboards::shipper))
        .route("/customer/dashboard", get(dashboards::customer))
        .route("/support/chat", get(dashboards::support))
        .route("/shipper/location", post(shipper::update_location))
        .nest("/admin/access-rules", access_rules::router())
}
