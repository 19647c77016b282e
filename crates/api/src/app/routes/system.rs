use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::dto::WhoAmI;
use crate::app::errors::json_error;
use crate::context::SessionHandle;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<SessionHandle>) -> impl IntoResponse {
    Json(WhoAmI::of(session.context()))
}

pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "not found")
}
