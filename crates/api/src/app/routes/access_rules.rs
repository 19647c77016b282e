//! Admin audit of the URL rule table.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use uteexpress_auth::{Authentication, Role};

use crate::app::dto::ExplainQuery;
use crate::app::errors::json_error;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/explain", get(explain))
}

pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(json!({
        "rules": services.policy.rules(),
        "default": "authenticated",
    }))
}

/// How the table would treat `path` for a hypothetical caller.
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ExplainQuery>,
) -> Response {
    let auth = match query.roles.as_deref() {
        None => Authentication::Anonymous,
        Some(raw) => match parse_roles(raw) {
            Ok(roles) => Authentication::with_roles(roles),
            Err(resp) => return resp,
        },
    };

    let explanation = services.policy.explain(&query.path, &auth);
    (StatusCode::OK, Json(explanation)).into_response()
}

fn parse_roles(raw: &str) -> Result<Vec<Role>, Response> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Role>()
                .map_err(|e| json_error(StatusCode::BAD_REQUEST, "unknown_role", e.to_string()))
        })
        .collect()
}
