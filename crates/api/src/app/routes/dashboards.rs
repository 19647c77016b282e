//! Role landing pages.
//!
//! The middleware has already admitted the caller; each handler still
//! re-checks its role so a misconfigured rule table fails closed.

use axum::{Json, extract::Extension, response::Response};
use serde_json::{Value, json};

use uteexpress_auth::{Role, has_any_role, require_role};

use crate::app::dto::{ShipperView, WarehouseView};
use crate::app::errors::authz_error_to_response;
use crate::context::SessionHandle;

fn page(session: &SessionHandle, role: Role, name: &str) -> Result<Value, Response> {
    require_role(session.principal(), role).map_err(authz_error_to_response)?;
    Ok(json!({
        "dashboard": name,
        "username": session.principal().map(|p| p.username()),
        "full_name": session.principal().map(|p| p.full_name()),
    }))
}

pub async fn admin(Extension(session): Extension<SessionHandle>) -> Result<Json<Value>, Response> {
    page(&session, Role::Admin, "admin").map(Json)
}

pub async fn warehouse(
    Extension(session): Extension<SessionHandle>,
) -> Result<Json<Value>, Response> {
    let mut body = page(&session, Role::WarehouseStaff, "warehouse")?;
    body["warehouse"] = json!(
        session
            .context()
            .and_then(|c| c.warehouse_affiliation())
            .map(WarehouseView::from)
    );
    Ok(Json(body))
}

pub async fn shipper(Extension(session): Extension<SessionHandle>) -> Result<Json<Value>, Response> {
    let mut body = page(&session, Role::Shipper, "shipper")?;
    body["shipper"] = json!(
        session
            .context()
            .and_then(|c| c.shipper_affiliation())
            .map(ShipperView::from)
    );
    Ok(Json(body))
}

pub async fn customer(
    Extension(session): Extension<SessionHandle>,
) -> Result<Json<Value>, Response> {
    page(&session, Role::Customer, "customer").map(Json)
}

pub async fn support(Extension(session): Extension<SessionHandle>) -> Result<Json<Value>, Response> {
    let mut body = page(&session, Role::Support, "support")?;
    // Admins reviewing chats see the escalation queue too.
    body["can_escalate"] = json!(has_any_role(session.principal(), &[Role::Admin]));
    Ok(Json(body))
}
