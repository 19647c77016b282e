use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use uteexpress_auth::is_shipper;
use uteexpress_core::Entity;

use crate::app::dto::LocationUpdate;
use crate::app::errors::{forbidden, json_error};
use crate::context::SessionHandle;

/// Location ping from a shipper's device. CSRF-exempt: devices post JSON
/// with the session cookie only.
pub async fn update_location(
    Extension(session): Extension<SessionHandle>,
    Json(update): Json<LocationUpdate>,
) -> Response {
    if !is_shipper(session.principal()) {
        return forbidden();
    }

    let Some(shipper) = session.context().and_then(|c| c.shipper_affiliation()) else {
        return json_error(
            StatusCode::NOT_FOUND,
            "no_shipper_affiliation",
            "this account is not linked to a shipper",
        );
    };

    if !(-90.0..=90.0).contains(&update.lat) || !(-180.0..=180.0).contains(&update.lng) {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_coordinates",
            "lat must be within [-90, 90] and lng within [-180, 180]",
        );
    }

    tracing::info!(
        shipper_id = %shipper.id(),
        shipper_code = shipper.code(),
        lat = update.lat,
        lng = update.lng,
        "shipper location updated"
    );

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "shipper_id": shipper.id().to_string(),
            "shipper_code": shipper.code(),
            "lat": update.lat,
            "lng": update.lng,
            "received_at": Utc::now(),
        })),
    )
        .into_response()
}
