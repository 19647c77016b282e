use serde::{Deserialize, Serialize};

use uteexpress_auth::{Role, SessionContext};
use uteexpress_logistics::{Shipper, Warehouse};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

/// Query flags on `/login`. Present-but-empty (`?error`) counts as set.
#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
    pub logout: Option<String>,
    pub expired: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub login_error: Option<String>,
    pub error: bool,
    pub logged_out: bool,
    pub expired: bool,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub path: String,
    /// Comma-separated role names. Absent means an anonymous caller.
    pub roles: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WarehouseView {
    pub id: String,
    pub code: String,
    pub name: String,
    pub manager: Option<String>,
    pub total_capacity: u32,
}

impl From<&Warehouse> for WarehouseView {
    fn from(w: &Warehouse) -> Self {
        use uteexpress_core::Entity;
        Self {
            id: w.id().to_string(),
            code: w.code().to_string(),
            name: w.name().to_string(),
            manager: w.manager().map(str::to_string),
            total_capacity: w.total_capacity(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShipperView {
    pub id: String,
    pub code: String,
    pub name: String,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
}

impl From<&Shipper> for ShipperView {
    fn from(s: &Shipper) -> Self {
        use uteexpress_core::Entity;
        Self {
            id: s.id().to_string(),
            code: s.code().to_string(),
            name: s.name().to_string(),
            vehicle_type: s.vehicle_type().map(str::to_string),
            vehicle_number: s.vehicle_number().map(str::to_string),
        }
    }
}

/// Resolver view of one session.
#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub logged_in: bool,
    pub principal_id: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub roles: Vec<Role>,
    pub warehouse: Option<WarehouseView>,
    pub shipper: Option<ShipperView>,
}

impl WhoAmI {
    pub fn of(ctx: Option<&SessionContext>) -> Self {
        let principal = ctx.and_then(SessionContext::principal);
        Self {
            logged_in: ctx.is_some_and(SessionContext::is_logged_in),
            principal_id: ctx
                .and_then(SessionContext::current_principal_id)
                .map(|id| id.to_string()),
            username: ctx
                .and_then(SessionContext::current_username)
                .map(str::to_string),
            full_name: principal.map(|p| p.full_name().to_string()),
            roles: principal
                .map(|p| p.roles().iter().copied().collect())
                .unwrap_or_default(),
            warehouse: ctx
                .and_then(SessionContext::warehouse_affiliation)
                .map(WarehouseView::from),
            shipper: ctx
                .and_then(SessionContext::shipper_affiliation)
                .map(ShipperView::from),
        }
    }
}
