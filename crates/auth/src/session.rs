//! Session identity: what the server remembers about one browser session.
//!
//! Holds at most one principal, one warehouse affiliation and one shipper
//! affiliation. Every accessor treats missing state as absence (`None` /
//! `false`), never as an error.

use chrono::{DateTime, Utc};

use uteexpress_core::{Entity, PrincipalId, ShipperId, WarehouseId};
use uteexpress_logistics::{Shipper, Warehouse};

use crate::Principal;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    principal: Option<Principal>,
    warehouse: Option<Warehouse>,
    shipper: Option<Shipper>,
    login_error: Option<String>,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            principal: None,
            warehouse: None,
            shipper: None,
            login_error: None,
            created_at: now,
            last_accessed_at: now,
        }
    }

    // ── bindings ────────────────────────────────────────────────────────────

    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn set_warehouse_affiliation(&mut self, warehouse: Warehouse) {
        self.warehouse = Some(warehouse);
    }

    pub fn warehouse_affiliation(&self) -> Option<&Warehouse> {
        self.warehouse.as_ref()
    }

    pub fn set_shipper_affiliation(&mut self, shipper: Shipper) {
        self.shipper = Some(shipper);
    }

    pub fn shipper_affiliation(&self) -> Option<&Shipper> {
        self.shipper.as_ref()
    }

    // ── derived queries ─────────────────────────────────────────────────────

    pub fn is_logged_in(&self) -> bool {
        self.principal.is_some()
    }

    pub fn has_warehouse_affiliation(&self) -> bool {
        self.warehouse.is_some()
    }

    pub fn has_shipper_affiliation(&self) -> bool {
        self.shipper.is_some()
    }

    pub fn current_principal_id(&self) -> Option<PrincipalId> {
        self.principal.as_ref().map(Entity::id)
    }

    pub fn current_username(&self) -> Option<&str> {
        self.principal.as_ref().map(Principal::username)
    }

    pub fn current_warehouse_id(&self) -> Option<WarehouseId> {
        self.warehouse.as_ref().map(Entity::id)
    }

    pub fn current_shipper_id(&self) -> Option<ShipperId> {
        self.shipper.as_ref().map(Entity::id)
    }

    /// Drop principal and both affiliations together.
    ///
    /// Takes `&mut self`, so no reader can observe a half-cleared context; the
    /// session store applies it under its write lock.
    pub fn clear(&mut self) {
        self.principal = None;
        self.warehouse = None;
        self.shipper = None;
    }

    // ── login flash + bookkeeping ───────────────────────────────────────────

    pub fn record_login_failure(&mut self, reason: impl Into<String>) {
        self.login_error = Some(reason.into());
    }

    /// Read-once: the error is removed as it is returned.
    pub fn take_login_error(&mut self) -> Option<String> {
        self.login_error.take()
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewPrincipal, Role};
    use uteexpress_logistics::{NewShipper, NewWarehouse};

    fn principal(username: &str, roles: &[Role]) -> Principal {
        Principal::create(
            PrincipalId::new(),
            NewPrincipal {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                email: None,
                full_name: username.to_string(),
                roles: roles.iter().copied().collect(),
            },
        )
        .unwrap()
    }

    fn warehouse() -> Warehouse {
        Warehouse::register(
            WarehouseId::new(),
            NewWarehouse {
                code: "WH-HN".to_string(),
                name: "Warehouse Hanoi".to_string(),
                address: "Hanoi".to_string(),
                phone: None,
                email: None,
                manager: None,
                total_capacity: 100,
                user_id: None,
            },
        )
        .unwrap()
    }

    fn shipper() -> Shipper {
        Shipper::register(
            ShipperId::new(),
            NewShipper {
                code: "SHP-HN".to_string(),
                name: "Tran Van B".to_string(),
                phone: None,
                email: None,
                vehicle_type: None,
                vehicle_number: None,
                user_id: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn empty_context_answers_absent_everywhere() {
        let ctx = SessionContext::new(Utc::now());
        assert!(!ctx.is_logged_in());
        assert!(ctx.principal().is_none());
        assert!(!ctx.has_warehouse_affiliation());
        assert!(!ctx.has_shipper_affiliation());
        assert_eq!(ctx.current_principal_id(), None);
        assert_eq!(ctx.current_username(), None);
        assert_eq!(ctx.current_warehouse_id(), None);
        assert_eq!(ctx.current_shipper_id(), None);
    }

    #[test]
    fn bindings_are_visible_through_derived_queries() {
        let mut ctx = SessionContext::new(Utc::now());
        let p = principal("warehouse", &[Role::WarehouseStaff]);
        let wh = warehouse();
        ctx.set_principal(p.clone());
        ctx.set_warehouse_affiliation(wh.clone());

        assert!(ctx.is_logged_in());
        assert_eq!(ctx.current_username(), Some("warehouse"));
        assert_eq!(ctx.current_principal_id(), Some(p.id()));
        assert_eq!(ctx.current_warehouse_id(), Some(wh.id()));
        assert!(!ctx.has_shipper_affiliation());
    }

    #[test]
    fn clear_removes_all_three_bindings() {
        let mut ctx = SessionContext::new(Utc::now());
        ctx.set_principal(principal("shipper", &[Role::Shipper]));
        ctx.set_warehouse_affiliation(warehouse());
        ctx.set_shipper_affiliation(shipper());

        ctx.clear();

        assert!(!ctx.is_logged_in());
        assert!(!ctx.has_warehouse_affiliation());
        assert!(!ctx.has_shipper_affiliation());
        assert!(ctx.warehouse_affiliation().is_none());
        assert!(ctx.shipper_affiliation().is_none());
    }

    #[test]
    fn login_error_is_read_once() {
        let mut ctx = SessionContext::new(Utc::now());
        ctx.record_login_failure("Invalid username or password");
        assert_eq!(ctx.login_error(), Some("Invalid username or password"));
        assert_eq!(
            ctx.take_login_error().as_deref(),
            Some("Invalid username or password")
        );
        assert_eq!(ctx.take_login_error(), None);
    }
}
