//! Role-membership checks over a principal's role set.
//!
//! These take the principal explicitly and never consult a session, so the
//! same functions serve per-request checks and business rules elsewhere.
//!
//! - No IO
//! - No panics
//! - A missing principal holds no roles

use thiserror::Error;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: missing role '{0}'")]
    Forbidden(Role),
}

/// `true` iff `principal` is present and holds `role`.
pub fn has_role(principal: Option<&Principal>, role: Role) -> bool {
    principal.is_some_and(|p| p.roles().contains(&role))
}

/// `true` iff at least one of `roles` is held. Empty `roles` → `false`.
///
/// Stops at the first held role.
pub fn has_any_role(principal: Option<&Principal>, roles: &[Role]) -> bool {
    let Some(principal) = principal else {
        return false;
    };
    roles.iter().any(|r| principal.roles().contains(r))
}

/// `true` iff every one of `roles` is held.
///
/// Stops at the first missing role. A present principal vacuously holds an
/// empty list; a missing principal holds nothing.
pub fn has_all_roles(principal: Option<&Principal>, roles: &[Role]) -> bool {
    let Some(principal) = principal else {
        return false;
    };
    roles.iter().all(|r| principal.roles().contains(r))
}

pub fn is_warehouse_staff(principal: Option<&Principal>) -> bool {
    has_role(principal, Role::WarehouseStaff)
}

pub fn is_shipper(principal: Option<&Principal>) -> bool {
    has_role(principal, Role::Shipper)
}

/// Result-returning form of [`has_role`] for use with `?` in handlers.
pub fn require_role(principal: Option<&Principal>, role: Role) -> Result<(), AuthzError> {
    match principal {
        None => Err(AuthzError::Unauthenticated),
        Some(p) if p.roles().contains(&role) => Ok(()),
        Some(_) => Err(AuthzError::Forbidden(role)),
    }
}
