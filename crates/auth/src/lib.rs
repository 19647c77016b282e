//! `uteexpress-auth` — pure authentication/authorization boundary.
//!
//! Roles, principals, the URL access policy, CSRF policy and the session
//! identity context. No HTTP and no storage: callers pass every piece of
//! state in explicitly.

pub mod authorize;
pub mod csrf;
pub mod password;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{
    AuthzError, has_all_roles, has_any_role, has_role, is_shipper, is_warehouse_staff,
    require_role,
};
pub use csrf::CsrfPolicy;
pub use password::{Argon2Hasher, CredentialHasher, PasswordHashError};
pub use policy::{
    AccessPolicy, AccessPolicyBuilder, AccessRule, Authentication, Decision, PathPattern,
    PolicyError, PolicyExplanation, Requirement,
};
pub use principal::{NewPrincipal, Principal};
pub use roles::{Role, UnknownRole};
pub use session::SessionContext;
