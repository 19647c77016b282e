use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role identifier used for RBAC.
///
/// The role set is closed: adding a role is a code change, so every `match`
/// over roles (landing pages, rule tables) is checked for exhaustiveness.
///
/// Declaration order is the landing-page priority for principals holding
/// several roles, and is the iteration order of `BTreeSet<Role>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_WAREHOUSE_STAFF")]
    WarehouseStaff,
    #[serde(rename = "ROLE_SHIPPER")]
    Shipper,
    #[serde(rename = "ROLE_SUPPORT")]
    Support,
    #[serde(rename = "ROLE_CUSTOMER")]
    Customer,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::WarehouseStaff,
        Role::Shipper,
        Role::Support,
        Role::Customer,
    ];

    /// Authority name, e.g. `ROLE_WAREHOUSE_STAFF`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::WarehouseStaff => "ROLE_WAREHOUSE_STAFF",
            Role::Shipper => "ROLE_SHIPPER",
            Role::Support => "ROLE_SUPPORT",
            Role::Customer => "ROLE_CUSTOMER",
        }
    }

    /// Name without the `ROLE_` prefix, e.g. `WAREHOUSE_STAFF`.
    pub fn name(&self) -> &'static str {
        &self.as_str()["ROLE_".len()..]
    }

    /// Page a principal with this role lands on after logging in.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::WarehouseStaff => "/warehouse/dashboard",
            Role::Shipper => "/shipper/dashboard",
            Role::Support => "/support/chat",
            Role::Customer => "/customer/dashboard",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts `ROLE_SHIPPER`, `SHIPPER` or `shipper`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        Role::ALL
            .into_iter()
            .find(|r| r.name() == bare)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
