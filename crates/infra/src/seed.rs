//! Default accounts for a fresh installation.
//!
//! Runs only against an empty principal table: one warehouse staff account
//! owning warehouse `WH-HN` and one shipper account owning shipper `SHP-HN`.

use std::collections::BTreeSet;

use thiserror::Error;

use uteexpress_auth::{CredentialHasher, NewPrincipal, PasswordHashError, Principal, Role};
use uteexpress_core::{DomainError, Entity, PrincipalId, ShipperId, WarehouseId};
use uteexpress_logistics::{NewShipper, NewWarehouse, Shipper, Warehouse};

use crate::repository::{
    PrincipalRepository, RepositoryError, ShipperRepository, WarehouseRepository,
};

pub const WAREHOUSE_USERNAME: &str = "warehouse";
pub const SHIPPER_USERNAME: &str = "shipper";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Hash(#[from] PasswordHashError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Principals already existed; nothing was written.
    Skipped { existing_principals: usize },
    Seeded { usernames: Vec<String> },
}

pub fn seed_defaults(
    config: &SeedConfig,
    principals: &dyn PrincipalRepository,
    warehouses: &dyn WarehouseRepository,
    shippers: &dyn ShipperRepository,
    hasher: &dyn CredentialHasher,
) -> Result<SeedOutcome, SeedError> {
    let existing = principals.count()?;
    if existing > 0 {
        tracing::info!(existing_principals = existing, "data already exists, skipping seed");
        return Ok(SeedOutcome::Skipped {
            existing_principals: existing,
        });
    }

    let password_hash = hasher.hash(&config.password)?;

    let warehouse_user = Principal::create(
        PrincipalId::new(),
        NewPrincipal {
            username: WAREHOUSE_USERNAME.to_string(),
            password_hash: password_hash.clone(),
            email: Some("warehouse.hn@uteexpress.com".to_string()),
            full_name: "Warehouse Hanoi".to_string(),
            roles: BTreeSet::from([Role::WarehouseStaff]),
        },
    )?;
    let warehouse = Warehouse::register(
        WarehouseId::new(),
        NewWarehouse {
            code: "WH-HN".to_string(),
            name: "Warehouse Hanoi".to_string(),
            address: "No.1 Dai Co Viet, Hai Ba Trung, Hanoi".to_string(),
            phone: Some("0241234567".to_string()),
            email: Some("warehouse.hn@uteexpress.com".to_string()),
            manager: Some("Nguyen Van A".to_string()),
            total_capacity: 15_000,
            user_id: Some(warehouse_user.id()),
        },
    )?;

    let shipper_user = Principal::create(
        PrincipalId::new(),
        NewPrincipal {
            username: SHIPPER_USERNAME.to_string(),
            password_hash,
            email: Some("shipper.hn@uteexpress.com".to_string()),
            full_name: "Tran Van B".to_string(),
            roles: BTreeSet::from([Role::Shipper]),
        },
    )?;
    let shipper = Shipper::register(
        ShipperId::new(),
        NewShipper {
            code: "SHP-HN".to_string(),
            name: "Tran Van B".to_string(),
            phone: Some("0981234567".to_string()),
            email: Some("shipper.hn@uteexpress.com".to_string()),
            vehicle_type: Some("Truck".to_string()),
            vehicle_number: Some("29A-12345".to_string()),
            user_id: Some(shipper_user.id()),
        },
    )?;

    principals.insert(warehouse_user)?;
    warehouses.insert(warehouse)?;
    principals.insert(shipper_user)?;
    shippers.insert(shipper)?;

    // Operator output: the seeded logins.
    tracing::warn!(
        warehouse_username = WAREHOUSE_USERNAME,
        shipper_username = SHIPPER_USERNAME,
        password = %config.password,
        "seeded default accounts; change these passwords"
    );

    Ok(SeedOutcome::Seeded {
        usernames: vec![WAREHOUSE_USERNAME.to_string(), SHIPPER_USERNAME.to_string()],
    })
}
