use std::collections::HashMap;
use std::sync::RwLock;

use uteexpress_auth::Principal;
use uteexpress_core::{Entity, PrincipalId, ShipperId, WarehouseId};
use uteexpress_logistics::{Shipper, Warehouse};

use super::{PrincipalRepository, RepositoryError, ShipperRepository, WarehouseRepository};

/// In-memory principal table.
///
/// Intended for tests/dev. Lookups scan; the tables stay small.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalRepository {
    rows: RwLock<HashMap<PrincipalId, Principal>>,
}

impl InMemoryPrincipalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_where(
        &self,
        pred: impl Fn(&Principal) -> bool,
    ) -> Result<Option<Principal>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.values().find(|p| pred(p)).cloned())
    }
}

impl PrincipalRepository for InMemoryPrincipalRepository {
    fn find_by_username(&self, username: &str) -> Result<Option<Principal>, RepositoryError> {
        self.find_where(|p| p.username() == username)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Principal>, RepositoryError> {
        let email = email.trim();
        self.find_where(|p| p.email().is_some_and(|e| e.eq_ignore_ascii_case(email)))
    }

    fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.get(&id).cloned())
    }

    fn insert(&self, principal: Principal) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;

        if rows.contains_key(&principal.id()) {
            return Err(RepositoryError::Conflict(format!(
                "principal {} already exists",
                principal.id()
            )));
        }
        if rows.values().any(|p| p.username() == principal.username()) {
            return Err(RepositoryError::Conflict(format!(
                "username '{}' is taken",
                principal.username()
            )));
        }
        if let Some(email) = principal.email() {
            if rows.values().any(|p| p.email() == Some(email)) {
                return Err(RepositoryError::Conflict(format!(
                    "email '{email}' is taken"
                )));
            }
        }

        rows.insert(principal.id(), principal);
        Ok(())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.len())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWarehouseRepository {
    rows: RwLock<HashMap<WarehouseId, Warehouse>>,
}

impl InMemoryWarehouseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WarehouseRepository for InMemoryWarehouseRepository {
    fn find_by_id(&self, id: WarehouseId) -> Result<Option<Warehouse>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.get(&id).cloned())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Warehouse>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        let code = code.trim();
        Ok(rows
            .values()
            .find(|w| w.code().eq_ignore_ascii_case(code))
            .cloned())
    }

    fn find_by_user(&self, user_id: PrincipalId) -> Result<Option<Warehouse>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows
            .values()
            .find(|w| w.user_id() == Some(user_id))
            .cloned())
    }

    fn insert(&self, warehouse: Warehouse) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;

        if rows.contains_key(&warehouse.id()) {
            return Err(RepositoryError::Conflict(format!(
                "warehouse {} already exists",
                warehouse.id()
            )));
        }
        if rows.values().any(|w| w.code() == warehouse.code()) {
            return Err(RepositoryError::Conflict(format!(
                "warehouse code '{}' is taken",
                warehouse.code()
            )));
        }

        rows.insert(warehouse.id(), warehouse);
        Ok(())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.len())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryShipperRepository {
    rows: RwLock<HashMap<ShipperId, Shipper>>,
}

impl InMemoryShipperRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShipperRepository for InMemoryShipperRepository {
    fn find_by_id(&self, id: ShipperId) -> Result<Option<Shipper>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.get(&id).cloned())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Shipper>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        let code = code.trim();
        Ok(rows
            .values()
            .find(|s| s.code().eq_ignore_ascii_case(code))
            .cloned())
    }

    fn find_by_user(&self, user_id: PrincipalId) -> Result<Option<Shipper>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows
            .values()
            .find(|s| s.user_id() == Some(user_id))
            .cloned())
    }

    fn insert(&self, shipper: Shipper) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;

        if rows.contains_key(&shipper.id()) {
            return Err(RepositoryError::Conflict(format!(
                "shipper {} already exists",
                shipper.id()
            )));
        }
        if rows.values().any(|s| s.code() == shipper.code()) {
            return Err(RepositoryError::Conflict(format!(
                "shipper code '{}' is taken",
                shipper.code()
            )));
        }

        rows.insert(shipper.id(), shipper);
        Ok(())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use uteexpress_auth::{NewPrincipal, Role};
    use uteexpress_logistics::{NewShipper, NewWarehouse};

    fn principal(username: &str, email: Option<&str>) -> Principal {
        Principal::create(
            PrincipalId::new(),
            NewPrincipal {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                email: email.map(str::to_string),
                full_name: username.to_string(),
                roles: BTreeSet::from([Role::Customer]),
            },
        )
        .unwrap()
    }

    #[test]
    fn principal_lookups() {
        let repo = InMemoryPrincipalRepository::new();
        let p = principal("alice", Some("alice@uteexpress.com"));
        repo.insert(p.clone()).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(repo.find_by_id(p.id()).unwrap(), Some(p.clone()));
        assert_eq!(repo.find_by_username("alice").unwrap(), Some(p.clone()));
        assert_eq!(repo.find_by_username("ALICE").unwrap(), None);
        assert_eq!(
            repo.find_by_email("Alice@UTEExpress.com").unwrap(),
            Some(p)
        );
        assert_eq!(repo.find_by_username("bob").unwrap(), None);
    }

    #[test]
    fn duplicate_username_or_email_conflicts() {
        let repo = InMemoryPrincipalRepository::new();
        repo.insert(principal("alice", Some("a@x.com"))).unwrap();

        let err = repo.insert(principal("alice", None)).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err = repo.insert(principal("alice2", Some("a@x.com"))).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn warehouse_found_by_owner_and_code() {
        let repo = InMemoryWarehouseRepository::new();
        let owner = PrincipalId::new();
        let wh = Warehouse::register(
            WarehouseId::new(),
            NewWarehouse {
                code: "wh-hn".to_string(),
                name: "Warehouse Hanoi".to_string(),
                address: "Hanoi".to_string(),
                phone: None,
                email: None,
                manager: None,
                total_capacity: 15_000,
                user_id: Some(owner),
            },
        )
        .unwrap();
        repo.insert(wh.clone()).unwrap();

        assert_eq!(repo.find_by_user(owner).unwrap(), Some(wh.clone()));
        assert_eq!(repo.find_by_user(PrincipalId::new()).unwrap(), None);
        assert_eq!(repo.find_by_code("WH-HN").unwrap(), Some(wh.clone()));
        assert_eq!(repo.find_by_code("wh-hn").unwrap(), Some(wh));
    }

    #[test]
    fn shipper_code_is_unique() {
        let repo = InMemoryShipperRepository::new();
        let new = || NewShipper {
            code: "SHP-HN".to_string(),
            name: "Tran Van B".to_string(),
            phone: None,
            email: None,
            vehicle_type: None,
            vehicle_number: None,
            user_id: None,
        };
        repo.insert(Shipper::register(ShipperId::new(), new()).unwrap())
            .unwrap();
        let err = repo
            .insert(Shipper::register(ShipperId::new(), new()).unwrap())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.count().unwrap(), 1);
    }
}
