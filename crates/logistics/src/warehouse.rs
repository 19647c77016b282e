use serde::{Deserialize, Serialize};

use uteexpress_core::{DomainError, DomainResult, Entity, PrincipalId, WarehouseId};

/// Input for registering a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub code: String,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub manager: Option<String>,
    pub total_capacity: u32,
    /// Staff account operating this warehouse.
    pub user_id: Option<PrincipalId>,
}

/// A warehouse in the delivery network.
///
/// `code` is non-empty, upper-cased and unique across warehouses (uniqueness
/// is enforced by the repository).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    id: WarehouseId,
    code: String,
    name: String,
    address: String,
    phone: Option<String>,
    email: Option<String>,
    manager: Option<String>,
    total_capacity: u32,
    user_id: Option<PrincipalId>,
}

impl Warehouse {
    pub fn register(id: WarehouseId, input: NewWarehouse) -> DomainResult<Self> {
        let code = input.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(DomainError::validation("warehouse code cannot be empty"));
        }
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        if input.total_capacity == 0 {
            return Err(DomainError::validation("warehouse capacity must be positive"));
        }

        Ok(Self {
            id,
            code,
            name: input.name.trim().to_string(),
            address: input.address.trim().to_string(),
            phone: input.phone,
            email: input.email.map(|e| e.trim().to_lowercase()),
            manager: input.manager,
            total_capacity: input.total_capacity,
            user_id: input.user_id,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn manager(&self) -> Option<&str> {
        self.manager.as_deref()
    }

    pub fn total_capacity(&self) -> u32 {
        self.total_capacity
    }

    pub fn user_id(&self) -> Option<PrincipalId> {
        self.user_id
    }
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> WarehouseId {
        self.id
    }
}
