//! Persistence seams for principals and their logistics affiliations.
//!
//! Handlers and the identity service only see these traits; the workspace
//! ships the in-memory adapters in [`in_memory`].

use thiserror::Error;

use uteexpress_auth::Principal;
use uteexpress_core::{DomainError, PrincipalId, ShipperId, WarehouseId};
use uteexpress_logistics::{Shipper, Warehouse};

pub mod in_memory;

pub use in_memory::{
    InMemoryPrincipalRepository, InMemoryShipperRepository, InMemoryWarehouseRepository,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A uniqueness constraint (id, username, email, code) was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub trait PrincipalRepository: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<Principal>, RepositoryError>;

    fn find_by_email(&self, email: &str) -> Result<Option<Principal>, RepositoryError>;

    fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, RepositoryError>;

    fn insert(&self, principal: Principal) -> Result<(), RepositoryError>;

    fn count(&self) -> Result<usize, RepositoryError>;
}

pub trait WarehouseRepository: Send + Sync {
    fn find_by_id(&self, id: WarehouseId) -> Result<Option<Warehouse>, RepositoryError>;

    fn find_by_code(&self, code: &str) -> Result<Option<Warehouse>, RepositoryError>;

    /// The warehouse whose account is `user_id`, if any.
    fn find_by_user(&self, user_id: PrincipalId) -> Result<Option<Warehouse>, RepositoryError>;

    fn insert(&self, warehouse: Warehouse) -> Result<(), RepositoryError>;

    fn count(&self) -> Result<usize, RepositoryError>;
}

pub trait ShipperRepository: Send + Sync {
    fn find_by_id(&self, id: ShipperId) -> Result<Option<Shipper>, RepositoryError>;

    fn find_by_code(&self, code: &str) -> Result<Option<Shipper>, RepositoryError>;

    /// The shipper whose account is `user_id`, if any.
    fn find_by_user(&self, user_id: PrincipalId) -> Result<Option<Shipper>, RepositoryError>;

    fn insert(&self, shipper: Shipper) -> Result<(), RepositoryError>;

    fn count(&self) -> Result<usize, RepositoryError>;
}
