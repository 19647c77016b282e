//! Infrastructure layer: storage adapters, the session store and the
//! identity workflows (login, logout, registration, seeding) built on them.

pub mod identity;
pub mod repository;
pub mod seed;
pub mod session_store;


pub use identity::{IdentityService, LoginError, LoginOutcome, RegisterCustomer, RegistrationError};
pub use repository::{
    InMemoryPrincipalRepository, InMemoryShipperRepository, InMemoryWarehouseRepository,
    PrincipalRepository, RepositoryError, ShipperRepository, WarehouseRepository,
};
pub use seed::{SeedConfig, SeedError, SeedOutcome, seed_defaults};
pub use session_store::{
    DEFAULT_MAX_ANONYMOUS_SESSIONS, InMemorySessionStore, SessionLookup, SessionStore,
    SessionStoreError,
};
