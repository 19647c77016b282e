//! Service wiring: repositories, session store, policies and the identity
//! service, assembled once at startup and shared by every request.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use uteexpress_auth::{AccessPolicy, CredentialHasher, CsrfPolicy, PolicyError};
use uteexpress_infra::{
    IdentityService, InMemoryPrincipalRepository, InMemorySessionStore, InMemoryShipperRepository,
    InMemoryWarehouseRepository, PrincipalRepository, SeedConfig, SeedError, SeedOutcome,
    ShipperRepository, WarehouseRepository, seed_defaults,
};

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("access policy: {0}")]
    Policy(#[from] PolicyError),
}

pub struct AppServices {
    pub config: ApiConfig,
    pub policy: AccessPolicy,
    pub csrf: CsrfPolicy,
    pub identity: IdentityService,
    pub principals: Arc<dyn PrincipalRepository>,
    pub warehouses: Arc<dyn WarehouseRepository>,
    pub shippers: Arc<dyn ShipperRepository>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl AppServices {
    /// In-memory storage with the standard rule tables.
    pub fn in_memory(
        config: ApiConfig,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self, ServicesError> {
        let policy = AccessPolicy::standard()?;
        let csrf = CsrfPolicy::standard()?;

        let principals: Arc<dyn PrincipalRepository> = Arc::new(InMemoryPrincipalRepository::new());
        let warehouses: Arc<dyn WarehouseRepository> = Arc::new(InMemoryWarehouseRepository::new());
        let shippers: Arc<dyn ShipperRepository> = Arc::new(InMemoryShipperRepository::new());
        let sessions = Arc::new(
            InMemorySessionStore::new(config.idle_timeout)
                .with_anonymous_limit(config.max_anonymous_sessions),
        );

        let identity = IdentityService::new(
            principals.clone(),
            warehouses.clone(),
            shippers.clone(),
            sessions,
            hasher.clone(),
        );

        tracing::info!(
            rules = policy.rules().len(),
            idle_minutes = config.idle_timeout.num_minutes(),
            max_anonymous_sessions = config.max_anonymous_sessions,
            "services initialized"
        );

        Ok(Self {
            config,
            policy,
            csrf,
            identity,
            principals,
            warehouses,
            shippers,
            hasher,
        })
    }

    pub fn seed(&self) -> Result<SeedOutcome, SeedError> {
        seed_defaults(
            &SeedConfig {
                password: self.config.seed_password.clone(),
            },
            self.principals.as_ref(),
            self.warehouses.as_ref(),
            self.shippers.as_ref(),
            self.hasher.as_ref(),
        )
    }
}

/// Sweep stale sessions every `every` until the runtime shuts down.
pub fn spawn_session_sweeper(
    services: Arc<AppServices>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match services.identity.sessions().sweep(Utc::now()) {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "session sweep"),
                Err(e) => tracing::error!(error = %e, "session sweep failed"),
            }
        }
    })
}
