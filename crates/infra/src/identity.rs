//! Login, logout and registration workflows.
//!
//! The service owns no state of its own; it coordinates the repositories,
//! the session store and the credential hasher. Every failure a user can
//! cause on the login form collapses into one message so the form does not
//! reveal which usernames exist.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use uteexpress_auth::{CredentialHasher, NewPrincipal, PasswordHashError, Principal, Role, SessionContext};
use uteexpress_core::{DomainError, Entity, PrincipalId, SessionId};

use crate::repository::{
    PrincipalRepository, RepositoryError, ShipperRepository, WarehouseRepository,
};
use crate::session_store::{SessionLookup, SessionStore, SessionStoreError};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is disabled")]
    Disabled,

    #[error("account has no roles")]
    NoRoles,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

impl LoginError {
    /// Whether the user caused this (as opposed to storage trouble).
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            LoginError::InvalidCredentials | LoginError::Disabled | LoginError::NoRoles
        )
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("email '{0}' is already in use")]
    DuplicateEmail(String),

    #[error(transparent)]
    Hash(#[from] PasswordHashError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DomainError> for RegistrationError {
    fn from(e: DomainError) -> Self {
        RegistrationError::Validation(e.to_string())
    }
}

/// Customer self-registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCustomer {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

/// A successful login: the rotated session id and where to send the user.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub session_id: SessionId,
    pub landing_path: &'static str,
    pub context: SessionContext,
}

#[derive(Clone)]
pub struct IdentityService {
    principals: Arc<dyn PrincipalRepository>,
    warehouses: Arc<dyn WarehouseRepository>,
    shippers: Arc<dyn ShipperRepository>,
    sessions: Arc<dyn SessionStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl IdentityService {
    pub fn new(
        principals: Arc<dyn PrincipalRepository>,
        warehouses: Arc<dyn WarehouseRepository>,
        shippers: Arc<dyn ShipperRepository>,
        sessions: Arc<dyn SessionStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            principals,
            warehouses,
            shippers,
            sessions,
            hasher,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Check credentials without touching any session.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Principal, LoginError> {
        let Some(principal) = self.principals.find_by_username(username.trim())? else {
            return Err(LoginError::InvalidCredentials);
        };
        if !self.hasher.verify(password, principal.password_hash()) {
            return Err(LoginError::InvalidCredentials);
        }
        if !principal.is_active() {
            return Err(LoginError::Disabled);
        }
        if principal.roles().is_empty() {
            return Err(LoginError::NoRoles);
        }
        Ok(principal)
    }

    /// Authenticate and bind the principal plus its affiliations to a fresh
    /// session. `previous` (the pre-login session, if any) is discarded.
    pub fn login(
        &self,
        previous: Option<SessionId>,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, LoginError> {
        let principal = match self.authenticate(username, password) {
            Ok(p) => p,
            Err(e) => {
                if e.is_credential_failure() {
                    tracing::warn!(username = %username.trim(), reason = %e, "login failed");
                }
                return Err(e);
            }
        };

        let landing_path = principal.landing_path().ok_or(LoginError::NoRoles)?;
        let mut context = SessionContext::new(now);

        if let Some(warehouse) = self.warehouses.find_by_user(principal.id())? {
            context.set_warehouse_affiliation(warehouse);
        }
        if let Some(shipper) = self.shippers.find_by_user(principal.id())? {
            context.set_shipper_affiliation(shipper);
        }

        let principal_id = principal.id();
        context.set_principal(principal);

        let session_id = self.sessions.establish(previous, context.clone(), now)?;

        tracing::info!(
            principal_id = %principal_id,
            username = %username.trim(),
            landing = landing_path,
            warehouse = context.has_warehouse_affiliation(),
            shipper = context.has_shipper_affiliation(),
            "login succeeded"
        );

        Ok(LoginOutcome {
            session_id,
            landing_path,
            context,
        })
    }

    /// Store the login-form flash on `session` (opening an anonymous session
    /// if there is none) and return the session that now carries it.
    ///
    /// Whoever is already signed in on `session` stays signed in.
    pub fn record_login_failure(
        &self,
        session: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> Result<SessionId, SessionStoreError> {
        let mut record = |ctx: &mut SessionContext| {
            ctx.record_login_failure(INVALID_CREDENTIALS_MESSAGE);
        };

        if let Some(id) = session {
            if self.sessions.modify(id, now, &mut record)? {
                return Ok(id);
            }
        }

        let id = self.sessions.create(now)?;
        self.sessions.modify(id, now, &mut record)?;
        Ok(id)
    }

    /// Read and consume the login flash of `session`.
    pub fn take_login_error(
        &self,
        session: SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, SessionStoreError> {
        let mut flash = None;
        self.sessions
            .modify(session, now, &mut |ctx| flash = ctx.take_login_error())?;
        Ok(flash)
    }

    pub fn resolve(&self, session: SessionId, now: DateTime<Utc>) -> Result<SessionLookup, SessionStoreError> {
        self.sessions.lookup(session, now)
    }

    pub fn logout(&self, session: SessionId, now: DateTime<Utc>) -> Result<(), SessionStoreError> {
        let mut username = None;
        self.sessions.modify(session, now, &mut |ctx| {
            username = ctx.current_username().map(str::to_string);
            ctx.clear();
        })?;
        self.sessions.invalidate(session)?;
        if let Some(username) = username {
            tracing::info!(username = %username, "logged out");
        }
        Ok(())
    }

    /// Create a CUSTOMER account.
    pub fn register_customer(&self, form: RegisterCustomer) -> Result<Principal, RegistrationError> {
        let username = form.username.trim();
        let email = form.email.trim();
        let full_name = form.full_name.trim();

        if username.is_empty() {
            return Err(RegistrationError::Validation("username is required".to_string()));
        }
        if email.is_empty() {
            return Err(RegistrationError::Validation("email is required".to_string()));
        }
        if full_name.is_empty() {
            return Err(RegistrationError::Validation("full name is required".to_string()));
        }
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RegistrationError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.principals.find_by_username(username)?.is_some() {
            return Err(RegistrationError::DuplicateUsername(username.to_string()));
        }
        if self.principals.find_by_email(email)?.is_some() {
            return Err(RegistrationError::DuplicateEmail(email.to_string()));
        }

        let principal = Principal::create(
            PrincipalId::new(),
            NewPrincipal {
                username: username.to_string(),
                password_hash: self.hasher.hash(&form.password)?,
                email: Some(email.to_string()),
                full_name: full_name.to_string(),
                roles: BTreeSet::from([Role::Customer]),
            },
        )?;

        // Lost a race with a concurrent registration.
        self.principals.insert(principal.clone()).map_err(|e| match e {
            RepositoryError::Conflict(_) => RegistrationError::DuplicateUsername(username.to_string()),
            other => RegistrationError::Repository(other),
        })?;

        tracing::info!(principal_id = %principal.id(), username = %username, "customer registered");
        Ok(principal)
    }
}
