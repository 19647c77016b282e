use std::collections::BTreeSet;

use serde::Serialize;

use uteexpress_core::{DomainError, DomainResult, Entity, PrincipalId};

use crate::Role;

/// Input for creating a principal. The password must already be hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrincipal {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub full_name: String,
    pub roles: BTreeSet<Role>,
}

/// An account that can authenticate (customer, staff, shipper, admin...).
///
/// Role membership is fixed for the lifetime of a session: the session keeps
/// the snapshot taken at login, so role changes need a fresh login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: PrincipalId,
    username: String,
    #[serde(skip_serializing)]
    password_hash: String,
    email: Option<String>,
    full_name: String,
    active: bool,
    roles: BTreeSet<Role>,
}

impl Principal {
    pub fn create(id: PrincipalId, input: NewPrincipal) -> DomainResult<Self> {
        let username = input.username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("username cannot contain whitespace"));
        }
        if input.password_hash.is_empty() {
            return Err(DomainError::validation("password hash cannot be empty"));
        }
        if let Some(email) = &input.email {
            if !email.contains('@') {
                return Err(DomainError::validation("invalid email format"));
            }
        }

        Ok(Self {
            id,
            username: username.to_string(),
            password_hash: input.password_hash,
            email: input.email.map(|e| e.trim().to_lowercase()),
            full_name: input.full_name.trim().to_string(),
            active: true,
            roles: input.roles,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Landing page for the highest-priority role held, if any.
    pub fn landing_path(&self) -> Option<&'static str> {
        self.roles.iter().next().map(Role::landing_path)
    }
}

impl Entity for Principal {
    type Id = PrincipalId;

    fn id(&self) -> PrincipalId {
        self.id
    }
}
