//! Errors raised while constructing domain values.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejected input for an id or a record (principal, warehouse, shipper).
///
/// Storage failures and uniqueness conflicts are reported by the
/// repositories, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field is blank, out of range or otherwise unusable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A string could not be parsed as an identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            DomainError::validation("username cannot be empty").to_string(),
            "validation failed: username cannot be empty"
        );
        assert_eq!(
            DomainError::invalid_id("not-a-uuid").to_string(),
            "invalid identifier: not-a-uuid"
        );
    }
}
