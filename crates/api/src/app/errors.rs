use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use uteexpress_auth::AuthzError;
use uteexpress_infra::{RegistrationError, RepositoryError, SessionStoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn forbidden() -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "access denied")
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", err.to_string())
        }
        AuthzError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
    }
}

pub fn session_error_to_response(err: SessionStoreError) -> axum::response::Response {
    tracing::error!(error = %err, "session store failure");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "session_error",
        "session storage unavailable",
    )
}

pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        RepositoryError::Domain(e) => json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
        RepositoryError::Poisoned => {
            tracing::error!("repository lock poisoned");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "storage unavailable",
            )
        }
    }
}

pub fn registration_error_to_response(err: RegistrationError) -> axum::response::Response {
    match err {
        RegistrationError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        RegistrationError::DuplicateUsername(_) => {
            json_error(StatusCode::CONFLICT, "username_taken", err.to_string())
        }
        RegistrationError::DuplicateEmail(_) => {
            json_error(StatusCode::CONFLICT, "email_taken", err.to_string())
        }
        RegistrationError::Hash(e) => {
            tracing::error!(error = %e, "password hashing failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                "could not store credentials",
            )
        }
        RegistrationError::Repository(e) => repository_error_to_response(e),
    }
}
