use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::json;

use uteexpress_core::{Entity, SessionId};
use uteexpress_infra::{LoginError, RegisterCustomer};

use crate::app::dto::{LoginForm, LoginPage, LoginPageQuery, RegisterForm};
use crate::app::errors::{
    registration_error_to_response, repository_error_to_response, session_error_to_response,
};
use crate::app::services::AppServices;
use crate::context::SessionHandle;
use crate::middleware::{session_cookie, session_cookie_removal};

pub async fn login_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<LoginPageQuery>,
) -> Result<Json<LoginPage>, Response> {
    let login_error = match session.session_id() {
        Some(id) => services
            .identity
            .take_login_error(id, Utc::now())
            .map_err(session_error_to_response)?,
        None => None,
    };

    Ok(Json(LoginPage {
        login_error,
        error: query.error.is_some(),
        logged_out: query.logout.is_some(),
        expired: query.expired.is_some() || session.is_expired(),
        username: session.principal().map(|p| p.username().to_string()),
    }))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionHandle>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let now = Utc::now();
    match services
        .identity
        .login(session.session_id(), &form.username, &form.password, now)
    {
        Ok(outcome) => redirect_with_session(&services, jar, outcome.landing_path, outcome.session_id),
        Err(LoginError::InvalidCredentials | LoginError::Disabled | LoginError::NoRoles) => {
            match services.identity.record_login_failure(session.session_id(), now) {
                Ok(id) => redirect_with_session(&services, jar, "/login?error", id),
                Err(e) => session_error_to_response(e),
            }
        }
        Err(LoginError::Repository(e)) => repository_error_to_response(e),
        Err(LoginError::Session(e)) => session_error_to_response(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionHandle>,
    jar: CookieJar,
) -> Response {
    if let Some(id) = session.session_id() {
        if let Err(e) = services.identity.logout(id, Utc::now()) {
            return session_error_to_response(e);
        }
    }

    let jar = jar.remove(session_cookie_removal(&services.config));
    (jar, Redirect::to("/login?logout=true")).into_response()
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let result = services.identity.register_customer(RegisterCustomer {
        username: form.username,
        password: form.password,
        email: form.email,
        full_name: form.full_name,
    });

    match result {
        Ok(principal) => (
            StatusCode::CREATED,
            Json(json!({
                "id": principal.id().to_string(),
                "username": principal.username(),
                "roles": principal.roles(),
                "landing_path": principal.landing_path(),
            })),
        )
            .into_response(),
        Err(e) => registration_error_to_response(e),
    }
}

fn redirect_with_session(
    services: &AppServices,
    jar: CookieJar,
    to: &str,
    session_id: SessionId,
) -> Response {
    let jar = jar.add(session_cookie(&services.config, session_id));
    (jar, Redirect::to(to)).into_response()
}
