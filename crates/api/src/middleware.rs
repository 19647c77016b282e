//! Session resolution, CSRF verification and URL access enforcement.
//!
//! Runs in front of every route, in this order:
//!
//! 1. resolve the session cookie into a [`SessionHandle`]
//! 2. reject malformed paths outright
//! 3. verify the CSRF token on state-changing requests
//! 4. apply the access policy decision
//!
//! Handlers only run for `Decision::Allow`.

use std::sync::Arc;

use axum::{
    Form,
    body::{Body, Bytes},
    extract::{FromRequest, State},
    http::{HeaderMap, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::Deserialize;

use uteexpress_auth::{
    Decision,
    csrf::{self, CSRF_COOKIE, CSRF_HEADER},
};
use uteexpress_core::SessionId;
use uteexpress_infra::SessionLookup;

use crate::app::errors::{forbidden, json_error, session_error_to_response};
use crate::app::services::AppServices;
use crate::config::ApiConfig;
use crate::context::SessionHandle;

/// Largest form body inspected for a `_csrf` field.
const FORM_TOKEN_LIMIT: usize = 64 * 1024;

pub const LOGIN_PATH: &str = "/login";
pub const LOGIN_EXPIRED_PATH: &str = "/login?expired=true";

pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let jar = CookieJar::from_headers(req.headers());

    let handle = match resolve_session(&services, &jar) {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    let auth = handle.authentication();
    let decision = services.policy.evaluate(&path, &auth);

    if decision == Decision::Reject {
        tracing::info!(path = %path, decision = ?decision, "rejected malformed path");
        return malformed_path();
    }

    let csrf_cookie = jar
        .get(CSRF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let req = if services.csrf.requires_token(req.method().as_str(), &path) {
        match verify_csrf(req, csrf_cookie.as_deref()).await {
            Ok(req) => req,
            Err(resp) => {
                tracing::info!(path = %path, "csrf token missing or mismatched");
                return resp;
            }
        }
    } else {
        req
    };

    match decision {
        Decision::Allow => {}
        Decision::RedirectToLogin => {
            let rule = services.policy.matching_rule(&path).map(|r| r.pattern.to_string());
            tracing::debug!(path = %path, decision = ?decision, rule = ?rule, "login required");
            if handle.is_expired() {
                let jar = jar.remove(session_cookie_removal(&services.config));
                return (jar, Redirect::to(LOGIN_EXPIRED_PATH)).into_response();
            }
            return Redirect::to(LOGIN_PATH).into_response();
        }
        Decision::DenyForbidden => {
            let rule = services.policy.matching_rule(&path).map(|r| r.pattern.to_string());
            tracing::info!(
                path = %path,
                decision = ?decision,
                rule = ?rule,
                username = ?handle.principal().map(|p| p.username().to_string()),
                "access denied"
            );
            return forbidden();
        }
        Decision::Reject => return malformed_path(),
    }

    let mut req = req;
    req.extensions_mut().insert(handle);
    let resp = next.run(req).await;

    if csrf_cookie.is_none() {
        let jar = jar.add(csrf_token_cookie(&services.config, csrf::generate_token()));
        return (jar, resp).into_response();
    }

    resp
}

/// The session cookie carrying `id`. Not readable from scripts.
pub fn session_cookie(config: &ApiConfig, id: SessionId) -> Cookie<'static> {
    Cookie::build((config.session_cookie.clone(), id.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(config.secure_cookies)
        .build()
}

/// Matches the session cookie's path so a jar removal deletes it.
pub fn session_cookie_removal(config: &ApiConfig) -> Cookie<'static> {
    Cookie::build((config.session_cookie.clone(), "")).path("/").build()
}

/// Readable by page scripts, which echo it back in `X-XSRF-TOKEN`.
fn csrf_token_cookie(config: &ApiConfig, token: String) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(false)
        .secure(config.secure_cookies)
        .build()
}

fn resolve_session(services: &AppServices, jar: &CookieJar) -> Result<SessionHandle, Response> {
    let Some(cookie) = jar.get(&services.config.session_cookie) else {
        return Ok(SessionHandle::anonymous());
    };
    let Ok(session_id) = cookie.value().parse::<SessionId>() else {
        return Ok(SessionHandle::anonymous());
    };

    match services.identity.resolve(session_id, Utc::now()) {
        Ok(SessionLookup::Active(ctx)) => Ok(SessionHandle::active(session_id, ctx)),
        Ok(SessionLookup::Expired) => Ok(SessionHandle::expired()),
        Ok(SessionLookup::Missing) => Ok(SessionHandle::anonymous()),
        Err(e) => Err(session_error_to_response(e)),
    }
}

/// Double-submit check: the cookie must be echoed in the header or, for
/// urlencoded forms, in a `_csrf` field.
async fn verify_csrf(req: Request<Body>, cookie: Option<&str>) -> Result<Request<Body>, Response> {
    let header_token = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if header_token.is_some() || !is_form(req.headers()) {
        return if csrf::tokens_match(cookie, header_token.as_deref()) {
            Ok(req)
        } else {
            Err(csrf_failure())
        };
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, FORM_TOKEN_LIMIT)
        .await
        .map_err(|_| json_error(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", "form body too large"))?;

    let form_token = form_csrf_field(&bytes).await;
    if !csrf::tokens_match(cookie, form_token.as_deref()) {
        return Err(csrf_failure());
    }

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

async fn form_csrf_field(bytes: &Bytes) -> Option<String> {
    #[derive(Deserialize)]
    struct CsrfField {
        #[serde(rename = "_csrf")]
        csrf: Option<String>,
    }

    let probe = Request::builder()
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(bytes.clone()))
        .ok()?;
    let Form(field) = Form::<CsrfField>::from_request(probe, &()).await.ok()?;
    field.csrf
}

fn malformed_path() -> Response {
    json_error(StatusCode::BAD_REQUEST, "malformed_path", "request path is not normalized")
}

fn csrf_failure() -> Response {
    json_error(StatusCode::FORBIDDEN, "csrf_token_invalid", "missing or invalid CSRF token")
}
