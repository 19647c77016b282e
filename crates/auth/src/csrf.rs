//! Cross-site request forgery policy (double-submit cookie).
//!
//! The server hands out a readable `XSRF-TOKEN` cookie; a state-changing
//! request must echo the same value in the `X-XSRF-TOKEN` header. Machine
//! endpoints (payment callbacks, location pushes, websocket) are exempt.

use uuid::Uuid;

use crate::policy::{PathPattern, PolicyError};

pub const CSRF_COOKIE: &str = "XSRF-TOKEN";
pub const CSRF_HEADER: &str = "x-xsrf-token";

const SAFE_METHODS: [&str; 4] = ["GET", "HEAD", "OPTIONS", "TRACE"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfPolicy {
    exempt: Vec<PathPattern>,
}

impl CsrfPolicy {
    pub fn new(exempt: &[&str]) -> Result<Self, PolicyError> {
        let exempt = exempt
            .iter()
            .map(|p| PathPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { exempt })
    }

    pub fn standard() -> Result<Self, PolicyError> {
        Self::new(&[
            "/api/**",
            "/shipper/location/**",
            "/ws/**",
            "/customer/payment/callback",
        ])
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|p| p.matches(path))
    }

    /// Whether a request with this method and path must carry a token.
    pub fn requires_token(&self, method: &str, path: &str) -> bool {
        let safe = SAFE_METHODS.iter().any(|m| m.eq_ignore_ascii_case(method));
        !safe && !self.is_exempt(path)
    }
}

/// Fresh random token value.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Compare cookie and header values without early exit on the first mismatch.
pub fn tokens_match(cookie: Option<&str>, header: Option<&str>) -> bool {
    let (Some(cookie), Some(header)) = (cookie, header) else {
        return false;
    };
    if cookie.is_empty() || cookie.len() != header.len() {
        return false;
    }
    cookie
        .bytes()
        .zip(header.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
