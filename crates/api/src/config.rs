//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use uteexpress_auth::csrf::CSRF_COOKIE;
use uteexpress_infra::DEFAULT_MAX_ANONYMOUS_SESSIONS;

pub const DEFAULT_SEED_PASSWORD: &str = "123456";

/// One week.
const MAX_IDLE_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub session_cookie: String,
    pub idle_timeout: Duration,
    /// Cap on sessions with no principal bound (pre-login and failed logins).
    pub max_anonymous_sessions: usize,
    pub secure_cookies: bool,
    pub seed_on_startup: bool,
    pub seed_password: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            session_cookie: "SESSION".to_string(),
            idle_timeout: Duration::minutes(30),
            max_anonymous_sessions: DEFAULT_MAX_ANONYMOUS_SESSIONS,
            secure_cookies: false,
            seed_on_startup: true,
            seed_password: DEFAULT_SEED_PASSWORD.to_string(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match lookup("UTE_BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    key: "UTE_BIND_ADDR",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.bind_addr,
        };

        let session_cookie = match lookup("UTE_SESSION_COOKIE") {
            Some(raw) => {
                let name = raw.trim();
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                    return Err(ConfigError::Invalid {
                        key: "UTE_SESSION_COOKIE",
                        value: raw.clone(),
                        reason: "cookie names are limited to [A-Za-z0-9_-]".to_string(),
                    });
                }
                if name.eq_ignore_ascii_case(CSRF_COOKIE) {
                    return Err(ConfigError::Invalid {
                        key: "UTE_SESSION_COOKIE",
                        value: raw.clone(),
                        reason: format!("{CSRF_COOKIE} is reserved for the CSRF token"),
                    });
                }
                name.to_string()
            }
            None => defaults.session_cookie,
        };

        let idle_timeout = match lookup("UTE_SESSION_IDLE_MINUTES") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(m) if (1..=MAX_IDLE_MINUTES).contains(&m) => Duration::minutes(m),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "UTE_SESSION_IDLE_MINUTES",
                        value: raw,
                        reason: format!("expected 1..={MAX_IDLE_MINUTES} minutes"),
                    });
                }
            },
            None => defaults.idle_timeout,
        };

        let max_anonymous_sessions = match lookup("UTE_MAX_ANONYMOUS_SESSIONS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "UTE_MAX_ANONYMOUS_SESSIONS",
                        value: raw,
                        reason: "expected a positive integer".to_string(),
                    });
                }
            },
            None => defaults.max_anonymous_sessions,
        };

        let secure_cookies = parse_bool(&lookup, "UTE_SECURE_COOKIES", defaults.secure_cookies)?;
        let seed_on_startup = parse_bool(&lookup, "UTE_SEED_ON_STARTUP", defaults.seed_on_startup)?;

        let seed_password = lookup("UTE_SEED_PASSWORD").unwrap_or_else(|| {
            if seed_on_startup {
                tracing::warn!("UTE_SEED_PASSWORD not set; seeding with insecure dev default");
            }
            defaults.seed_password
        });

        Ok(Self {
            bind_addr,
            session_cookie,
            idle_timeout,
            max_anonymous_sessions,
            secure_cookies,
            seed_on_startup,
            seed_password,
        })
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected true/false".to_string(),
        }),
    }
}
