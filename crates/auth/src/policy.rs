//! URL access policy: an explicit rule table mapping path patterns to
//! requirements, evaluated against the caller's authentication state.
//!
//! Resolution is **most-specific-match**, independent of declaration order:
//!
//! 1. an exact pattern (`/customer/register`) beats every wildcard pattern;
//! 2. among subtree patterns (`/customer/notifications/**`) the longer literal
//!    prefix wins;
//! 3. the catch-all `/**` loses to everything.
//!
//! Declaration order only separates identical patterns, and the builder
//! refuses identical patterns with different requirements, so a table that
//! builds never depends on order. Paths that match no rule require an
//! authenticated caller.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::{Principal, Role};

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

/// Path pattern in the subset of Ant syntax the rule table needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathPattern {
    /// `/login` matches only `/login`.
    Exact(String),
    /// `/admin/**` matches `/admin` and anything below it.
    Subtree(String),
    /// `/**` matches every path.
    Any,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        let invalid = |reason: &str| PolicyError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if raw == "/**" {
            return Ok(PathPattern::Any);
        }

        let (literal, subtree) = match raw.strip_suffix("/**") {
            Some(prefix) => (prefix, true),
            None => (raw, false),
        };
        if literal.contains('*') || literal.contains('?') {
            return Err(invalid("wildcards are only supported as a trailing '/**'"));
        }
        if literal.len() > 1 && literal.ends_with('/') {
            return Err(invalid("trailing '/' is not allowed"));
        }

        Ok(if subtree {
            PathPattern::Subtree(literal.to_string())
        } else {
            PathPattern::Exact(literal.to_string())
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Subtree(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
            PathPattern::Any => true,
        }
    }

    /// Ordering key: higher wins.
    fn specificity(&self) -> (u8, usize) {
        match self {
            PathPattern::Any => (0, 0),
            PathPattern::Subtree(prefix) => (1, prefix.len()),
            PathPattern::Exact(p) => (2, p.len()),
        }
    }
}

impl core::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PathPattern::Exact(p) => f.write_str(p),
            PathPattern::Subtree(prefix) => write!(f, "{prefix}/**"),
            PathPattern::Any => f.write_str("/**"),
        }
    }
}

impl Serialize for PathPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requirements, authentication state, decisions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "role")]
pub enum Requirement {
    Public,
    Authenticated,
    HasRole(Role),
}

impl core::fmt::Display for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Requirement::Public => f.write_str("public"),
            Requirement::Authenticated => f.write_str("authenticated"),
            Requirement::HasRole(role) => write!(f, "has role {}", role.name()),
        }
    }
}

/// Who is asking. Built from the session's principal for each request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Authentication {
    #[default]
    Anonymous,
    Authenticated { roles: BTreeSet<Role> },
}

impl Authentication {
    pub fn of(principal: Option<&Principal>) -> Self {
        match principal {
            Some(p) => Authentication::Authenticated {
                roles: p.roles().clone(),
            },
            None => Authentication::Anonymous,
        }
    }

    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Authentication::Authenticated {
            roles: roles.into_iter().collect(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Authentication::Authenticated { .. })
    }

    pub fn holds(&self, role: Role) -> bool {
        match self {
            Authentication::Anonymous => false,
            Authentication::Authenticated { roles } => roles.contains(&role),
        }
    }

    pub fn roles(&self) -> Vec<Role> {
        match self {
            Authentication::Anonymous => Vec::new(),
            Authentication::Authenticated { roles } => roles.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    RedirectToLogin,
    DenyForbidden,
    /// The path itself is malformed (dot segments, `;`, `//`); no rule applies.
    Reject,
}

impl Requirement {
    pub fn decide(&self, auth: &Authentication) -> Decision {
        match (self, auth) {
            (Requirement::Public, _) => Decision::Allow,
            (_, Authentication::Anonymous) => Decision::RedirectToLogin,
            (Requirement::Authenticated, Authentication::Authenticated { .. }) => Decision::Allow,
            (Requirement::HasRole(role), auth) if auth.holds(*role) => Decision::Allow,
            (Requirement::HasRole(_), _) => Decision::DenyForbidden,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rule table
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRule {
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("pattern '{pattern}' declared as both '{first}' and '{second}'")]
    ConflictingRules {
        pattern: String,
        first: Requirement,
        second: Requirement,
    },
}

/// Collects `(pattern, requirement)` pairs; validation happens in [`build`].
///
/// [`build`]: AccessPolicyBuilder::build
#[derive(Debug, Default)]
pub struct AccessPolicyBuilder {
    entries: Vec<(String, Requirement)>,
}

impl AccessPolicyBuilder {
    pub fn rule(mut self, requirement: Requirement, patterns: &[&str]) -> Self {
        self.entries
            .extend(patterns.iter().map(|p| (p.to_string(), requirement)));
        self
    }

    pub fn permit_all(self, patterns: &[&str]) -> Self {
        self.rule(Requirement::Public, patterns)
    }

    pub fn authenticated(self, patterns: &[&str]) -> Self {
        self.rule(Requirement::Authenticated, patterns)
    }

    pub fn has_role(self, role: Role, patterns: &[&str]) -> Self {
        self.rule(Requirement::HasRole(role), patterns)
    }

    pub fn build(self) -> Result<AccessPolicy, PolicyError> {
        let mut rules: Vec<AccessRule> = Vec::with_capacity(self.entries.len());

        for (raw, requirement) in self.entries {
            let pattern = PathPattern::parse(&raw)?;
            match rules.iter().find(|r| r.pattern == pattern) {
                Some(existing) if existing.requirement == requirement => continue,
                Some(existing) => {
                    return Err(PolicyError::ConflictingRules {
                        pattern: raw,
                        first: existing.requirement,
                        second: requirement,
                    });
                }
                None => rules.push(AccessRule {
                    pattern,
                    requirement,
                }),
            }
        }

        Ok(AccessPolicy { rules })
    }
}

/// Detailed, serialisable account of one policy decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyExplanation {
    pub path: String,
    pub matched_pattern: Option<String>,
    pub requirement: Requirement,
    pub authenticated: bool,
    pub roles: Vec<Role>,
    pub decision: Decision,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder::default()
    }

    /// The storefront/back-office rule table.
    pub fn standard() -> Result<Self, PolicyError> {
        Self::builder()
            .permit_all(&[
                "/register",
                "/login",
                "/logout",
                "/health",
                "/css/**",
                "/js/**",
                "/images/**",
                "/webjars/**",
                "/forgot-password",
                "/reset-password",
            ])
            .permit_all(&[
                "/customer/register",
                "/customer/verify",
                "/customer/forgot-password",
                "/customer/reset-password",
                "/customer/resend-verification",
                "/customer/notifications/**",
            ])
            .permit_all(&["/customer/payment/callback", "/api/payment/**", "/ws/**"])
            .has_role(Role::Shipper, &["/shipper/**"])
            .has_role(Role::Customer, &["/customer/**", "/customer/payment/**"])
            .has_role(Role::WarehouseStaff, &["/warehouse/**"])
            .has_role(Role::Admin, &["/admin/**"])
            .has_role(Role::Support, &["/support/**"])
            .authenticated(&["/api/**", "/**"])
            .build()
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// Most specific rule matching `path`; first declared wins among equals.
    pub fn matching_rule(&self, path: &str) -> Option<&AccessRule> {
        let mut best: Option<&AccessRule> = None;
        for rule in self.rules.iter().filter(|r| r.pattern.matches(path)) {
            match best {
                Some(b) if b.pattern.specificity() >= rule.pattern.specificity() => {}
                _ => best = Some(rule),
            }
        }
        best
    }

    pub fn evaluate(&self, path: &str, auth: &Authentication) -> Decision {
        if !is_well_formed(path) {
            return Decision::Reject;
        }
        self.requirement_for(path).decide(auth)
    }

    pub fn requirement_for(&self, path: &str) -> Requirement {
        self.matching_rule(path)
            .map(|r| r.requirement)
            .unwrap_or(Requirement::Authenticated)
    }

    pub fn explain(&self, path: &str, auth: &Authentication) -> PolicyExplanation {
        let rule = self.matching_rule(path);
        let requirement = rule
            .map(|r| r.requirement)
            .unwrap_or(Requirement::Authenticated);
        let decision = self.evaluate(path, auth);

        let reason = match decision {
            Decision::Reject => "path is not in normalized form".to_string(),
            Decision::Allow => match requirement {
                Requirement::Public => "path is public".to_string(),
                Requirement::Authenticated => "caller is authenticated".to_string(),
                Requirement::HasRole(role) => format!("caller holds {}", role.name()),
            },
            Decision::RedirectToLogin => format!("'{requirement}' requires a logged-in caller"),
            Decision::DenyForbidden => format!("caller is authenticated but lacks '{requirement}'"),
        };

        PolicyExplanation {
            path: path.to_string(),
            matched_pattern: rule.map(|r| r.pattern.to_string()),
            requirement,
            authenticated: auth.is_authenticated(),
            roles: auth.roles(),
            decision,
            reason,
        }
    }
}

/// Absolute, no empty/dot segments, no `;` path parameters or backslashes.
fn is_well_formed(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    if path.contains(';') || path.contains('\\') || is_encoded_separator(path) {
        return false;
    }
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return true;
    }
    rest.split('/')
        .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

/// Percent-encoded `/`, `\`, `.` or `;` would let a path dodge pattern matching.
fn is_encoded_separator(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    ["%2f", "%5c", "%2e", "%3b"].iter().any(|e| lower.contains(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> AccessPolicy {
        AccessPolicy::standard().unwrap()
    }

    fn anon() -> Authentication {
        Authentication::Anonymous
    }

    fn as_role(role: Role) -> Authentication {
        Authentication::with_roles([role])
    }

    #[test]
    fn warehouse_staff_cannot_reach_admin() {
        let p = policy();
        let staff = as_role(Role::WarehouseStaff);
        assert_eq!(p.evaluate("/admin/x", &staff), Decision::DenyForbidden);
        assert_eq!(p.evaluate("/warehouse/dashboard", &staff), Decision::Allow);
    }

    #[test]
    fn anonymous_customer_paths() {
        let p = policy();
        assert_eq!(p.evaluate("/customer/register", &anon()), Decision::Allow);
        assert_eq!(
            p.evaluate("/customer/orders/create", &anon()),
            Decision::RedirectToLogin
        );
    }

    #[test]
    fn narrow_public_rule_beats_broad_role_rule() {
        let p = policy();
        let shipper = as_role(Role::Shipper);
        // Public sub-paths under a role-restricted parent.
        assert_eq!(p.evaluate("/customer/notifications/42", &anon()), Decision::Allow);
        assert_eq!(p.evaluate("/customer/payment/callback", &anon()), Decision::Allow);
        assert_eq!(p.evaluate("/api/payment/momo/ipn", &anon()), Decision::Allow);
        // The parent itself stays restricted.
        assert_eq!(p.evaluate("/customer/payment/start", &shipper), Decision::DenyForbidden);
        assert_eq!(p.evaluate("/api/shipments", &anon()), Decision::RedirectToLogin);
        assert_eq!(p.evaluate("/api/shipments", &shipper), Decision::Allow);
    }

    #[test]
    fn subtree_matches_on_segment_boundaries_only() {
        let pat = PathPattern::parse("/admin/**").unwrap();
        assert!(pat.matches("/admin"));
        assert!(pat.matches("/admin/"));
        assert!(pat.matches("/admin/users/1"));
        assert!(!pat.matches("/administrator"));
    }

    #[test]
    fn catch_all_requires_authentication() {
        let p = policy();
        assert_eq!(p.evaluate("/", &anon()), Decision::RedirectToLogin);
        assert_eq!(p.evaluate("/orders/17", &as_role(Role::Customer)), Decision::Allow);
    }

    #[test]
    fn malformed_paths_are_rejected_before_rule_lookup() {
        let p = policy();
        for path in [
            "/customer/register/../../admin/x",
            "/login;jsessionid=abc",
            "//admin",
            "/admin/./x",
            "/customer/register%2f..%2fadmin",
            "relative",
        ] {
            assert_eq!(p.evaluate(path, &anon()), Decision::Reject, "{path}");
        }
    }

    #[test]
    fn declaration_order_does_not_change_outcomes() {
        let forward = AccessPolicy::builder()
            .permit_all(&["/customer/notifications/**"])
            .has_role(Role::Customer, &["/customer/**"])
            .build()
            .unwrap();
        let reversed = AccessPolicy::builder()
            .has_role(Role::Customer, &["/customer/**"])
            .permit_all(&["/customer/notifications/**"])
            .build()
            .unwrap();

        for path in ["/customer/notifications/1", "/customer/orders", "/customer"] {
            assert_eq!(
                forward.evaluate(path, &anon()),
                reversed.evaluate(path, &anon()),
                "{path}"
            );
        }
    }

    #[test]
    fn conflicting_duplicate_patterns_fail_to_build() {
        let err = AccessPolicy::builder()
            .permit_all(&["/ws/**"])
            .authenticated(&["/ws/**"])
            .build()
            .unwrap_err();
        assert!(matches!(err, PolicyError::ConflictingRules { .. }));

        // Identical duplicates are harmless.
        let ok = AccessPolicy::builder()
            .has_role(Role::Admin, &["/admin/**", "/admin/**"])
            .build()
            .unwrap();
        assert_eq!(ok.rules().len(), 1);
    }

    #[test]
    fn unsupported_wildcards_fail_to_build() {
        for raw in ["/admin/*", "/a/**/b", "admin/**", "/api/"] {
            assert!(
                matches!(PathPattern::parse(raw), Err(PolicyError::InvalidPattern { .. })),
                "{raw}"
            );
        }
    }

    #[test]
    fn unmatched_path_requires_authentication() {
        let p = AccessPolicy::builder().permit_all(&["/login"]).build().unwrap();
        assert_eq!(p.evaluate("/elsewhere", &anon()), Decision::RedirectToLogin);
        assert_eq!(p.evaluate("/elsewhere", &as_role(Role::Support)), Decision::Allow);
    }

    #[test]
    fn explain_names_the_matched_rule() {
        let p = policy();
        let e = p.explain("/admin/users", &as_role(Role::Shipper));
        assert_eq!(e.matched_pattern.as_deref(), Some("/admin/**"));
        assert_eq!(e.requirement, Requirement::HasRole(Role::Admin));
        assert_eq!(e.decision, Decision::DenyForbidden);
        assert!(e.reason.contains("ADMIN"));

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["decision"], "deny_forbidden");
        assert_eq!(json["requirement"]["kind"], "has_role");
        assert_eq!(json["requirement"]["role"], "ROLE_ADMIN");
    }

    fn public_paths() -> Vec<&'static str> {
        vec![
            "/register",
            "/login",
            "/css/site.css",
            "/js/app.js",
            "/images/logo.png",
            "/webjars/bootstrap/5.3/bootstrap.min.css",
            "/forgot-password",
            "/reset-password",
            "/customer/register",
            "/customer/verify",
            "/customer/forgot-password",
            "/customer/reset-password",
            "/customer/resend-verification",
            "/customer/notifications/unread",
            "/customer/payment/callback",
            "/api/payment/momo/ipn",
            "/ws/info",
        ]
    }

    fn restricted_paths() -> Vec<(&'static str, Role)> {
        vec![
            ("/shipper/dashboard", Role::Shipper),
            ("/shipper/shipments/9", Role::Shipper),
            ("/shipper/location", Role::Shipper),
            ("/customer/dashboard", Role::Customer),
            ("/customer/orders/create", Role::Customer),
            ("/customer/orders/calculate", Role::Customer),
            ("/customer/chat/3", Role::Customer),
            ("/customer/payment/start", Role::Customer),
            ("/warehouse/dashboard", Role::WarehouseStaff),
            ("/warehouse/inbound/12", Role::WarehouseStaff),
            ("/admin/dashboard", Role::Admin),
            ("/admin/chat/1", Role::Admin),
            ("/admin/notifications", Role::Admin),
            ("/support/chat", Role::Support),
        ]
    }

    fn role_subset() -> impl Strategy<Value = Vec<Role>> {
        prop::sample::subsequence(Role::ALL.to_vec(), 0..=Role::ALL.len())
    }

    proptest! {
        #[test]
        fn public_paths_allow_everyone(idx in 0usize..17, roles in role_subset(), anonymous in any::<bool>()) {
            let p = policy();
            let path = public_paths()[idx];
            let auth = if anonymous { anon() } else { Authentication::with_roles(roles) };
            prop_assert_eq!(p.evaluate(path, &auth), Decision::Allow);
        }

        #[test]
        fn restricted_paths_follow_role_membership(idx in 0usize..14, roles in role_subset()) {
            let p = policy();
            let (path, required) = restricted_paths()[idx];

            prop_assert_eq!(p.evaluate(path, &anon()), Decision::RedirectToLogin);

            let expected = if roles.contains(&required) {
                Decision::Allow
            } else {
                Decision::DenyForbidden
            };
            prop_assert_eq!(p.evaluate(path, &Authentication::with_roles(roles)), expected);
        }
    }
}
