use uteexpress_auth::{Authentication, Principal, SessionContext};
use uteexpress_core::SessionId;

/// Per-request view of the caller's session.
///
/// Inserted as a request extension by the session middleware; handlers take
/// it explicitly instead of reaching for ambient state. It is a snapshot:
/// writes go through the session store, not through this value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionHandle {
    session_id: Option<SessionId>,
    context: Option<SessionContext>,
    expired: bool,
}

impl SessionHandle {
    pub fn active(session_id: SessionId, context: SessionContext) -> Self {
        Self {
            session_id: Some(session_id),
            context: Some(context),
            expired: false,
        }
    }

    /// No session, because the presented one expired.
    pub fn expired() -> Self {
        Self {
            expired: true,
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.context.as_ref().and_then(SessionContext::principal)
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn authentication(&self) -> Authentication {
        Authentication::of(self.principal())
    }
}
