//! Validated identity attached to a request after authentication

use std::collections::HashMap;
use std::time::SystemTime;

use serde::Serialize;
use serde_json::Value;

/// Authentication context produced by a successful gate pass
///
/// Attached to the request scope so downstream handlers can see who was
/// validated and by which strategy. Rejections never produce one of these.
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    /// Principal identifier (JWT `sub`, session id, or the provider name
    /// for shared-secret auth)
    pub subject: String,
    /// Name of the authenticator variant that validated the request
    pub provider: &'static str,
    /// Validated claims, if the credential carried any
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub claims: HashMap<String, Value>,
    /// When the credential expires, if it does
    #[serde(skip)]
    pub expires_at: Option<SystemTime>,
}

impl AuthContext {
    /// Context for a credential with no claim set (shared secret, session)
    pub fn new(subject: impl Into<String>, provider: &'static str) -> Self {
        Self {
            subject: subject.into(),
            provider,
            claims: HashMap::new(),
            expires_at: None,
        }
    }

    /// Attach a validated claim set
    pub fn with_claims(mut self, claims: HashMap<String, Value>) -> Self {
        self.claims = claims;
        self
    }

    /// Attach a credential expiry
    pub fn with_expiry(mut self, expires_at: SystemTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}
