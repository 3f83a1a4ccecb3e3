//! Authentication error taxonomy
//!
//! Every rejection carries a stable machine-readable kind plus a categorized
//! human message. The categories are deliberately coarse so a caller cannot
//! use the error as an oracle to distinguish, say, "unknown user" from
//! "wrong secret" beyond what the category already states. No variant ever
//! embeds raw internals, file paths, or secret material.

use serde::Serialize;
use thiserror::Error;

/// Stable error categories surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    /// No credential was presented
    AuthRequired,
    /// A credential was presented but could not be parsed
    AuthMalformed,
    /// The credential parsed but failed validation
    AuthInvalid,
    /// The auth subsystem cannot currently validate anyone
    AuthUnavailable,
}

impl AuthErrorKind {
    /// The wire representation of this kind
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::AuthMalformed => "auth_malformed",
            Self::AuthInvalid => "auth_invalid",
            Self::AuthUnavailable => "auth_unavailable",
        }
    }
}

/// Authentication failure
///
/// `Unavailable` is kept distinct from `Invalid` on purpose: a failed key
/// fetch or token exchange means nobody can authenticate right now, which an
/// operator must be able to tell apart from one bad token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential presented
    #[error("authorization required")]
    Required,

    /// Credential present but not parseable
    #[error("malformed authorization header: {0}")]
    Malformed(String),

    /// Credential parseable but failed validation
    #[error("{0}")]
    Invalid(String),

    /// A dependency needed for validation is unreachable
    #[error("authentication service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Categorize this error
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::Required => AuthErrorKind::AuthRequired,
            Self::Malformed(_) => AuthErrorKind::AuthMalformed,
            Self::Invalid(_) => AuthErrorKind::AuthInvalid,
            Self::Unavailable(_) => AuthErrorKind::AuthUnavailable,
        }
    }

    /// Invalid-credential error with the categorized reason
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    /// Dependency-unreachable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_stable_strings() {
        assert_eq!(AuthError::Required.kind().as_str(), "auth_required");
        assert_eq!(
            AuthError::Malformed("x".into()).kind().as_str(),
            "auth_malformed"
        );
        assert_eq!(
            AuthError::invalid("invalid credential").kind().as_str(),
            "auth_invalid"
        );
        assert_eq!(
            AuthError::unavailable("key fetch failed").kind().as_str(),
            "auth_unavailable"
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&AuthErrorKind::AuthUnavailable).unwrap();
        assert_eq!(json, "\"auth_unavailable\"");
    }

    #[test]
    fn display_carries_categorized_reason_only() {
        let err = AuthError::invalid("token expired");
        assert_eq!(err.to_string(), "token expired");
    }
}
