//! The authenticator gate and its request view
//!
//! Every inbound request passes through exactly one [`Authenticator`],
//! selected at process configuration time. The gate sees a transport-agnostic
//! [`AuthRequest`] rather than raw HTTP types so the strategies stay testable
//! without a server.

use async_trait::async_trait;

use crate::context::AuthContext;
use crate::error::AuthError;

/// Transport-agnostic view of the credentials on an inbound request
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// Raw `Authorization` header value, if present
    pub authorization: Option<String>,
    /// Session cookie value, if present
    pub session_cookie: Option<String>,
}

impl AuthRequest {
    /// Request carrying only an `Authorization` header
    pub fn bearer(header: impl Into<String>) -> Self {
        Self {
            authorization: Some(header.into()),
            session_cookie: None,
        }
    }

    /// Request carrying only a session cookie
    pub fn session(cookie: impl Into<String>) -> Self {
        Self {
            authorization: None,
            session_cookie: Some(cookie.into()),
        }
    }
}

/// The polymorphic authentication gate
///
/// Produces either "authenticated, continue" (an [`AuthContext`]) or a
/// categorized rejection. Rejection must have no side effects beyond the
/// returned error.
#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug {
    /// Strategy name, used as the provider tag on successful contexts
    fn name(&self) -> &'static str;

    /// Authenticate one request
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthContext, AuthError>;
}

/// Extract the token from a `Bearer <token>` header value
///
/// The header must be exactly two space-separated parts with the `Bearer`
/// scheme. A missing header is `AuthRequired`; anything else that does not
/// fit the shape is `AuthMalformed`.
pub fn extract_bearer(authorization: Option<&str>) -> Result<&str, AuthError> {
    let header = authorization.ok_or(AuthError::Required)?;

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::Malformed(
            "expected 'Bearer <token>'".to_string(),
        )),
    }
}
