//! Static-key authentication with constant-time comparison
//!
//! The presented token is compared against a pre-shared secret configured at
//! startup. Both sides are hashed with BLAKE3 before a `subtle` constant-time
//! digest comparison, so the comparison cost is independent of where a
//! mismatch occurs and of the secret's length. A plain `==` here would leak a
//! character-by-character timing side-channel.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::types::{extract_bearer, AuthRequest, Authenticator};

/// Compare a presented secret against the expected one in constant time
#[must_use]
pub fn verify_shared_secret(provided: &str, expected: &str) -> bool {
    let provided_hash: [u8; 32] = blake3::hash(provided.as_bytes()).into();
    let expected_hash: [u8; 32] = blake3::hash(expected.as_bytes()).into();
    provided_hash.ct_eq(&expected_hash).into()
}

/// Pre-shared-secret authenticator
///
/// No external calls; the only failure modes are a missing header, a
/// malformed header, and a mismatched secret.
pub struct StaticKeyAuthenticator {
    secret: SecretString,
}

impl std::fmt::Debug for StaticKeyAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeyAuthenticator")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl StaticKeyAuthenticator {
    /// Create an authenticator for the given pre-shared secret
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

#[async_trait::async_trait]
impl Authenticator for StaticKeyAuthenticator {
    fn name(&self) -> &'static str {
        "static-key"
    }

    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthContext, AuthError> {
        let token = extract_bearer(request.authorization.as_deref())?;

        if verify_shared_secret(token, self.secret.expose_secret()) {
            Ok(AuthContext::new("static-key-client", self.name()))
        } else {
            tracing::debug!("static key mismatch");
            Err(AuthError::invalid("invalid credential"))
        }
    }
}
