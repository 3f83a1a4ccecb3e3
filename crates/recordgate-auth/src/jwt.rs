//! JWKS-backed bearer token validation
//!
//! Validation order matters for security:
//!
//! 1. decode the token header without trusting any claim
//! 2. gate the algorithm against an asymmetric-only allowlist *before* any
//!    key lookup - a symmetric algorithm here is an attempted
//!    public-key-as-secret downgrade and is rejected outright
//! 3. resolve the key id through the [`KeyStore`] (at most one refresh on a
//!    miss)
//! 4. verify the signature and the time-based claims

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, TokenData, Validation};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::keys::KeyStore;
use crate::types::{extract_bearer, AuthRequest, Authenticator};

/// Algorithms the validator will accept
///
/// Asymmetric families only. The expected algorithm set is fixed by the
/// validator, never inferred from the token.
const ALLOWED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// Clock skew tolerance for exp/nbf checks
const CLOCK_SKEW_LEEWAY: Duration = Duration::from_secs(60);

/// JWKS-JWT authenticator
#[derive(Debug)]
pub struct JwtAuthenticator {
    /// Public key source
    key_store: Arc<KeyStore>,
    /// Expected `iss` claim, enforced when configured
    expected_issuer: Option<String>,
}

impl JwtAuthenticator {
    /// Create a validator backed by the given key store
    pub fn new(key_store: Arc<KeyStore>) -> Self {
        Self {
            key_store,
            expected_issuer: None,
        }
    }

    /// Require the `iss` claim to match the given issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.expected_issuer = Some(issuer.into());
        self
    }

    /// Validate a bearer token and return its claim set
    async fn validate(&self, token: &str) -> Result<HashMap<String, Value>, AuthError> {
        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "undecodable token header");
            AuthError::Malformed("undecodable token header".to_string())
        })?;

        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            warn!(algorithm = ?header.alg, "token algorithm not allowed");
            return Err(AuthError::invalid("unsupported algorithm"));
        }

        let key_id = header
            .kid
            .ok_or_else(|| AuthError::invalid("unknown signing key"))?;

        // Miss triggers exactly one shared refresh inside the store.
        let jwk = self.key_store.get_or_refresh(&key_id).await?;

        // The key must agree with the header algorithm explicitly; a key
        // published for one algorithm is never used under another.
        if let Some(key_alg) = jwk.common.key_algorithm {
            if key_alg.to_string() != format!("{:?}", header.alg) {
                warn!(key_id, key_alg = %key_alg, token_alg = ?header.alg, "key/token algorithm mismatch");
                return Err(AuthError::invalid("unsupported algorithm"));
            }
        }

        let decoding_key = DecodingKey::from_jwk(&jwk).map_err(|e| {
            warn!(key_id, error = %e, "unusable key in key set");
            AuthError::unavailable("unusable signing key")
        })?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = CLOCK_SKEW_LEEWAY.as_secs();
        validation.validate_nbf = true;
        validation.validate_aud = false;
        // exp/nbf are checked when present rather than required outright
        validation.set_required_spec_claims::<&str>(&[]);
        if let Some(issuer) = &self.expected_issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data: TokenData<HashMap<String, Value>> =
            decode(token, &decoding_key, &validation).map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                debug!(error = %e, "token validation failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::invalid("token expired"),
                    ErrorKind::ImmatureSignature => AuthError::invalid("token not yet valid"),
                    ErrorKind::InvalidIssuer => AuthError::invalid("invalid issuer"),
                    _ => AuthError::invalid("invalid signature"),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait::async_trait]
impl Authenticator for JwtAuthenticator {
    fn name(&self) -> &'static str {
        "jwks-jwt"
    }

    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthContext, AuthError> {
        let token = extract_bearer(request.authorization.as_deref())?;
        let claims = self.validate(token).await?;

        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let expires_at = claims
            .get("exp")
            .and_then(Value::as_u64)
            .map(|exp| UNIX_EPOCH + Duration::from_secs(exp));

        debug!(subject = %subject, "token validated");

        let mut ctx = AuthContext::new(subject, self.name()).with_claims(claims);
        ctx.expires_at = expires_at;
        Ok(ctx)
    }
}
