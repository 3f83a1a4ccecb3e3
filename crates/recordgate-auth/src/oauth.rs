//! Authorization-code flow against an external OAuth2 provider
//!
//! Two operations back the login and callback endpoints. Login mints a fresh
//! CSRF state and PKCE pair, parks them in the caller's session, and hands
//! back the provider's authorization URL. Callback requires the returned
//! state to match the parked one exactly; on a match the state is consumed
//! first, then the code is exchanged for an access token, which lands in the
//! session. A mismatch leaves the parked state untouched so the legitimate
//! round trip can still land.

use std::sync::Arc;
use std::time::SystemTime;

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AuthError;
use crate::session::{SessionStore, StoredToken};

/// CSRF state length in random bytes (256 bits of entropy)
const STATE_ENTROPY_BYTES: u32 = 32;

/// Timeout for the token-exchange call
const EXCHANGE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Provider endpoints and client credentials for the authorization-code flow
#[derive(Clone)]
pub struct OAuthConfig {
    /// Client identifier registered with the provider
    pub client_id: String,
    /// Client secret registered with the provider
    pub client_secret: SecretString,
    /// Provider authorization endpoint
    pub auth_url: String,
    /// Provider token endpoint
    pub token_url: String,
    /// Redirect URL registered for this deployment (the callback endpoint)
    pub redirect_url: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Driver for the authorization-code round trip
#[derive(Debug)]
pub struct OAuthFlow<S> {
    client: ConfiguredClient,
    store: Arc<S>,
    http: reqwest::Client,
}

impl<S: SessionStore> OAuthFlow<S> {
    /// Build a flow from provider configuration and a session store
    pub fn new(config: OAuthConfig, store: Arc<S>) -> Result<Self, AuthError> {
        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| AuthError::unavailable(format!("invalid authorization URL: {e}")))?;
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| AuthError::unavailable(format!("invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| AuthError::unavailable(format!("invalid redirect URL: {e}")))?;

        let client = BasicClient::new(ClientId::new(config.client_id))
            .set_client_secret(ClientSecret::new(
                config.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        // Redirects stay disabled so the token endpoint cannot bounce the
        // exchange (and its credentials) to another host.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(EXCHANGE_TIMEOUT)
            .build()
            .map_err(|e| AuthError::unavailable(format!("http client: {e}")))?;

        Ok(Self {
            client,
            store,
            http,
        })
    }

    /// Begin a login: park fresh state in the session, return the provider URL
    ///
    /// Starting a second login overwrites any previous pending state, so only
    /// the most recent round trip can complete.
    pub async fn login(&self, session_id: &str) -> Result<Url, AuthError> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (authorize_url, csrf_state) = self
            .client
            .authorize_url(|| CsrfToken::new_random_len(STATE_ENTROPY_BYTES))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let mut session = self.store.load(session_id).await.unwrap_or_default();
        session.state = Some(csrf_state.secret().clone());
        session.pkce_verifier = Some(pkce_verifier.secret().clone());
        self.store.store(session_id, session).await;

        debug!(session_id, "login started");
        Ok(authorize_url)
    }

    /// Complete a login: match the state, exchange the code, store the token
    ///
    /// The parked state is consumed on a successful match before the exchange
    /// runs, so a replayed callback fails the match even if the exchange
    /// itself fails. A mismatched state consumes nothing.
    pub async fn callback(
        &self,
        session_id: &str,
        code: &str,
        state: &str,
    ) -> Result<(), AuthError> {
        let session = self
            .store
            .load(session_id)
            .await
            .ok_or_else(|| AuthError::invalid("no login in progress"))?;

        let expected_state = session
            .state
            .as_deref()
            .ok_or_else(|| AuthError::invalid("no login in progress"))?;

        if !bool::from(expected_state.as_bytes().ct_eq(state.as_bytes())) {
            warn!(session_id, "state mismatch on callback");
            return Err(AuthError::invalid("state mismatch"));
        }

        // Consume the state and verifier only now that the match succeeded.
        let (_, verifier) = self
            .store
            .take_login_state(session_id)
            .await
            .ok_or_else(|| AuthError::invalid("no login in progress"))?;

        let mut exchange = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()));
        if let Some(verifier) = verifier {
            exchange = exchange.set_pkce_verifier(PkceCodeVerifier::new(verifier));
        }

        let token_response = exchange.request_async(&self.http).await.map_err(|e| {
            warn!(session_id, error = %e, "token exchange failed");
            AuthError::invalid("token exchange failed")
        })?;

        let expires_at = token_response
            .expires_in()
            .map(|ttl| SystemTime::now() + ttl);

        let mut session = self.store.load(session_id).await.unwrap_or_default();
        session.token = Some(StoredToken {
            access_token: token_response.access_token().secret().clone(),
            expires_at,
        });
        self.store.store(session_id, session).await;

        info!(session_id, "login completed");
        Ok(())
    }
}
