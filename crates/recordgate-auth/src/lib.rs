//! Authentication strategies for the record gateway
//!
//! One [`Authenticator`] guards every data-bearing request. Three strategies
//! implement it, selected by configuration at startup:
//!
//! - [`StaticKeyAuthenticator`]: a pre-shared secret compared in constant
//!   time
//! - [`SessionAuthenticator`]: a server-side session populated by the OAuth2
//!   authorization-code flow in [`oauth`]
//! - [`JwtAuthenticator`]: bearer JWTs verified against a cached, remotely
//!   fetched key set ([`KeyStore`])
//!
//! All strategies reject with a categorized [`AuthError`]; the mapping to
//! transport status codes lives with the server, not here.

pub mod context;
pub mod error;
pub mod jwt;
pub mod keys;
pub mod oauth;
pub mod session;
pub mod static_key;
pub mod types;

pub use context::AuthContext;
pub use error::{AuthError, AuthErrorKind};
pub use jwt::JwtAuthenticator;
pub use keys::KeyStore;
pub use oauth::{OAuthConfig, OAuthFlow};
pub use session::{
    MemorySessionStore, SessionAuthenticator, SessionData, SessionStore, StoredToken,
};
pub use static_key::{verify_shared_secret, StaticKeyAuthenticator};
pub use types::{extract_bearer, AuthRequest, Authenticator};
