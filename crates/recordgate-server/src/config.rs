//! Environment-based server configuration
//!
//! One authentication mode is selected at startup and never mixed. Each mode
//! pulls its own variables; a missing required variable fails startup with an
//! error naming it.

use std::path::PathBuf;
use std::time::Duration;

use recordgate_auth::OAuthConfig;
use secrecy::SecretString;
use thiserror::Error;

/// Default listen port
const DEFAULT_PORT: u16 = 8080;

/// Default session lifetime (24 hours)
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    /// A variable is present but unusable
    #[error("invalid value for {name}: {reason}")]
    InvalidVar {
        /// Variable name
        name: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

/// Selected authentication mode with its per-mode settings
#[derive(Debug)]
pub enum AuthMode {
    /// Pre-shared key compared in constant time
    StaticKey {
        /// The shared secret
        api_key: SecretString,
    },
    /// Browser login through an external OAuth2 provider
    SessionOAuth {
        /// Provider endpoints and client credentials
        oauth: OAuthConfig,
        /// Session lifetime
        session_ttl: Duration,
    },
    /// Bearer JWTs validated against a remote key document
    JwksJwt {
        /// Key document URL
        jwks_url: String,
        /// Expected `iss` claim, enforced when set
        issuer: Option<String>,
    },
}

/// Full server configuration
#[derive(Debug)]
pub struct ServerConfig {
    /// Listen port
    pub port: u16,
    /// Path of the CSV record source
    pub csv_path: PathBuf,
    /// Authentication mode
    pub auth: AuthMode,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));

        let port = match lookup("RECORDGATE_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: "RECORDGATE_PORT",
                reason: format!("'{raw}' is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let csv_path = PathBuf::from(required("CSV_FILE_PATH")?);

        let mode = required("RECORDGATE_AUTH_MODE")?;
        let auth = match mode.as_str() {
            "static-key" => AuthMode::StaticKey {
                api_key: SecretString::new(required("RECORDGATE_API_KEY")?),
            },
            "session-oauth" => {
                let session_ttl = match lookup("SESSION_TTL_SECS") {
                    Some(raw) => {
                        let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidVar {
                            name: "SESSION_TTL_SECS",
                            reason: format!("'{raw}' is not a number of seconds"),
                        })?;
                        Duration::from_secs(secs)
                    }
                    None => DEFAULT_SESSION_TTL,
                };
                AuthMode::SessionOAuth {
                    oauth: OAuthConfig {
                        client_id: required("OAUTH_CLIENT_ID")?,
                        client_secret: SecretString::new(required("OAUTH_CLIENT_SECRET")?),
                        auth_url: required("OAUTH_AUTH_URL")?,
                        token_url: required("OAUTH_TOKEN_URL")?,
                        redirect_url: required("OAUTH_REDIRECT_URL")?,
                    },
                    session_ttl,
                }
            }
            "jwks-jwt" => AuthMode::JwksJwt {
                jwks_url: required("JWKS_URL")?,
                issuer: lookup("JWT_ISSUER"),
            },
            other => {
                return Err(ConfigError::InvalidVar {
                    name: "RECORDGATE_AUTH_MODE",
                    reason: format!(
                        "'{other}' is not one of static-key, session-oauth, jwks-jwt"
                    ),
                })
            }
        };

        Ok(Self {
            port,
            csv_path,
            auth,
        })
    }
}
