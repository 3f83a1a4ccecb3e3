//! JWKS key store: fetch, cache, and single-flight refresh
//!
//! The store owns the current key set (public signing keys indexed by key
//! id) behind a single-writer/many-reader lock. Lookups never touch the
//! network; a refresh replaces the whole set atomically, so readers see
//! either the old set or the new one, never a partial update.
//!
//! Refresh is reactive: a key-id miss triggers it. Concurrent misses collapse
//! into one outstanding fetch - waiters queue on the refresh mutex and a
//! generation counter tells a waiter whether someone else already refreshed
//! while it was queued. A failed fetch leaves the previous set intact.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::AuthError;

/// Timeout for the remote key-document fetch
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Cached set of public signing keys fetched from a remote JWKS endpoint
#[derive(Debug)]
pub struct KeyStore {
    /// Key document URL
    jwks_url: String,
    /// Current key set, kid -> key; empty until the first refresh
    keys: RwLock<HashMap<String, Jwk>>,
    /// Serializes refreshes; misses queue here
    refresh_mutex: Mutex<()>,
    /// Bumped on every successful swap
    generation: AtomicU64,
    /// HTTP client
    http: reqwest::Client,
}

impl KeyStore {
    /// Create a store for the given key-document URL
    ///
    /// The set starts empty; it is populated on the first miss (or an eager
    /// [`KeyStore::refresh`] at boot).
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::unavailable(format!("http client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            keys: RwLock::new(HashMap::new()),
            refresh_mutex: Mutex::new(()),
            generation: AtomicU64::new(0),
            http,
        })
    }

    /// The configured key-document URL
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Look up a key by id in the cached set; never fetches
    pub async fn get(&self, key_id: &str) -> Option<Jwk> {
        self.keys.read().await.get(key_id).cloned()
    }

    /// Look up a key, refreshing the set at most once on a miss
    ///
    /// All validations that miss concurrently share one fetch: the first
    /// caller through the mutex performs it, the rest observe its result via
    /// the generation counter. A miss that persists after a refresh is an
    /// unknown key, not a retry condition.
    pub async fn get_or_refresh(&self, key_id: &str) -> Result<Jwk, AuthError> {
        if let Some(key) = self.get(key_id).await {
            return Ok(key);
        }

        let seen_generation = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh_mutex.lock().await;

        if self.generation.load(Ordering::Acquire) == seen_generation {
            self.fetch_and_swap().await?;
        } else {
            debug!(key_id, "key set already refreshed by a concurrent miss");
        }

        self.get(key_id)
            .await
            .ok_or_else(|| AuthError::invalid("unknown signing key"))
    }

    /// Force a refresh of the key set
    ///
    /// Failures leave the previous set intact and map to
    /// `auth_unavailable` - a fetch error means the store cannot validate
    /// anyone, not that one token is bad.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _guard = self.refresh_mutex.lock().await;
        self.fetch_and_swap().await
    }

    /// Number of keys currently cached
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    /// Whether the cache holds no keys yet
    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }

    /// Fetch the key document and swap the set in wholesale
    ///
    /// Caller must hold the refresh mutex.
    async fn fetch_and_swap(&self) -> Result<(), AuthError> {
        info!(jwks_url = %self.jwks_url, "fetching key document");

        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                warn!(jwks_url = %self.jwks_url, error = %e, "key document fetch failed");
                AuthError::unavailable("key document fetch failed")
            })?;

        if !response.status().is_success() {
            warn!(
                jwks_url = %self.jwks_url,
                status = %response.status(),
                "key document endpoint returned error status"
            );
            return Err(AuthError::unavailable("key document fetch failed"));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            warn!(jwks_url = %self.jwks_url, error = %e, "invalid key document");
            AuthError::unavailable("invalid key document")
        })?;

        // Rebuild the index from scratch: stale keys are discarded together,
        // and a duplicated kid resolves to the last-fetched entry.
        let mut indexed = HashMap::new();
        for key in jwks.keys {
            match key.common.key_id.clone() {
                Some(kid) => {
                    indexed.insert(kid, key);
                }
                None => debug!("dropping key without a key id"),
            }
        }

        info!(
            jwks_url = %self.jwks_url,
            key_count = indexed.len(),
            "key set refreshed"
        );

        {
            let mut keys = self.keys.write().await;
            *keys = indexed;
        }
        self.generation.fetch_add(1, Ordering::Release);

        Ok(())
    }
}
