use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("token header has no key id")]
    MissingKeyId,

    #[error("no signing key for key id {0}")]
    UnknownKeyId(String),

    #[error("failed to fetch JWKS: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("invalid JWK: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
}

/// Resolves the key that verifies a token signed under `kid`.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, JwksError>;
}

/// A single fixed key, regardless of key id.
pub struct StaticKey {
    key: DecodingKey,
}

impl StaticKey {
    pub fn new(key: DecodingKey) -> Self {
        Self { key }
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret))
    }
}

#[async_trait]
impl KeySource for StaticKey {
    async fn decoding_key(&self, _kid: Option<&str>) -> Result<DecodingKey, JwksError> {
        Ok(self.key.clone())
    }
}

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

/// Remote JWKS endpoint with a per-key-id cache.
///
/// The whole set is refetched when it is older than the TTL, or when a token names a key id the
/// cache does not know, at most once per cooldown.
pub struct JwksClient {
    url: String,
    http: reqwest::Client,
    ttl: Duration,
    refresh_cooldown: Duration,
    cache: RwLock<KeyCache>,
}

impl JwksClient {
    pub fn new(url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            ttl,
            refresh_cooldown: Duration::from_secs(10),
            cache: RwLock::new(KeyCache::default()),
        }
    }

    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>, JwksError> {
        let set: JwkSet = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                debug!("Skipping JWK without kid from {}", self.url);
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => warn!("Skipping unusable JWK {}: {}", kid, e),
            }
        }
        Ok(keys)
    }

    async fn refresh(&self) -> Result<(), JwksError> {
        let keys = self.fetch().await?;
        let mut cache = self.cache.write().await;
        info!("Fetched {} signing keys from {}", keys.len(), self.url);
        cache.keys = keys;
        cache.fetched_at = Some(Instant::now());
        Ok(())
    }
}

#[async_trait]
impl KeySource for JwksClient {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, JwksError> {
        let kid = kid.ok_or(JwksError::MissingKeyId)?;

        let needs_refresh = {
            let cache = self.cache.read().await;
            match cache.fetched_at {
                None => true,
                Some(at) if at.elapsed() >= self.ttl => true,
                Some(at) => {
                    if let Some(key) = cache.keys.get(kid) {
                        return Ok(key.clone());
                    }
                    at.elapsed() >= self.refresh_cooldown
                }
            }
        };

        if needs_refresh {
            self.refresh().await?;
        }

        let cache = self.cache.read().await;
        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| JwksError::UnknownKeyId(kid.to_string()))
    }
}
