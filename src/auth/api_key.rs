use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::{thread_rng, Rng};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a generated key.
const KEY_BYTES: usize = 32;

/// Keyed hashing for API keys.
///
/// The hash is deterministic, so it doubles as the lookup key for the stored record.
#[derive(Clone)]
pub struct ApiKeyHasher {
    secret: Arc<[u8]>,
}

impl ApiKeyHasher {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self { secret: Arc::from(secret.as_ref()) }
    }

    fn mac(&self) -> HmacSha256 {
        match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
        }
    }

    /// Hex-encoded HMAC-SHA256 of the key.
    pub fn hash(&self, api_key: &str) -> String {
        let mut mac = self.mac();
        mac.update(api_key.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison of a key against a stored hash.
    pub fn verify(&self, api_key: &str, key_hash: &str) -> bool {
        let Ok(expected) = hex::decode(key_hash) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(api_key.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    /// A fresh URL-safe random key.
    pub fn generate(&self) -> String {
        let mut token = [0u8; KEY_BYTES];
        thread_rng().fill(&mut token);
        general_purpose::URL_SAFE_NO_PAD.encode(token)
    }
}

impl fmt::Debug for ApiKeyHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyHasher").field("secret", &"<redacted>").finish()
    }
}
