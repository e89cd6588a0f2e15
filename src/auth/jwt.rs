use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::jwks::{JwksError, KeySource};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error(transparent)]
    Key(#[from] JwksError),

    #[error(transparent)]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error("algorithm {0:?} is not accepted")]
    Algorithm(Algorithm),

    #[error("invalid authorized party")]
    AuthorizedParty,

    #[error("missing \"scope\" claim")]
    MissingScopeClaim,

    #[error("missing scope {0}")]
    MissingScope(String),
}

/// Claims read from identity-provider session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub iss: String,
    pub exp: i64,
}

impl Claims {
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or_default().split(' ').filter(|s| !s.is_empty())
    }
}

/// Verifies signature, issuer, authorized party and, optionally, scopes.
pub struct JwtVerifier {
    keys: Arc<dyn KeySource>,
    algorithms: Vec<Algorithm>,
    issuer: String,
    authorized_party: String,
}

impl JwtVerifier {
    pub fn new(
        keys: Arc<dyn KeySource>,
        algorithms: Vec<Algorithm>,
        issuer: impl Into<String>,
        authorized_party: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            algorithms,
            issuer: issuer.into(),
            authorized_party: authorized_party.into(),
        }
    }

    pub async fn verify(&self, token: &str, required_scopes: &[&str]) -> Result<Claims, JwtError> {
        let header = decode_header(token)?;
        if !self.algorithms.contains(&header.alg) {
            return Err(JwtError::Algorithm(header.alg));
        }
        let key = self.keys.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(header.alg);
        validation.algorithms = self.algorithms.clone();
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_aud = false;

        let claims = decode::<Claims>(token, &key, &validation)?.claims;

        if claims.azp.as_deref() != Some(self.authorized_party.as_str()) {
            return Err(JwtError::AuthorizedParty);
        }

        if !required_scopes.is_empty() {
            if claims.scope.is_none() {
                return Err(JwtError::MissingScopeClaim);
            }
            let granted: Vec<&str> = claims.scopes().collect();
            if let Some(missing) = required_scopes.iter().find(|s| !granted.contains(s)) {
                return Err(JwtError::MissingScope(missing.to_string()));
            }
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::StaticKey;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &[u8] = b"unit-test-secret";

    fn verifier() -> JwtVerifier {
        JwtVerifier::new(
            Arc::new(StaticKey::from_secret(SECRET)),
            vec![Algorithm::HS256],
            "https://issuer.example.com",
            "https://app.example.com",
        )
    }

    fn token(claims: serde_json::Value) -> String {
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn claims() -> serde_json::Value {
        json!({
            "iss": "https://issuer.example.com",
            "azp": "https://app.example.com",
            "email": "a@example.com",
            "scope": "read:users write:users",
            "exp": chrono::Utc::now().timestamp() + 600,
        })
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let claims = verifier().verify(&token(claims()), &["read:users"]).await.unwrap();
        assert_eq!(claims.email.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn rejects_wrong_authorized_party() {
        let mut c = claims();
        c["azp"] = json!("https://evil.example.com");
        let err = verifier().verify(&token(c), &[]).await.unwrap_err();
        assert!(matches!(err, JwtError::AuthorizedParty));
    }

    #[tokio::test]
    async fn rejects_wrong_issuer() {
        let mut c = claims();
        c["iss"] = json!("https://other.example.com");
        assert!(matches!(verifier().verify(&token(c), &[]).await, Err(JwtError::Decode(_))));
    }

    #[tokio::test]
    async fn rejects_missing_scope() {
        let err = verifier().verify(&token(claims()), &["admin"]).await.unwrap_err();
        assert!(matches!(err, JwtError::MissingScope(s) if s == "admin"));

        let mut c = claims();
        c.as_object_mut().unwrap().remove("scope");
        let err = verifier().verify(&token(c), &["read:users"]).await.unwrap_err();
        assert!(matches!(err, JwtError::MissingScopeClaim));
    }

    #[tokio::test]
    async fn rejects_unaccepted_algorithm() {
        let t = encode(&Header::new(Algorithm::HS512), &claims(), &EncodingKey::from_secret(SECRET)).unwrap();
        assert!(matches!(verifier().verify(&t, &[]).await, Err(JwtError::Algorithm(Algorithm::HS512))));
    }
}
