#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use userbase_api::app::{app, AppState};
use userbase_api::auth::{ApiKeyHasher, StaticKey};
use userbase_api::config::AppConfig;
use userbase_api::database::models::{Role, User, UserCreate};
use userbase_api::database::Session;
use userbase_api::services::{ApiKeyService, CreateService, UserService};

pub const JWT_SECRET: &[u8] = b"integration-test-signing-secret";
pub const ISSUER: &str = "https://clerk.userbase.test";
pub const AUTHORIZED_PARTY: &str = "http://localhost:3000";
pub const PREFIX: &str = "/api/v1";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.secret_key = "integration-test-api-key-secret".to_string();
    config.security.clerk_issuer = ISSUER.to_string();
    config.security.clerk_authorized_party = AUTHORIZED_PARTY.to_string();
    config.security.clerk_algorithms = vec![Algorithm::HS256];
    config.testing = true;
    config
}

/// In-process server over the in-memory store, one per test.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = AppState::new(
            test_config(),
            Session::memory(),
            Arc::new(StaticKey::from_secret(JWT_SECRET)),
        );

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let router = app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self { port, base_url, state, client: reqwest::Client::new() };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// URL of an API route under the prefix.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, PREFIX, path)
    }

    pub fn session(&self) -> &Session {
        &self.state.session
    }

    pub fn hasher(&self) -> ApiKeyHasher {
        self.state.hasher.clone()
    }

    pub async fn create_user(&self, email: &str, role: Role) -> Result<User> {
        Ok(UserService::for_system(self.session()).create(&UserCreate::new(email, role)).await?)
    }

    pub async fn api_key_for(&self, user: &User) -> Result<String> {
        let service = ApiKeyService::for_system(self.session(), self.hasher());
        Ok(service.generate_api_key(user).await?.api_key)
    }
}

pub fn claims_for(email: &str) -> Value {
    json!({
        "sub": "user_2abc",
        "email": email,
        "iss": ISSUER,
        "azp": AUTHORIZED_PARTY,
        "exp": chrono::Utc::now().timestamp() + 3600,
    })
}

pub fn sign(claims: &Value) -> String {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(JWT_SECRET))
        .expect("failed to sign test token")
}

pub fn token_for(email: &str) -> String {
    sign(&claims_for(email))
}
