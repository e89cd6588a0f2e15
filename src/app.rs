use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{ApiKeyHasher, Authenticator, JwksClient, JwtVerifier, KeySource};
use crate::config::AppConfig;
use crate::database::Session;
use crate::handlers::{protected, public};

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: Session,
    pub hasher: ApiKeyHasher,
    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    /// Wires the authenticator over `keys`. Production passes a [`JwksClient`].
    pub fn new(config: AppConfig, session: Session, keys: Arc<dyn KeySource>) -> Self {
        let hasher = ApiKeyHasher::new(config.security.secret_key.as_bytes());
        let verifier = JwtVerifier::new(
            keys,
            config.security.clerk_algorithms.clone(),
            config.security.clerk_issuer.clone(),
            config.security.clerk_authorized_party.clone(),
        );
        let authenticator = Authenticator::new(session.clone(), hasher.clone(), Arc::new(verifier));

        Self {
            config: Arc::new(config),
            session,
            hasher,
            authenticator: Arc::new(authenticator),
        }
    }

    pub fn with_jwks(config: AppConfig, session: Session) -> Self {
        let jwks = JwksClient::new(config.jwks_url(), Duration::from_secs(config.security.jwks_cache_ttl_secs));
        Self::new(config, session, Arc::new(jwks))
    }
}

pub fn app(state: AppState) -> Router {
    let prefix = state.config.api.prefix.clone();
    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .nest(&prefix, api_routes())
        .nest("/webhooks", webhook_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(public::health::get))
        .route("/users", get(protected::users::list).post(protected::users::create))
        .route(
            "/users/:id",
            get(protected::users::get)
                .patch(protected::users::patch)
                .delete(protected::users::delete),
        )
        .route("/me", get(protected::me::get))
        .route(
            "/me/api-key",
            post(protected::me::api_key_post).delete(protected::me::api_key_delete),
        )
}

fn webhook_routes() -> Router<AppState> {
    Router::new().route("/clerk", post(public::webhooks::clerk_post))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}
