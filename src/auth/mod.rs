//! Request authentication: API keys, identity-provider bearer tokens and the gate that combines them.

pub mod api_key;
pub mod error;
pub mod gate;
pub mod jwks;
pub mod jwt;

pub use api_key::ApiKeyHasher;
pub use error::AuthError;
pub use gate::{Authenticator, Credentials};
pub use jwks::{JwksClient, JwksError, KeySource, StaticKey};
pub use jwt::{Claims, JwtError, JwtVerifier};
