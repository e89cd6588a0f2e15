// handlers/public/mod.rs - Endpoints that do not require a credential

pub mod health;   // GET {prefix}/health
pub mod webhooks; // POST /webhooks/clerk
