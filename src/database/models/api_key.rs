use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::{Changes, Changeset, Entity};

/// Stored API key. Only the keyed hash of the secret is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub key_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ApiKey {
    const TABLE: &'static str = "api_keys";
    const COLUMNS: &'static [&'static str] = &["id", "key_hash", "user_id", "created_at", "updated_at"];
    const UNIQUE: &'static [&'static str] = &["key_hash", "user_id"];
    const REFERENCES: &'static [(&'static str, &'static str)] = &[("user_id", "users")];

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiKeyCreate {
    pub key_hash: String,
    pub user_id: Uuid,
}

impl Changeset for ApiKeyCreate {
    fn changes(&self) -> Changes {
        Changes::new()
            .with("key_hash", self.key_hash.clone())
            .with("user_id", self.user_id)
    }
}

/// Returned once, when a key is generated. The plaintext is not recoverable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyGenerated {
    pub api_key: String,
}
