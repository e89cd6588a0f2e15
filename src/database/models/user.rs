use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::database::{Changes, Changeset, Entity, FieldValue};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Standard,
    Admin,
}

#[derive(Debug, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Role::Standard),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for FieldValue {
    fn from(role: Role) -> Self {
        FieldValue::Text(role.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// Identity-provider (Clerk) user id, when the account is synced from there.
    pub clerk_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role.parse::<Role>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            role,
            clerk_id: row.try_get("clerk_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            created_by: row.try_get("created_by")?,
            updated_by: row.try_get("updated_by")?,
        })
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email",
        "role",
        "clerk_id",
        "created_at",
        "updated_at",
        "created_by",
        "updated_by",
    ];
    const UNIQUE: &'static [&'static str] = &["email"];
    const SEARCH_COLUMN: Option<&'static str> = Some("email");
    const AUDITED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCreate {
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub clerk_id: Option<String>,
}

impl UserCreate {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self { email: email.into(), role, clerk_id: None }
    }
}

impl Changeset for UserCreate {
    fn changes(&self) -> Changes {
        Changes::new()
            .with("email", self.email.trim())
            .with("role", self.role)
            .with("clerk_id", self.clerk_id.clone())
    }
}

/// Admin-editable fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    #[serde(default)]
    pub role: Option<Role>,
}

impl Changeset for UserPatch {
    fn changes(&self) -> Changes {
        let mut changes = Changes::new();
        if let Some(role) = self.role {
            changes.set("role", role);
        }
        changes
    }
}

/// Email change pushed by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClerkUserUpdate {
    pub email: String,
}

impl Changeset for ClerkUserUpdate {
    fn changes(&self) -> Changes {
        Changes::new().with("email", self.email.trim())
    }
}

/// Public representation of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRead {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserRead {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
