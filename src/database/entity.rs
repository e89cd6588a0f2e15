use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use super::query::Condition;
use super::value::Changes;

/// A persisted record type: one table, a UUID primary key named `id`, server-assigned timestamps.
pub trait Entity:
    for<'r> FromRow<'r, PgRow> + Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;

    /// Every column, including `id`, `created_at` and `updated_at`.
    const COLUMNS: &'static [&'static str];

    /// Columns carrying a uniqueness constraint.
    const UNIQUE: &'static [&'static str] = &[];

    /// Column matched by the free-text `search` filter.
    const SEARCH_COLUMN: Option<&'static str> = None;

    /// Whether the table has `created_by`/`updated_by` audit columns.
    const AUDITED: bool = false;

    /// Foreign keys as `(column, referenced table)`. Rows go away with the row they reference.
    const REFERENCES: &'static [(&'static str, &'static str)] = &[];

    fn id(&self) -> Uuid;

    /// Resolves a user-supplied column name to the static column name, if it exists.
    fn column(name: &str) -> Option<&'static str> {
        Self::COLUMNS.iter().copied().find(|c| *c == name)
    }

    fn has_column(name: &str) -> bool {
        Self::column(name).is_some()
    }

    /// Predicate for the `search` filter. Case-insensitive substring match by default.
    fn search(term: &str) -> Option<Condition> {
        Self::SEARCH_COLUMN.map(|column| Condition::Contains(column, term.to_string()))
    }
}

/// A typed payload that can be written to an entity's table.
pub trait Changeset: Send + Sync {
    fn changes(&self) -> Changes;
}

impl Changeset for Changes {
    fn changes(&self) -> Changes {
        self.clone()
    }
}
