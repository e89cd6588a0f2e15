//! In-process [`Store`] used by the test suite and for running the API without Postgres.
//!
//! Rows are kept as JSON objects and decoded into entities on the way out. Unique columns and
//! non-null fields are enforced. Deletes follow [`Entity::REFERENCES`] into the other stores of the
//! same [`MemoryDatabase`](super::session::MemoryDatabase), like `ON DELETE CASCADE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::entity::Entity;
use super::manager::DatabaseError;
use super::query::{Condition, Select, SortDirection};
use super::store::Store;
use super::value::{Changes, FieldValue};

type Row = Map<String, Value>;

/// Every store of one in-memory database, as seen by a cascading delete.
pub(crate) type Registry = Mutex<Vec<Arc<dyn Referencing>>>;

/// Type-erased store whose rows may reference rows of other tables.
#[async_trait]
pub(crate) trait Referencing: Send + Sync {
    fn references(&self) -> &'static [(&'static str, &'static str)];

    async fn delete_referencing(&self, column: &'static str, ids: &[Uuid]) -> Result<u64, DatabaseError>;
}

pub struct MemoryStore<E> {
    rows: RwLock<Vec<Row>>,
    registry: Weak<Registry>,
    _phantom: PhantomData<fn() -> E>,
}

impl<E: Entity> MemoryStore<E> {
    /// A standalone store. Deletes do not cascade.
    pub fn new() -> Self {
        Self::in_registry(Weak::new())
    }

    pub(crate) fn in_registry(registry: Weak<Registry>) -> Self {
        Self { rows: RwLock::new(vec![]), registry, _phantom: PhantomData }
    }

    /// Removes rows in sibling stores that reference any of `ids`.
    async fn cascade(&self, ids: &[Uuid]) -> Result<(), DatabaseError> {
        if ids.is_empty() {
            return Ok(());
        }
        let stores: Vec<Arc<dyn Referencing>> = match self.registry.upgrade() {
            Some(registry) => registry.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            None => return Ok(()),
        };
        for store in stores {
            for (column, table) in store.references() {
                if *table == E::TABLE {
                    store.delete_referencing(*column, ids).await?;
                }
            }
        }
        Ok(())
    }

    fn blank_row(now: DateTime<Utc>) -> Row {
        let mut row = Row::new();
        for column in E::COLUMNS {
            row.insert(column.to_string(), Value::Null);
        }
        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        for stamp in ["created_at", "updated_at"] {
            if E::has_column(stamp) {
                row.insert(stamp.to_string(), serde_json::json!(now));
            }
        }
        row
    }

    fn decode(row: &Row) -> Result<E, DatabaseError> {
        serde_json::from_value(Value::Object(row.clone()))
            .map_err(|e| DatabaseError::Constraint(format!("{}: {}", E::TABLE, e)))
    }

    /// Fails if two rows share a non-null value in any unique column.
    fn check_unique(rows: &[Row]) -> Result<(), DatabaseError> {
        for column in E::UNIQUE {
            let mut seen: Vec<&Value> = vec![];
            for value in rows.iter().filter_map(|r| r.get(*column)).filter(|v| !v.is_null()) {
                if seen.contains(&value) {
                    return Err(DatabaseError::Constraint(format!(
                        "duplicate key value violates unique constraint on {}.{}",
                        E::TABLE,
                        column
                    )));
                }
                seen.push(value);
            }
        }
        Ok(())
    }

    fn select_rows<'a>(rows: &'a [Row], select: &Select) -> Vec<&'a Row> {
        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| select.conditions.iter().all(|c| matches(row, c)))
            .collect();

        if let Some(order) = &select.order {
            matched.sort_by(|a, b| {
                let ord = compare(
                    a.get(order.column).unwrap_or(&Value::Null),
                    b.get(order.column).unwrap_or(&Value::Null),
                );
                match order.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        let offset = select.offset.unwrap_or(0).max(0) as usize;
        let limit = select.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        matched.into_iter().skip(offset).take(limit).collect()
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn row_id(row: &Row) -> Option<Uuid> {
    row.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

fn matches(row: &Row, condition: &Condition) -> bool {
    let field = |column: &str| row.get(column).cloned().unwrap_or(Value::Null);
    match condition {
        Condition::Eq(column, value) => equal(&field(column), &value.to_json()),
        Condition::In(column, values) => {
            let current = field(column);
            values.iter().any(|v| equal(&current, &v.to_json()))
        }
        Condition::Contains(column, term) => match field(column) {
            Value::String(s) => s.to_lowercase().contains(&term.to_lowercase()),
            _ => false,
        },
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return a.is_null() && b.is_null();
    }
    compare(a, b) == Ordering::Equal
}

fn as_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Postgres-like ordering: nulls sort after every value.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => match (as_timestamp(x), as_timestamp(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl<E: Entity> Store<E> for MemoryStore<E> {
    async fn fetch_all(&self, select: &Select) -> Result<Vec<E>, DatabaseError> {
        let rows = self.rows.read().await;
        Self::select_rows(&rows, select).into_iter().map(Self::decode).collect()
    }

    async fn count(&self, select: &Select) -> Result<i64, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(Self::select_rows(&rows, &select.unpaged()).len() as i64)
    }

    async fn fetch_ids(&self, select: &Select) -> Result<Vec<Uuid>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(Self::select_rows(&rows, &select.unpaged()).into_iter().filter_map(row_id).collect())
    }

    async fn insert(&self, rows: &[Changes]) -> Result<Vec<E>, DatabaseError> {
        let now = Utc::now();
        let mut new_rows = Vec::with_capacity(rows.len());
        for changes in rows {
            let mut row = Self::blank_row(now);
            for (column, value) in changes.iter() {
                row.insert(column.to_string(), value.to_json());
            }
            new_rows.push(row);
        }
        let created = new_rows.iter().map(Self::decode).collect::<Result<Vec<E>, _>>()?;

        let mut table = self.rows.write().await;
        let mut candidate = table.clone();
        candidate.extend(new_rows);
        Self::check_unique(&candidate)?;
        *table = candidate;
        Ok(created)
    }

    async fn update(&self, ids: &[Uuid], changes: &Changes) -> Result<Vec<E>, DatabaseError> {
        let mut table = self.rows.write().await;
        let mut candidate = table.clone();
        let now = serde_json::json!(Utc::now());
        let mut touched = vec![];

        for row in candidate.iter_mut() {
            if !row_id(row).is_some_and(|id| ids.contains(&id)) {
                continue;
            }
            if !changes.is_empty() {
                for (column, value) in changes.iter() {
                    row.insert(column.to_string(), value.to_json());
                }
                if E::has_column("updated_at") && !changes.contains("updated_at") {
                    row.insert("updated_at".to_string(), now.clone());
                }
            }
            touched.push(Self::decode(row)?);
        }

        Self::check_unique(&candidate)?;
        *table = candidate;
        Ok(touched)
    }

    async fn delete(&self, select: &Select) -> Result<u64, DatabaseError> {
        let removed: Vec<Row> = {
            let mut table = self.rows.write().await;
            let (removed, kept): (Vec<Row>, Vec<Row>) = table
                .drain(..)
                .partition(|row| select.conditions.iter().all(|c| matches(row, c)));
            *table = kept;
            removed
        };
        let ids: Vec<Uuid> = removed.iter().filter_map(row_id).collect();
        self.cascade(&ids).await?;
        Ok(removed.len() as u64)
    }
}

#[async_trait]
impl<E: Entity> Referencing for MemoryStore<E> {
    fn references(&self) -> &'static [(&'static str, &'static str)] {
        E::REFERENCES
    }

    async fn delete_referencing(&self, column: &'static str, ids: &[Uuid]) -> Result<u64, DatabaseError> {
        let values = ids.iter().copied().map(FieldValue::Uuid).collect();
        Store::delete(self, &Select::new().filter(Condition::In(column, values))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ApiKey, User};
    use crate::database::session::MemoryDatabase;
    use serde_json::json;

    #[test]
    fn nulls_sort_last() {
        let mut values = vec![json!(null), json!("b"), json!("a")];
        values.sort_by(compare);
        assert_eq!(values, vec![json!("a"), json!("b"), json!(null)]);
    }

    #[test]
    fn timestamps_compare_chronologically() {
        let earlier = json!("2024-01-01T00:00:00.500Z");
        let later = json!("2024-01-01T00:00:01Z");
        assert_eq!(compare(&earlier, &later), Ordering::Less);
    }

    #[test]
    fn null_equals_only_null() {
        assert!(equal(&json!(null), &json!(null)));
        assert!(!equal(&json!(null), &json!("x")));
    }

    async fn user_with_key(db: &MemoryDatabase, email: &str, key_hash: &str) -> User {
        let user = db
            .store::<User>()
            .insert(&[Changes::new().with("email", email).with("role", "standard")])
            .await
            .unwrap()
            .remove(0);
        db.store::<ApiKey>()
            .insert(&[Changes::new().with("key_hash", key_hash).with("user_id", user.id)])
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn deleting_a_row_removes_rows_that_reference_it() {
        let db = MemoryDatabase::default();
        let gone = user_with_key(&db, "gone@example.com", "hash-gone").await;
        let kept = user_with_key(&db, "kept@example.com", "hash-kept").await;

        let deleted = db.store::<User>().delete(&Select::by_id(gone.id)).await.unwrap();
        assert_eq!(deleted, 1);

        let keys = db.store::<ApiKey>().fetch_all(&Select::new()).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].user_id, kept.id);
    }

    #[tokio::test]
    async fn standalone_store_deletes_without_cascading() {
        let store = MemoryStore::<User>::new();
        let users = store
            .insert(&[Changes::new().with("email", "solo@example.com").with("role", "admin")])
            .await
            .unwrap();
        assert_eq!(store.delete(&Select::by_id(users[0].id)).await.unwrap(), 1);
        assert!(store.fetch_all(&Select::new()).await.unwrap().is_empty());
    }
}
