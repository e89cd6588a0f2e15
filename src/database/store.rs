use async_trait::async_trait;
use sqlx::{postgres::PgArguments, query::QueryAs, query::QueryScalar, PgPool, Postgres};
use std::marker::PhantomData;
use tracing::debug;
use uuid::Uuid;

use super::entity::Entity;
use super::manager::DatabaseError;
use super::query::Select;
use super::sql::{self, SqlResult};
use super::value::{Changes, FieldValue};

macro_rules! bind_value {
    ($query:expr, $value:expr) => {
        match $value {
            FieldValue::Null => $query,
            FieldValue::Bool(v) => $query.bind(*v),
            FieldValue::Int(v) => $query.bind(*v),
            FieldValue::Text(v) => $query.bind(v.clone()),
            FieldValue::Uuid(v) => $query.bind(*v),
            FieldValue::Timestamp(v) => $query.bind(*v),
        }
    };
}

/// Query-executing backend for one entity type.
///
/// Every write runs in its own transaction: it either commits as a whole or rolls back.
#[async_trait]
pub trait Store<E: Entity>: Send + Sync {
    async fn fetch_all(&self, select: &Select) -> Result<Vec<E>, DatabaseError>;

    async fn fetch_optional(&self, select: &Select) -> Result<Option<E>, DatabaseError> {
        let mut limited = select.clone();
        limited.limit = Some(1);
        Ok(self.fetch_all(&limited).await?.into_iter().next())
    }

    /// Number of rows matching the predicates, ignoring ordering and paging.
    async fn count(&self, select: &Select) -> Result<i64, DatabaseError>;

    async fn fetch_ids(&self, select: &Select) -> Result<Vec<Uuid>, DatabaseError>;

    /// Inserts all rows in one statement and returns them with server-assigned fields.
    async fn insert(&self, rows: &[Changes]) -> Result<Vec<E>, DatabaseError>;

    /// Applies `changes` to every listed row and returns the refreshed rows.
    /// Empty changes write nothing and only re-read.
    async fn update(&self, ids: &[Uuid], changes: &Changes) -> Result<Vec<E>, DatabaseError>;

    /// Deletes every row matching the predicates and returns the affected count.
    async fn delete(&self, select: &Select) -> Result<u64, DatabaseError>;
}

/// Postgres-backed store.
pub struct PgStore<E> {
    pool: PgPool,
    _phantom: PhantomData<fn() -> E>,
}

impl<E> PgStore<E> {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, _phantom: PhantomData }
    }
}

#[async_trait]
impl<E: Entity> Store<E> for PgStore<E> {
    async fn fetch_all(&self, select: &Select) -> Result<Vec<E>, DatabaseError> {
        let statement = sql::select(E::TABLE, select);
        debug!(query = %statement.query, "fetch_all");
        let rows = bind_query_as::<E>(&statement).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn fetch_optional(&self, select: &Select) -> Result<Option<E>, DatabaseError> {
        let statement = sql::select(E::TABLE, select);
        let row = bind_query_as::<E>(&statement).fetch_optional(&self.pool).await?;
        Ok(row)
    }

    async fn count(&self, select: &Select) -> Result<i64, DatabaseError> {
        let statement = sql::count(E::TABLE, select);
        debug!(query = %statement.query, "count");
        let count = bind_query_scalar::<i64>(&statement).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn fetch_ids(&self, select: &Select) -> Result<Vec<Uuid>, DatabaseError> {
        let statement = sql::ids(E::TABLE, select);
        let ids = bind_query_scalar::<Uuid>(&statement).fetch_all(&self.pool).await?;
        Ok(ids)
    }

    async fn insert(&self, rows: &[Changes]) -> Result<Vec<E>, DatabaseError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let statement = sql::insert(E::TABLE, rows);
        let mut tx = self.pool.begin().await?;
        let created = bind_query_as::<E>(&statement).fetch_all(&mut *tx).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, ids: &[Uuid], changes: &Changes) -> Result<Vec<E>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        if changes.is_empty() {
            return self.fetch_all(&Select::by_ids(ids)).await;
        }
        let statement = sql::update(E::TABLE, ids, changes, E::has_column("updated_at"));
        let mut tx = self.pool.begin().await?;
        let updated = bind_query_as::<E>(&statement).fetch_all(&mut *tx).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, select: &Select) -> Result<u64, DatabaseError> {
        let statement = sql::delete(E::TABLE, select);
        let mut tx = self.pool.begin().await?;
        let mut query = sqlx::query(&statement.query);
        for param in &statement.params {
            query = bind_value!(query, param);
        }
        let result = query.execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

fn bind_query_as<E: Entity>(statement: &SqlResult) -> QueryAs<'_, Postgres, E, PgArguments> {
    let mut query = sqlx::query_as::<_, E>(&statement.query);
    for param in &statement.params {
        query = bind_value!(query, param);
    }
    query
}

fn bind_query_scalar<O>(statement: &SqlResult) -> QueryScalar<'_, Postgres, O, PgArguments>
where
    (O,): for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
{
    let mut query = sqlx::query_scalar::<_, O>(&statement.query);
    for param in &statement.params {
        query = bind_value!(query, param);
    }
    query
}
