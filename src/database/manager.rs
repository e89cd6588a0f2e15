use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Store-level errors. Repositories surface these unchanged.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness, foreign-key, not-null or check violation.
    #[error("Integrity constraint violation: {0}")]
    Constraint(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl DatabaseError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DatabaseError::Constraint(_))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // SQLSTATE class 23: integrity constraint violation
            sqlx::Error::Database(db) if db.code().is_some_and(|c| c.starts_with("23")) => {
                DatabaseError::Constraint(db.message().to_string())
            }
            other => DatabaseError::Sqlx(other),
        }
    }
}

/// Opens the Postgres pool described by the configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    if config.url.is_empty() {
        return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
    }
    let url = url::Url::parse(&config.url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .connect(url.as_str())
        .await?;

    info!(
        "Connected database pool: {}{}",
        url.host_str().unwrap_or("localhost"),
        url.path()
    );
    Ok(pool)
}

/// Pings the pool to ensure connectivity.
pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
