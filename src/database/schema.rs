use sqlx::PgPool;
use tracing::info;

use super::manager::DatabaseError;

/// Table definitions, applied in order. Every statement is idempotent.
pub const STATEMENTS: &[&str] = &[
    r#"CREATE EXTENSION IF NOT EXISTS "pgcrypto""#,
    r#"CREATE TABLE IF NOT EXISTS "users" (
        "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        "email" TEXT NOT NULL,
        "role" TEXT NOT NULL DEFAULT 'standard' CHECK ("role" IN ('standard', 'admin')),
        "clerk_id" TEXT,
        "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
        "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
        "created_by" TEXT,
        "updated_by" TEXT
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "ix_users_email" ON "users" ("email")"#,
    r#"CREATE INDEX IF NOT EXISTS "ix_users_clerk_id" ON "users" ("clerk_id")"#,
    r#"CREATE TABLE IF NOT EXISTS "api_keys" (
        "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        "key_hash" TEXT NOT NULL UNIQUE,
        "user_id" UUID NOT NULL UNIQUE REFERENCES "users" ("id") ON DELETE CASCADE,
        "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
        "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];

/// Creates any missing tables and indexes.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema is up to date ({} statements)", STATEMENTS.len());
    Ok(())
}
