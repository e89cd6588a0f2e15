use anyhow::Result;

use userbase_api::config::DatabaseConfig;
use userbase_api::database::models::{Role, UserCreate, UserPatch};
use userbase_api::database::{manager, schema, Session};
use userbase_api::filter::FilterParams;
use userbase_api::services::{
    CreateService, DeleteService, ListService, ReadService, ServiceError, UpdateService, UserService,
};

/// Postgres session, or None when no database is configured for this run.
async fn postgres() -> Result<Option<Session>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres-backed test");
        return Ok(None);
    };
    let pool = manager::connect(&DatabaseConfig { url, max_connections: 2, connection_timeout: 10 }).await?;
    schema::ensure_schema(&pool).await?;
    Ok(Some(Session::postgres(pool)))
}

fn unique_email(label: &str) -> String {
    format!("{}-{}@example.com", label, uuid::Uuid::new_v4().simple())
}

#[tokio::test]
async fn user_crud_round_trip() -> Result<()> {
    let Some(session) = postgres().await? else { return Ok(()) };
    let users = UserService::for_system(&session);

    let email = unique_email("pg-crud");
    let created = users.create(&UserCreate::new(&email, Role::Standard)).await?;
    assert_eq!(created.created_by.as_deref(), Some("system"));

    let read = users.get_by_id(created.id).await?;
    assert_eq!(read, created);

    let unchanged = users.update(created.id, &UserPatch::default()).await?;
    assert_eq!(unchanged.role, Role::Standard);
    assert_eq!(unchanged.updated_at, created.updated_at);

    let promoted = users.update(created.id, &UserPatch { role: Some(Role::Admin) }).await?;
    assert_eq!(promoted.role, Role::Admin);

    let filters = FilterParams { search: Some(email.to_uppercase()), ..FilterParams::default() };
    let page = users.get_paginated(&filters).await?;
    assert_eq!(page.count, 1);
    assert_eq!(page.data[0].id, created.id);

    assert!(users.delete(created.id).await?);
    assert!(matches!(users.get_by_id(created.id).await, Err(ServiceError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_constraint_violation() -> Result<()> {
    let Some(session) = postgres().await? else { return Ok(()) };
    let users = UserService::for_system(&session);

    let email = unique_email("pg-dup");
    let first = users.create(&UserCreate::new(&email, Role::Standard)).await?;
    let err = users.create(&UserCreate::new(&email, Role::Admin)).await.unwrap_err();
    assert!(err.is_constraint_violation(), "expected constraint violation, got {:?}", err);

    users.delete(first.id).await?;
    Ok(())
}
