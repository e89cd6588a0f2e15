mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use userbase_api::database::models::Role;
use userbase_api::services::{ServiceError, UserService};

use common::TestServer;

fn event(kind: &str, data: Value) -> Value {
    json!({ "type": kind, "object": "event", "data": data })
}

fn clerk_user(id: &str, email: &str) -> Value {
    json!({
        "id": id,
        "primary_email_address_id": "idn_primary",
        "email_addresses": [
            { "id": "idn_other", "email_address": "secondary@example.com" },
            { "id": "idn_primary", "email_address": email }
        ]
    })
}

async fn post(server: &TestServer, body: &Value) -> Result<(StatusCode, Value)> {
    let res = server
        .client
        .post(format!("{}/webhooks/clerk", server.base_url))
        .json(body)
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json::<Value>().await?))
}

#[tokio::test]
async fn user_lifecycle_events_are_mirrored() -> Result<()> {
    let server = TestServer::spawn().await?;
    let users = UserService::for_system(server.session());

    let (status, body) = post(&server, &event("user.created", clerk_user("user_1", "first@example.com"))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
    let created = users.get_by_clerk_id("user_1").await?;
    assert_eq!(created.email, "first@example.com");
    assert_eq!(created.role, Role::Standard);

    let (status, _) = post(&server, &event("user.updated", clerk_user("user_1", "second@example.com"))).await?;
    assert_eq!(status, StatusCode::OK);
    let updated = users.get_by_clerk_id("user_1").await?;
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.email, "second@example.com");

    let (status, _) = post(&server, &event("user.deleted", json!({ "id": "user_1", "deleted": true }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(matches!(users.get_by_clerk_id("user_1").await, Err(ServiceError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn unknown_events_are_acknowledged() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = post(&server, &event("session.created", json!({ "id": "sess_1" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
    Ok(())
}

#[tokio::test]
async fn payload_problems_answer_bad_request() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = post(&server, &event("user.created", json!({ "email_addresses": [] }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing clerk id");

    let (status, body) = post(&server, &event("user.created", json!({ "id": "user_2" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "email_addresses not found in the Clerk payload");

    server.create_user("taken@example.com", Role::Standard).await?;
    let (status, body) = post(&server, &event("user.created", clerk_user("user_3", "taken@example.com"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User with email taken@example.com already exists");

    let (status, _) = post(&server, &json!({ "data": {} })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn events_for_unknown_users_fail() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = post(&server, &event("user.deleted", json!({ "id": "user_missing" }))).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
    Ok(())
}
