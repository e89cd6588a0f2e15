mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

use userbase_api::database::models::Role;

use common::TestServer;

async fn admin_server() -> Result<(TestServer, String)> {
    let server = TestServer::spawn().await?;
    let admin = server.create_user("admin@example.com", Role::Admin).await?;
    let key = server.api_key_for(&admin).await?;
    Ok((server, key))
}

async fn list(server: &TestServer, key: &str, query: &str) -> Result<(StatusCode, Value)> {
    let res = server
        .client
        .get(format!("{}?{}", server.url("/users"), query))
        .header("X-API-Key", key)
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json::<Value>().await?))
}

fn emails(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["email"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn limit_and_offset_are_bounded() -> Result<()> {
    let (server, key) = admin_server().await?;

    for query in ["limit=0", "limit=101", "limit=abc", "offset=-1"] {
        let (status, body) = list(&server, &key, query).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} should be rejected: {}", query, body);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    let (status, _) = list(&server, &key, "limit=100&offset=0").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn order_by_must_be_an_allowed_field() -> Result<()> {
    let (server, key) = admin_server().await?;

    let (status, body) = list(&server, &key, "order_by=clerk_id").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("clerk_id"), "{}", body);

    server.create_user("zed@example.com", Role::Standard).await?;
    let (status, body) = list(&server, &key, "order_by=-email").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(emails(&body), ["zed@example.com", "admin@example.com"]);
    Ok(())
}

#[tokio::test]
async fn unknown_parameters_are_rejected() -> Result<()> {
    let (server, key) = admin_server().await?;

    let (status, body) = list(&server, &key, "colour=blue").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unknown query parameter: colour");
    Ok(())
}

#[tokio::test]
async fn search_matches_email_case_insensitively() -> Result<()> {
    let (server, key) = admin_server().await?;
    server.create_user("Carol.Jones@example.com", Role::Standard).await?;
    server.create_user("dave@example.com", Role::Standard).await?;

    let (status, body) = list(&server, &key, "search=JONES").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(emails(&body), ["Carol.Jones@example.com"]);
    Ok(())
}

#[tokio::test]
async fn id_filter_accepts_repeated_and_comma_separated_values() -> Result<()> {
    let (server, key) = admin_server().await?;
    let a = server.create_user("a@example.com", Role::Standard).await?;
    let b = server.create_user("b@example.com", Role::Standard).await?;
    let c = server.create_user("c@example.com", Role::Standard).await?;

    let query = format!("id__in={}&id__in={}&order_by=email", a.id, b.id);
    let (status, body) = list(&server, &key, &query).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(emails(&body), ["a@example.com", "b@example.com"]);

    let query = format!("id__in={},{}&order_by=email", b.id, c.id);
    let (_, body) = list(&server, &key, &query).await?;
    assert_eq!(body["count"], 2);
    assert_eq!(emails(&body), ["b@example.com", "c@example.com"]);

    let (status, _) = list(&server, &key, "id__in=not-a-uuid").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
