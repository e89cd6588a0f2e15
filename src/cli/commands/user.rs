use anyhow::Context;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde_json::json;

use super::connect;
use crate::auth::ApiKeyHasher;
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::database::models::{Role, UserCreate};
use crate::database::{manager, schema, Session};
use crate::services::{ApiKeyService, BulkCreateService, CreateService, UserService};

/// Clerk id given to the seeded local user.
const LOCAL_CLERK_ID: &str = "local_user";

pub async fn generate(
    config: &AppConfig,
    email: Option<String>,
    role: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let email = email.unwrap_or_else(|| config.seed.default_user.clone());
    let role: Role = role
        .as_deref()
        .unwrap_or(&config.seed.default_user_role)
        .parse()
        .context("invalid role")?;

    let pool = manager::connect(&config.database).await?;
    schema::ensure_schema(&pool).await?;
    let session = Session::postgres(pool);

    let create = UserCreate { email: email.clone(), role, clerk_id: Some(LOCAL_CLERK_ID.to_string()) };
    let user = UserService::for_system(&session).create(&create).await?;

    let hasher = ApiKeyHasher::new(config.security.secret_key.as_bytes());
    let generated = ApiKeyService::for_system(&session, hasher).generate_api_key(&user).await?;

    output_success(
        &output_format,
        "User created",
        Some(json!({
            "email": user.email,
            "role": user.role,
            "api_key": generated.api_key,
        })),
    )
}

pub async fn populate(config: &AppConfig, count: usize, output_format: OutputFormat) -> anyhow::Result<()> {
    let users: Vec<UserCreate> = (0..count)
        .map(|_| UserCreate::new(random_email(), Role::Standard))
        .collect();

    let session = connect(config).await?;
    let created = UserService::for_system(&session).bulk_create(&users).await?;

    output_success(
        &output_format,
        &format!("Created {} users", created.len()),
        Some(json!({ "count": created.len() })),
    )
}

fn random_email() -> String {
    let local: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("{}@example.com", local.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_emails_are_distinct_and_well_formed() {
        let a = random_email();
        let b = random_email();
        assert_ne!(a, b);
        assert!(a.ends_with("@example.com"));
        assert_eq!(a.split('@').next().map(str::len), Some(12));
    }
}
