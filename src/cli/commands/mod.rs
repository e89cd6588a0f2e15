pub mod db;
pub mod serve;
pub mod user;

use crate::config::AppConfig;
use crate::database::{manager, Session};

/// Postgres session for one-shot commands.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<Session> {
    let pool = manager::connect(&config.database).await?;
    Ok(Session::postgres(pool))
}
