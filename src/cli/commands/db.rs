use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::database::{manager, schema};

pub async fn init(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = manager::connect(&config.database).await?;
    schema::ensure_schema(&pool).await?;
    output_success(&output_format, "Database schema is up to date", None)
}
