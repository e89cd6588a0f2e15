pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "userbase")]
#[command(about = "Userbase CLI - Server and database administration for the user management API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve,

    #[command(name = "init-db", about = "Create the users and api_keys tables if missing")]
    InitDb,

    #[command(name = "generate-user", about = "Create the default user and print a fresh API key")]
    GenerateUser {
        #[arg(long, help = "Email address (defaults to DEFAULT_USER)")]
        email: Option<String>,
        #[arg(long, help = "Role: standard or admin (defaults to DEFAULT_USER_ROLE)")]
        role: Option<String>,
    },

    #[command(about = "Insert random standard users")]
    Populate {
        #[arg(long, default_value_t = 10, help = "Number of users to create")]
        count: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env();
    config.validate()?;

    match cli.command {
        Commands::Serve => commands::serve::handle(config).await,
        Commands::InitDb => commands::db::init(&config, output_format).await,
        Commands::GenerateUser { email, role } => {
            commands::user::generate(&config, email, role, output_format).await
        }
        Commands::Populate { count } => commands::user::populate(&config, count, output_format).await,
    }
}
