//! API key management
//!
//! Keys are shown once, at creation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use expensectl_core::ExpensesConfig;
use expensectl_server::db::{ApiKeyRepo, UserRepo};
use expensectl_server::models::ApiKeyName;

#[derive(Parser, Debug)]
pub struct ApiKeyArgs {
    #[command(subcommand)]
    pub command: ApiKeyCommands,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ApiKeyCommands {
    /// Create a key for a user and print it
    Create {
        username: String,
        /// Label for the key, e.g. the device using it
        name: String,
    },
    /// List a user's keys (without the secrets)
    List { username: String },
    /// Revoke a key by id
    Revoke { id: i64 },
}

pub async fn run_apikey(args: ApiKeyArgs, config: &ExpensesConfig) -> Result<()> {
    let pool = super::connect(args.database_url, config).await?;
    let keys = ApiKeyRepo::new(&pool);
    let users = UserRepo::new(&pool);

    match args.command {
        ApiKeyCommands::Create { username, name } => {
            let user = users.get_by_username(&username).await?;
            let name = ApiKeyName::new(&name).context("Invalid key name")?;
            let key = keys.create(user.id, &name).await?;
            println!("Created API key {} for {}:", key.id, user.username);
            println!("{}", key.key);
            eprintln!("Store it now; it will not be shown again.");
        }
        ApiKeyCommands::List { username } => {
            let user = users.get_by_username(&username).await?;
            for key in keys.list_for_user(user.id).await? {
                println!("{:>6}  {:<40} {}", key.id, key.name, key.date_added.format("%Y-%m-%d %H:%M"));
            }
        }
        ApiKeyCommands::Revoke { id } => {
            keys.revoke(id).await?;
            println!("Revoked API key {id}");
        }
    }
    Ok(())
}
