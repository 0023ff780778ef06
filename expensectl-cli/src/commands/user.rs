//! User management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use expensectl_core::ExpensesConfig;
use expensectl_server::db::UserRepo;
use expensectl_server::models::Username;

#[derive(Parser, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user
    Add {
        /// Login name (letters, digits and @/./+/-/_)
        username: String,
        /// Name shown to sync clients
        #[arg(long, default_value = "")]
        full_name: String,
    },
    /// List users
    List,
}

pub async fn run_user(args: UserArgs, config: &ExpensesConfig) -> Result<()> {
    let pool = super::connect(args.database_url, config).await?;
    let repo = UserRepo::new(&pool);

    match args.command {
        UserCommands::Add { username, full_name } => {
            let username = Username::new(&username).context("Invalid username")?;
            let user = repo.create(&username, &full_name).await?;
            println!("Created user {} (id {})", user.username, user.id);
        }
        UserCommands::List => {
            let users = repo.list().await?;
            if users.is_empty() {
                println!("No users yet. Create one with: expensectl user add <username>");
            }
            for user in users {
                println!(
                    "{:>6}  {:<24} {:<24} {}",
                    user.id,
                    user.username,
                    user.full_name,
                    user.date_added.format("%Y-%m-%d")
                );
            }
        }
    }
    Ok(())
}
