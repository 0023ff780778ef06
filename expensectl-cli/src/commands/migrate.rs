//! Schema migration command

use anyhow::Result;
use clap::Parser;
use expensectl_core::ExpensesConfig;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config: &ExpensesConfig) -> Result<()> {
    let pool = super::connect(args.database_url, config).await?;
    pool.close().await;
    println!("Database schema is up to date");
    Ok(())
}
