//! Command implementations

pub mod apikey;
pub mod migrate;
pub mod serve;
pub mod user;

use anyhow::{Context, Result};
use expensectl_core::ExpensesConfig;
use expensectl_server::db::{create_pool_with_options, migrations};
use sqlx::PgPool;

pub use apikey::run_apikey;
pub use migrate::run_migrate;
pub use serve::run_serve;
pub use user::run_user;

/// Database URL from the flag, else the config (which already carries
/// `DATABASE_URL`).
pub(crate) fn database_url(flag: Option<String>, config: &ExpensesConfig) -> Result<String> {
    flag.or_else(|| config.database.url.clone())
        .filter(|url| !url.is_empty())
        .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or ~/.expensectl/config.toml")
}

/// Connect and bring the schema up to date.
pub(crate) async fn connect(flag: Option<String>, config: &ExpensesConfig) -> Result<PgPool> {
    let url = database_url(flag, config)?;
    let pool = create_pool_with_options(&url, config.database.max_connections)
        .await
        .context("Failed to create database pool")?;
    migrations::run(&pool).await.context("Failed to run migrations")?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_config() {
        let mut config = ExpensesConfig::default();
        config.database.url = Some("postgres://from-config/db".into());
        let url = database_url(Some("postgres://from-flag/db".into()), &config).unwrap();
        assert_eq!(url, "postgres://from-flag/db");
        assert_eq!(database_url(None, &config).unwrap(), "postgres://from-config/db");
    }

    #[test]
    fn missing_url_is_an_error() {
        let err = database_url(None, &ExpensesConfig::default()).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL not set"));
    }
}
