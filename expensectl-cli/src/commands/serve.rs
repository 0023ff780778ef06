//! HTTP server command

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use expensectl_core::ExpensesConfig;
use expensectl_server::http::{run_server, AppSettings, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default from config: 127.0.0.1:3030)
    #[arg(long, short = 'b', env = "EXPENSECTL_BIND")]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, config: &ExpensesConfig) -> Result<()> {
    let mut server = ServerConfig::from_config(config).context("Invalid [server] config")?;
    if let Some(bind) = args.bind {
        server.bind_addr = bind;
    }
    server.cors_permissive |= args.cors_permissive;

    tracing::info!("Starting expensectl server on {}", server.bind_addr);

    let pool = super::connect(args.database_url, config).await?;

    // blocks until shutdown
    run_server(pool, server, AppSettings::from(config))
        .await
        .context("Server error")?;

    Ok(())
}
