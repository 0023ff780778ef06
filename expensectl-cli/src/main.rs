//! expensectl CLI - personal expense tracker server and administration
//!
//! - `serve` runs the HTTP API
//! - `migrate` creates or updates the database schema
//! - `user` and `apikey` manage accounts and their API keys
//! - `config` manages ~/.expensectl/config.toml

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use expensectl_core::ExpensesConfig;

mod commands;
mod config;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "expensectl",
    author,
    version,
    about = "Personal expense tracker: expenses, bills, templates, reports and sync",
    long_about = "Run the expensectl HTTP API and manage its users, API keys and database schema."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (requires the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    /// Config file (default: ~/.expensectl/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Create or update the database schema
    Migrate(commands::migrate::MigrateArgs),
    /// Manage users (add, list)
    User(commands::user::UserArgs),
    /// Manage API keys (create, list, revoke)
    Apikey(commands::apikey::ApiKeyArgs),
    /// Manage expensectl configuration (init, show, path)
    Config(config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Load `--config PATH` or the default config file.
fn load_config(path: Option<&PathBuf>) -> Result<ExpensesConfig> {
    match path {
        Some(path) => ExpensesConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => ExpensesConfig::load_or_default().context("Failed to load config"),
    }
}

fn load_env_files() {
    dotenvy::dotenv().ok();
    if let Some(home) = dirs::home_dir() {
        dotenvy::from_path(home.join(".expensectl").join(".env")).ok();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_files();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let result = match cli.command {
        Commands::Completions(args) => run_completions(args),
        Commands::Config(args) => config::run_config(args, cli.config.as_ref()),
        command => {
            let config = load_config(cli.config.as_ref())?;
            match command {
                Commands::Serve(args) => commands::run_serve(args, &config).await,
                Commands::Migrate(args) => commands::run_migrate(args, &config).await,
                Commands::User(args) => commands::run_user(args, &config).await,
                Commands::Apikey(args) => commands::run_apikey(args, &config).await,
                Commands::Completions(_) | Commands::Config(_) => Ok(()),
            }
        }
    };

    tracing_setup::shutdown_otel();
    result
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["expensectl", "user", "list", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::User(_)));
    }
}
