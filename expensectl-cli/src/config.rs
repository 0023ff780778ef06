use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use expensectl_core::ExpensesConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with default values
    Init(InitArgs),
    /// Print the effective config (file plus environment overrides)
    Show,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs, path: Option<&PathBuf>) -> Result<()> {
    let path = path.cloned().unwrap_or_else(ExpensesConfig::config_path);
    match args.command {
        ConfigCommands::Init(args) => run_init(args, &path),
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_init(args: InitArgs, path: &Path) -> Result<()> {
    if path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            path
        ));
    }

    ExpensesConfig::default()
        .save_to(path)
        .context(format!("Failed to write config file: {:?}", path))?;

    println!("Created config at: {:?}", path);
    println!("\nNext steps:");
    println!("  1. Set [database] url, or export DATABASE_URL");
    println!("  2. Run: expensectl migrate");
    println!("  3. Run: expensectl user add <username>");

    Ok(())
}

fn run_show(path: &Path) -> Result<()> {
    let config = if path.exists() {
        ExpensesConfig::load_from(path)?
    } else {
        let mut config = ExpensesConfig::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    };

    let toml_str = config.to_toml().context("Failed to serialize config to TOML")?;
    println!("{}", toml_str);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        run_init(InitArgs { force: false }, &path).unwrap();
        assert!(path.exists());
        assert!(run_init(InitArgs { force: false }, &path).is_err());
        run_init(InitArgs { force: true }, &path).unwrap();

        let config = ExpensesConfig::load_from(&path).unwrap();
        assert_eq!(config.expenses.page_size, 25);
    }
}
