// Configuration management module
// TOML settings on disk plus the provider credential taken from the environment

pub mod settings;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub use settings::{ApiKey, Config, ConfigError, OpenAiConfig, ServerConfig, StorageConfig};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}

/// Print the effective configuration to stderr
#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.openai.base_url).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!("  Timeout: {}s", style(config.openai.timeout_seconds).cyan());
    match config.openai.api_key {
        Some(_) => eprintln!("  API Key: {}", style("set").green()),
        None => eprintln!("  API Key: {}", style("missing").red()),
    }

    eprintln!();
    eprintln!("{}", style("Server Settings:").bold().yellow());
    eprintln!("  Listen: {}", style(config.server.address()).cyan());

    eprintln!();
    eprintln!("{}", style("Storage Settings:").bold().yellow());
    eprintln!(
        "  Embeddings: {}",
        style(config.embeddings_path().display()).cyan()
    );
    eprintln!("  Log file: {}", style(config.log_path().display()).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Write the default configuration unless a file already exists
#[inline]
pub fn init_config(config_dir: &Path) -> Result<()> {
    let config = Config::with_base_dir(config_dir);
    let config_path = config.config_file_path();

    if config_path.exists() {
        eprintln!(
            "{} {}",
            style("Configuration already exists:").yellow(),
            config_path.display()
        );
        return Ok(());
    }

    config
        .save()
        .context("Failed to write default configuration")?;
    eprintln!(
        "{} {}",
        style("Wrote default configuration to").green(),
        config_path.display()
    );
    Ok(())
}
