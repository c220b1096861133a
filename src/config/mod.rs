mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./fairway.toml",
        "~/.config/fairway/config.toml",
        "/etc/fairway/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.jobs.workers == 0 {
        anyhow::bail!("jobs.workers must be at least 1");
    }

    if config.jobs.queue_capacity == 0 {
        anyhow::bail!("jobs.queue_capacity must be at least 1");
    }

    if config.generation.max_attempts == 0 {
        anyhow::bail!("generation.max_attempts must be at least 1");
    }

    if config.uploads.max_bytes == 0 {
        anyhow::bail!("uploads.max_bytes cannot be 0");
    }

    if let Some(ref dir) = config.server.static_dir {
        if !dir.exists() {
            tracing::warn!("Static directory does not exist: {:?}", dir);
        }
    }

    if config.generation.resolved_api_key().is_none() {
        tracing::warn!("No generation API key configured; stylization jobs will fail");
    }

    Ok(())
}
