mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Parse and validate TOML configuration text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;
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
        "./fileserve.toml",
        "~/.config/fileserve/config.toml",
        "/etc/fileserve/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.encoding.crf > 51 {
        anyhow::bail!("Encoding crf must be between 0 and 51, got {}", config.encoding.crf);
    }

    if config.encoding.max_width == 0 {
        anyhow::bail!("Encoding max_width must be greater than 0");
    }

    if config.encoding.hls_segment_seconds == 0 {
        anyhow::bail!("Encoding hls_segment_seconds must be greater than 0");
    }

    if config.encoding.preset.trim().is_empty() {
        anyhow::bail!("Encoding preset cannot be empty");
    }

    if !config.delivery.internal_prefix.starts_with('/') {
        anyhow::bail!(
            "Delivery internal_prefix must start with '/', got {:?}",
            config.delivery.internal_prefix
        );
    }

    if !config.delivery.internal_root.is_absolute() {
        anyhow::bail!(
            "Delivery internal_root must be an absolute path, got {:?}",
            config.delivery.internal_root
        );
    }

    if let Some(ref dir) = config.server.static_dir {
        if !dir.exists() {
            tracing::warn!("Static directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}
