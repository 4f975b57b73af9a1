mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Bitrates outside this range (kbps) are passed through with a warning.
const USUAL_BITRATES: std::ops::RangeInclusive<u32> = 8..=640;

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
        "./tunesmith.toml",
        "~/.config/tunesmith/config.toml",
        "/etc/tunesmith/config.toml",
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

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.conversion.max_concurrent == 0 {
        anyhow::bail!("conversion.max_concurrent cannot be 0");
    }

    if !USUAL_BITRATES.contains(&config.conversion.bitrate) {
        tracing::warn!(
            "Bitrate {} kbps is outside the usual {}..={} range; passing it to the encoder as is",
            config.conversion.bitrate,
            USUAL_BITRATES.start(),
            USUAL_BITRATES.end()
        );
    }

    if config.tools.timeout_secs == 0 {
        anyhow::bail!("tools.timeout_secs cannot be 0");
    }

    if let Some(ref path) = config.tools.ffmpeg_path {
        if !path.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", path);
        }
    }

    let name = config.output.archive_name.trim();
    if name.is_empty() {
        anyhow::bail!("output.archive_name cannot be empty");
    }
    if !name.to_lowercase().ends_with(".zip") {
        anyhow::bail!("output.archive_name must end in .zip: {}", name);
    }
    if name.contains('/') || name.contains('\\') {
        anyhow::bail!("output.archive_name must be a file name, not a path: {}", name);
    }

    Ok(())
}
