use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::SwitchyardConfig;

/// Prefix of environment variables overriding file values,
/// e.g. `SWITCHYARD__TRANSPORT__FOLLOW_REDIRECTS=true`.
pub const ENV_PREFIX: &str = "SWITCHYARD";

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML
pub async fn load_config(config_path: &str) -> Result<SwitchyardConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<SwitchyardConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        _ => FileFormat::Yaml,
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let config: SwitchyardConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    tracing::debug!(
        path = %config_path.display(),
        rules = config.rules.len(),
        "Configuration loaded"
    );
    Ok(config)
}
