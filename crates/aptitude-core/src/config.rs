//! Engine configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scoring::CategoryGroups;

/// Environment variable that overrides `data_dir`.
pub const DATA_DIR_ENV: &str = "APTITUDE_DATA_DIR";

/// Top-level aptitude configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AptitudeConfig {
    /// Directory holding the JSON collections.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Fixed RNG seed for reproducible draws. Unset means seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// How categories roll up into reported score groups.
    #[serde(default)]
    pub category_groups: CategoryGroups,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./aptitude-data")
}

impl Default for AptitudeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            seed: None,
            category_groups: CategoryGroups::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `aptitude.toml` in the current directory
/// 2. `~/.config/aptitude/config.toml`
///
/// `APTITUDE_DATA_DIR` overrides the configured data directory.
pub fn load_config() -> Result<AptitudeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AptitudeConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("aptitude.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => AptitudeConfig::default(),
    };

    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            config.data_dir = PathBuf::from(dir);
        }
    }

    Ok(config)
}

/// Parse a config document and expand `${VAR}` references in `data_dir`.
pub fn parse_config(content: &str) -> Result<AptitudeConfig> {
    let mut config: AptitudeConfig = toml::from_str(content)?;
    let raw = config.data_dir.to_string_lossy().into_owned();
    if raw.contains("${") {
        config.data_dir = PathBuf::from(resolve_env_vars(&raw));
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("aptitude"))
}
