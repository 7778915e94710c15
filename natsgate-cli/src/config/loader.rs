use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use natsgate_server::GatewayConfig;

use super::types::RawConfig;

/// Env var that moves the project config directory (useful for isolated tests)
pub const CONFIG_DIR_ENV: &str = "NATSGATE_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration
    ///
    /// Layers, later wins: user config, project config, `explicit` (which
    /// must exist), then `overrides` from the command line.
    pub fn load(explicit: Option<&Path>, overrides: RawConfig) -> Result<GatewayConfig> {
        let mut raw = RawConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path() {
            raw = raw.merge(Self::read_optional(&user_path)?);
        }

        // Layer 2: Project config
        raw = raw.merge(Self::read_optional(&Self::project_config_path())?);

        // Layer 3: --config
        if let Some(path) = explicit {
            raw = raw.merge(Self::read(path)?);
        }

        // Layer 4: flags
        Ok(raw.merge(overrides).finalize())
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "natsgate").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    pub fn project_config_path() -> PathBuf {
        match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir).join("config.toml"),
            None => PathBuf::from(".natsgate/config.toml"),
        }
    }

    fn read_optional(path: &Path) -> Result<RawConfig> {
        if path.exists() {
            Self::read(path)
        } else {
            Ok(RawConfig::default())
        }
    }

    fn read(path: &Path) -> Result<RawConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config {}", path.display()))
    }
}
