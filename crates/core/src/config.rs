//! Application configuration.
//!
//! Values are layered: built-in defaults, then the optional TOML file under
//! the user's config directory, then `STEAMSCAPE_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under `~/.config` holding `config.toml`.
pub const CONFIG_DIR: &str = "steamscape";
/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "STEAMSCAPE";
/// Default Steam Web API host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.steampowered.com";
/// Default CDN prefix for game icons.
pub const DEFAULT_ICON_BASE_URL: &str =
    "https://media.steampowered.com/steamcommunity/public/images/apps";

const DEFAULT_CONFIG: &str = r#"# steamscape configuration
#
# Every key can also be set through the environment, for example
# STEAMSCAPE_STEAM_API_KEY or STEAMSCAPE_STEAM_ID.

# Steam Web API key (https://steamcommunity.com/dev/apikey).
# steam_api_key = ""

# SteamID64 or profile URL of the library owner.
# steam_id = ""

api_base_url = "https://api.steampowered.com"
request_timeout_secs = 15

# Fetch per-game achievements during sync (one request pair per game).
sync_achievements = false
achievement_sync_limit = 25

# Use the bundled sample library instead of Steam.
demo = false
"#;

/// Runtime configuration for the core services and frontends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Steam Web API key. Without it the app runs on demo data.
    pub steam_api_key: Option<String>,
    /// SteamID64 (or profile URL) of the library owner.
    pub steam_id: Option<String>,
    /// Base URL of the Steam Web API.
    pub api_base_url: String,
    /// Base URL used to build icon links.
    pub icon_base_url: String,
    /// Directory for the library store and exports.
    pub cache_root: PathBuf,
    /// Timeout applied to each Steam request.
    pub request_timeout_secs: u64,
    /// Whether sync enriches games with achievement data.
    pub sync_achievements: bool,
    /// Most-played games considered for achievement enrichment.
    pub achievement_sync_limit: usize,
    /// Force the bundled demo library.
    pub demo: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            steam_api_key: None,
            steam_id: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            icon_base_url: DEFAULT_ICON_BASE_URL.to_string(),
            cache_root: default_cache_root(),
            request_timeout_secs: 15,
            sync_achievements: false,
            achievement_sync_limit: 25,
            demo: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from an explicit file path plus the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_sources(path.as_ref(), true)
    }

    fn load_sources(path: &Path, with_env: bool) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(path).required(false));
        if with_env {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        }
        let settings = builder
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// True when no Steam credentials are usable and demo data should be shown.
    pub fn demo_mode(&self) -> bool {
        self.demo
            || self.api_key().is_none()
            || self.steam_id.as_deref().map_or(true, str::is_empty)
    }

    /// The configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.steam_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Directory for exported graph documents.
    pub fn export_dir(&self) -> PathBuf {
        self.cache_root.join("exports")
    }
}

/// Location of the user configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Default cache directory for the record store.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(CONFIG_DIR)
}

/// Write a commented default config file when none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_sources(&dir.path().join("absent.toml"), false)?;
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, 15);
        assert!(!config.sync_achievements);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
steam_api_key = "ABC123"
steam_id = "76561198000000001"
sync_achievements = true
achievement_sync_limit = 5
cache_root = "/tmp/steamscape-test"
"#,
        )?;

        let config = AppConfig::load_sources(&path, false)?;
        assert_eq!(config.api_key(), Some("ABC123"));
        assert_eq!(config.steam_id.as_deref(), Some("76561198000000001"));
        assert!(config.sync_achievements);
        assert_eq!(config.achievement_sync_limit, 5);
        assert_eq!(config.cache_root, PathBuf::from("/tmp/steamscape-test"));
        assert!(!config.demo_mode());
        Ok(())
    }

    #[test]
    fn default_file_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path)?;
        let first = fs::read_to_string(&path)?;
        write_default_config(&path)?;
        assert_eq!(first, fs::read_to_string(&path)?);

        let config = AppConfig::load_sources(&path, false)?;
        assert!(config.demo_mode());
        Ok(())
    }

    #[test]
    fn environment_overrides_the_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "achievement_sync_limit = 5\n")?;

        std::env::set_var("STEAMSCAPE_ACHIEVEMENT_SYNC_LIMIT", "7");
        let layered = AppConfig::load_from(&path);
        std::env::remove_var("STEAMSCAPE_ACHIEVEMENT_SYNC_LIMIT");

        assert_eq!(layered?.achievement_sync_limit, 7);
        assert_eq!(AppConfig::load_sources(&path, false)?.achievement_sync_limit, 5);
        Ok(())
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = AppConfig {
            steam_api_key: Some("   ".to_string()),
            steam_id: Some("76561198000000001".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.api_key(), None);
        assert!(config.demo_mode());
    }
}
