//! Runtime configuration.
//!
//! Handles loading, validating and merging `illustra.toml`. User values are
//! layered over stock defaults, so a config file only needs the keys it
//! changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [remote]
//! # base_url = "https://assets.example.com"  # no default; remote images disabled without it
//! density = "xxhdpi"        # Screen density suffix of remote asset names
//! probe_timeout_ms = 5000   # Existence probe timeout; a timeout means "missing"
//!
//! [store]
//! dir = ".illustra/images"                    # User photo directory
//! wallpaper_file = ".illustra/wallpapers.json" # Default wallpaper assignments
//!
//! [workers]
//! max_workers = 4           # Resolution workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `illustra.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IllustraConfig {
    /// Asset server settings.
    pub remote: RemoteConfig,
    /// Local storage locations.
    pub store: StoreConfig,
    /// Resolution worker pool.
    pub workers: WorkersConfig,
}

impl IllustraConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.remote.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "remote.base_url must start with http:// or https://, got '{url}'"
            )));
        }
        if self.remote.density.trim().is_empty() {
            return Err(ConfigError::Validation(
                "remote.density must not be empty".into(),
            ));
        }
        if self.remote.probe_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "remote.probe_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.store.dir.trim().is_empty() {
            return Err(ConfigError::Validation("store.dir must not be empty".into()));
        }
        if self.workers.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "workers.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Asset server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL of the asset server. Absent means remote images are unavailable
    /// and resolution falls back to local or embedded images.
    pub base_url: Option<String>,
    /// Density suffix, as in `type_large-and-xxhdpi.png`.
    pub density: String,
    /// Existence probe timeout in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            density: "xxhdpi".to_string(),
            probe_timeout_ms: 5000,
        }
    }
}

impl RemoteConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Local storage locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub dir: String,
    pub wallpaper_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: ".illustra/images".to_string(),
            wallpaper_file: ".illustra/wallpapers.json".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }

    pub fn wallpaper_path(&self) -> PathBuf {
        PathBuf::from(&self.wallpaper_file)
    }
}

/// Resolution worker pool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkersConfig {
    /// Maximum number of resolution workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &WorkersConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(IllustraConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load config from `path`.
///
/// A missing file yields the stock defaults. Otherwise user values are merged
/// over the defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(path: &Path) -> Result<IllustraConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = if path.exists() {
        let content = fs::read_to_string(path)?;
        let overlay: toml::Value = toml::from_str(&content)?;
        merge_toml(base, overlay)
    } else {
        base
    };
    let config: IllustraConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `illustra.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Illustra Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Asset server
# ---------------------------------------------------------------------------
[remote]
# Base URL of the asset server. Remote images are addressed as
#   {base_url}/o/{segment}/{id}[/{sub_id}]/{variant}-and-{density}.png
# Without it, product, device type, pairing, brand and scene action images
# are unavailable and requests fall back to their placeholders.
# base_url = "https://assets.example.com"

# Screen density suffix of remote asset names.
density = "xxhdpi"

# Timeout in milliseconds for the one-time existence check of a product
# image. A timeout counts as "does not exist" and is never retried.
probe_timeout_ms = 5000

# ---------------------------------------------------------------------------
# Local storage
# ---------------------------------------------------------------------------
[store]
# Directory holding user photos, named {category}-{place}-{id}.png.
dir = ".illustra/images"

# Persisted default wallpaper per place.
wallpaper_file = ".illustra/wallpapers.json"

# ---------------------------------------------------------------------------
# Workers
# ---------------------------------------------------------------------------
[workers]
# Maximum number of resolution workers.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_workers = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = IllustraConfig::default();
        assert_eq!(config.remote.base_url, None);
        assert_eq!(config.remote.density, "xxhdpi");
        assert_eq!(config.remote.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.store.dir, ".illustra/images");
        assert_eq!(config.workers.max_workers, None);
        config.validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let config: IllustraConfig = toml::from_str(
            r#"
[remote]
base_url = "https://cdn.test"
"#,
        )
        .unwrap();
        assert_eq!(config.remote.base_url.as_deref(), Some("https://cdn.test"));
        // Default values preserved
        assert_eq!(config.remote.density, "xxhdpi");
        assert_eq!(config.store.wallpaper_file, ".illustra/wallpapers.json");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<IllustraConfig, _> = toml::from_str(
            r#"
[remote]
base_uri = "https://cdn.test"
"#,
        );
        assert!(result.is_err());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("illustra.toml")).unwrap();
        assert_eq!(config.remote.density, "xxhdpi");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("illustra.toml");
        fs::write(
            &path,
            r#"
[remote]
base_url = "https://cdn.test"
density = "mdpi"

[workers]
max_workers = 2
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.remote.base_url.as_deref(), Some("https://cdn.test"));
        assert_eq!(config.remote.density, "mdpi");
        assert_eq!(config.workers.max_workers, Some(2));
        // Unspecified values should be defaults
        assert_eq!(config.remote.probe_timeout_ms, 5000);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("illustra.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("illustra.toml");
        fs::write(&path, "[remote]\nprobe_timeout_ms = 0\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn base_url_must_be_http() {
        let mut config = IllustraConfig::default();
        config.remote.base_url = Some("ftp://cdn.test".into());
        assert!(config.validate().is_err());
        config.remote.base_url = Some("http://cdn.test".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_density_is_rejected() {
        let mut config = IllustraConfig::default();
        config.remote.density = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut config = IllustraConfig::default();
        config.workers.max_workers = Some(0);
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_overrides_leaves_and_keeps_siblings() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("[store]\ndir = \"/data/photos\"\n").unwrap();
        let merged: IllustraConfig = merge_toml(base, overlay).try_into().unwrap();

        assert_eq!(merged.store.dir, "/data/photos");
        assert_eq!(merged.store.wallpaper_file, ".illustra/wallpapers.json");
        assert_eq!(merged.remote.density, "xxhdpi");
    }

    // =========================================================================
    // effective_workers
    // =========================================================================

    #[test]
    fn effective_workers_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(&WorkersConfig { max_workers: None }), cores);
    }

    #[test]
    fn effective_workers_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = WorkersConfig {
            max_workers: Some(cores + 8),
        };
        assert_eq!(effective_workers(&config), cores);
        assert_eq!(effective_workers(&WorkersConfig { max_workers: Some(1) }), 1);
    }

    // =========================================================================
    // stock_config_toml
    // =========================================================================

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: IllustraConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.remote.density, "xxhdpi");
        assert_eq!(config.remote.probe_timeout_ms, 5000);
        assert_eq!(config.store.dir, ".illustra/images");
        assert_eq!(config.workers.max_workers, None);
    }
}
