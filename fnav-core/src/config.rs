//! src/config.rs
//! ============================================================================
//! # Config: Navigator Configuration Loader and Saver
//!
//! Loads and saves settings as TOML from the platform config directory using
//! the [`directories`](https://docs.rs/directories) crate. Sort, search and
//! scroll options are handed to the model explicitly; nothing here is global.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! let nav = Navigator::new(config.nav.clone(), height, store, transfer)?;
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use tokio::fs as TokioFs;

use crate::{error::AppError, logging::LoggerConfig};

/// Key used to order a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Case-insensitive, numbers compared by value ("img2" < "img10").
    #[default]
    Natural,

    /// Case-insensitive lexical name.
    Name,

    Size,

    /// Modification time, oldest first.
    Time,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &'_ str = match self {
            Self::Natural => "natural",
            Self::Name => "name",
            Self::Size => "size",
            Self::Time => "time",
        };

        write!(f, "{s}")
    }
}

/// Inputs to `Listing::sort`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortOptions {
    pub sort_by: SortKey,

    pub reverse: bool,

    pub dir_first: bool,

    /// Show dot-prefixed entries.
    pub hidden: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            sort_by: SortKey::Natural,
            reverse: false,
            dir_first: true,
            hidden: false,
        }
    }
}

/// Inputs to the search matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub ignore_case: bool,

    /// With `ignore_case`, an uppercase letter in the pattern forces exact case.
    pub smart_case: bool,

    /// Shell glob instead of substring.
    pub glob_search: bool,

    pub wrap_scan: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            ignore_case: true,
            smart_case: true,
            glob_search: false,
            wrap_scan: true,
        }
    }
}

/// Everything the navigation core reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub sort: SortOptions,

    pub search: SearchOptions,

    /// Minimum rows kept between the cursor and the viewport edge.
    pub scroll_off: usize,

    /// Program invoked as `previewer <path> <height>`; files are read directly when unset.
    pub previewer: Option<PathBuf>,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            sort: SortOptions::default(),
            search: SearchOptions::default(),
            scroll_off: 0,
            previewer: None,
        }
    }
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub nav: NavConfig,

    pub logging: LoggerConfig,

    /// Location of the pending copy/move record. Defaults to the data dir.
    pub clipboard_file: Option<PathBuf>,
}

impl Config {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads config from `config.toml` in the app config dir, writing the
    /// defaults there when no file exists yet.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            info!("Loading config from {}", path.display());
            let text = TokioFs::read_to_string(&path).await?;
            let cfg: Self = toml::from_str(&text)?;

            Ok(cfg)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save().await?;

            Ok(default_config)
        }
    }

    /// Saves config to TOML file at the app config dir.
    pub async fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;

        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(&path, toml_str).await?;

        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "fnav", "fnav")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [nav]
            scroll_off = 4

            [nav.sort]
            sort_by = "size"
            reverse = true
            "#,
        )
        .unwrap();

        assert_eq!(cfg.nav.scroll_off, 4);
        assert_eq!(cfg.nav.sort.sort_by, SortKey::Size);
        assert!(cfg.nav.sort.reverse);
        assert!(cfg.nav.sort.dir_first);
        assert!(cfg.nav.search.wrap_scan);
        assert!(cfg.nav.previewer.is_none());
    }

    #[test]
    fn test_unknown_sort_key_is_rejected() {
        let err = Config::from_toml_str("[nav.sort]\nsort_by = \"ctime\"\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back = Config::from_toml_str(&text).unwrap();

        assert_eq!(back.nav, NavConfig::default());
    }
}
