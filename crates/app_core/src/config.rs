//! Application configuration

use crate::tags::TagSortMode;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub library: LibraryConfig,
    pub session: SessionConfig,
    pub viewer: ViewerConfig,
    pub tags: TagConfig,
    pub index: IndexConfig,
}

/// How library roots are scanned and watched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub show_hidden: bool,
    pub follow_symlinks: bool,
    /// Rescan automatically when the root changes on disk
    pub watch: bool,
    pub watch_debounce_ms: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            show_hidden: false,
            follow_symlinks: false,
            watch: true,
            watch_debounce_ms: 500,
        }
    }
}

/// Paged loading of a selected directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Entries requested per page
    pub page_size: usize,
    /// Keep fetching pages until the directory is exhausted
    pub auto_paging: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: 120,
            auto_paging: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Distance from the loaded edge that triggers a read-ahead fetch
    pub read_ahead_margin: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self { read_ahead_margin: 2 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    pub sort_mode: TagSortMode,
}

/// Directory index builder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub batch_size: usize,
    /// Worker threads; `None` derives from the CPU count
    pub workers: Option<usize>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: 512,
            workers: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", path);
            Ok(config.sanitized())
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "MediaShelf", "MediaShelf")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Clamp values that would stall paging or indexing
    pub(crate) fn sanitized(mut self) -> Self {
        if self.session.page_size == 0 {
            tracing::warn!("session.page_size = 0 is invalid, using default");
            self.session.page_size = SessionConfig::default().page_size;
        }
        self.index.batch_size = self.index.batch_size.max(32);
        self
    }
}
