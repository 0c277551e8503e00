use crate::apply::HideOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "meshfind";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the user config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remove hidden elements from the graph instead of making them invisible
    #[serde(default = "default_compress_on_hide")]
    pub compress_on_hide: bool,

    /// Turn on the display options a query asks for
    #[serde(default = "default_honor_option_requests")]
    pub honor_option_requests: bool,

    /// Zoom drift after a re-layout that is absorbed rather than restored
    #[serde(default = "default_zoom_tolerance")]
    pub zoom_tolerance: f64,

    /// Pan drift, in pixels, absorbed rather than restored
    #[serde(default = "default_pan_tolerance")]
    pub pan_tolerance: f64,

    /// Colored terminal output
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_compress_on_hide() -> bool {
    true
}

fn default_honor_option_requests() -> bool {
    true
}

fn default_zoom_tolerance() -> f64 {
    0.1
}

fn default_pan_tolerance() -> f64 {
    20.0
}

fn default_color() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            compress_on_hide: default_compress_on_hide(),
            honor_option_requests: default_honor_option_requests(),
            zoom_tolerance: default_zoom_tolerance(),
            pan_tolerance: default_pan_tolerance(),
            color: default_color(),
        }
    }
}

impl AppConfig {
    /// Load config from the config directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Load config from an explicit path, or return default if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Write config to `path`, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Viewport tolerances for the hide applier
    pub fn hide_options(&self) -> HideOptions {
        HideOptions {
            zoom_tolerance: self.zoom_tolerance,
            pan_tolerance: self.pan_tolerance,
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join(APP_NAME).join(CONFIG_FILE))
}
