//! Console settings file
//!
//! Settings are read from an optional TOML file; command line flags take
//! precedence over anything in it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use devconsole_logs::{ConsoleConfig, MaxEntries};

/// Contents of the settings file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Retained entries, 0 for unbounded
    pub max_entries: Option<usize>,
    pub display_header: Option<bool>,
    pub viewport_height: Option<usize>,
    /// Helper library name to file path
    pub libraries: HashMap<String, PathBuf>,
}

impl FileConfig {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Merge with command line overrides
    pub fn resolve(self, max_entries: Option<usize>, display_header: bool) -> Settings {
        let defaults = ConsoleConfig::default();
        let console = ConsoleConfig {
            max_entries: max_entries
                .or(self.max_entries)
                .map_or(defaults.max_entries, MaxEntries::from_count),
            display_header: display_header || self.display_header.unwrap_or(false),
            viewport_height: self.viewport_height.unwrap_or(defaults.viewport_height),
        };

        Settings {
            console,
            libraries: self.libraries,
        }
    }
}

/// Effective settings
#[derive(Debug)]
pub struct Settings {
    pub console: ConsoleConfig,
    pub libraries: HashMap<String, PathBuf>,
}
