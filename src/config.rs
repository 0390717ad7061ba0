use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::diff::{EdgeContext, SectionOptions, DEFAULT_CONTEXT_RADIUS};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoldConfig {
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// [diff] section: how context is folded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Lines kept visible next to a change when folding
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,
    /// "full" shows leading/trailing context whole, "collapse" folds it too
    #[serde(default)]
    pub edge_context: EdgeContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_tab_width")]
    pub tab_width: u8,
    #[serde(default = "default_true")]
    pub line_numbers: bool,
}

/// [watch] section: live refresh of the diff source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_context_radius() -> usize {
    DEFAULT_CONTEXT_RADIUS
}

fn default_tab_width() -> u8 {
    4
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_radius: default_context_radius(),
            edge_context: EdgeContext::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            tab_width: default_tab_width(),
            line_numbers: true,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl FoldConfig {
    pub fn section_options(&self) -> SectionOptions {
        SectionOptions {
            context_radius: self.diff.context_radius,
            edge_context: self.diff.edge_context,
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("foldiff/config.toml"))
}

/// Load config by merging global defaults with per-directory overrides.
/// Priority: `<dir>/.foldiff.toml` > global `~/.config/foldiff/config.toml` > built-in defaults.
pub fn load_config(dir: &Path) -> FoldConfig {
    load_config_from(global_config_path().as_deref(), &dir.join(".foldiff.toml"))
}

/// Merging is deep: individual fields within sections (e.g. `[diff]`) override independently.
/// Unreadable or invalid files are skipped with a warning.
fn load_config_from(global_path: Option<&Path>, local_path: &Path) -> FoldConfig {
    let global_table = global_path.and_then(read_table);
    let local_table = read_table(local_path);

    let merged = match (global_table, local_table) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            toml::Value::Table(global)
        }
        (Some(global), None) => toml::Value::Table(global),
        (None, Some(local)) => toml::Value::Table(local),
        (None, None) => return FoldConfig::default(),
    };

    let parsed: Result<FoldConfig, _> = merged.try_into();
    match parsed {
        Ok(config) => config,
        Err(err) => {
            log::warn!("ignoring invalid config: {}", err);
            FoldConfig::default()
        }
    }
}

fn read_table(path: &Path) -> Option<toml::Table> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<toml::Table>(&content) {
        Ok(t) => {
            log::debug!("loaded config {}", path.display());
            Some(t)
        }
        Err(err) => {
            log::warn!("failed to parse {}: {}", path.display(), err);
            None
        }
    }
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(
    base: &mut toml::map::Map<String, toml::Value>,
    overlay: toml::map::Map<String, toml::Value>,
) {
    for (key, value) in overlay {
        match (base.get_mut(&key), &value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table.clone());
            }
            _ => {
                base.insert(key, value);
            }
        }
    }
}
