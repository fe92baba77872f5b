use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::query::StatusFilter;
use crate::workflow::TransitionPolicy;

const PROJECT_CONFIG: &str = ".muster/config.toml";
const USER_CONFIG: &str = "muster/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusterConfig {
    #[serde(default)]
    pub filters: FilterDefaults,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// Session defaults for the penalty filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDefaults {
    #[serde(default = "default_department")]
    pub default_department: String,
    #[serde(default = "default_status")]
    pub default_status: String,
    #[serde(default = "default_trailing_days")]
    pub trailing_days: u32,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            default_department: default_department(),
            default_status: default_status(),
            trailing_days: default_trailing_days(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub policy: TransitionPolicy,
}

impl MusterConfig {
    /// Reject values that parse as TOML but mean nothing here.
    ///
    /// # Errors
    ///
    /// Fails when `filters.default_status` is not a status or `ALL`.
    pub fn validate(&self) -> Result<()> {
        if let Err(err) = self.filters.default_status.parse::<StatusFilter>() {
            bail!("filters.default_status: {err}");
        }
        if self.filters.default_department.trim().is_empty() {
            bail!("filters.default_department must not be empty (use \"ALL\" for no filter)");
        }
        Ok(())
    }
}

/// Load `<project_root>/.muster/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<MusterConfig> {
    let path = project_root.join(PROJECT_CONFIG);
    decode(read_layer(&path)?.unwrap_or_default(), &path)
}

/// Effective configuration: user file, then the project file (or
/// `explicit`, when given) on top. Keys set in the upper layer win.
///
/// # Errors
///
/// Fails on unreadable or malformed files, on an `explicit` path that does
/// not exist, and on values rejected by [`MusterConfig::validate`].
pub fn resolve_config(project_root: &Path, explicit: Option<&Path>) -> Result<MusterConfig> {
    let mut merged = match user_config_path() {
        Some(path) => read_layer(&path)?.unwrap_or_default(),
        None => toml::Table::new(),
    };

    let (upper_path, upper) = match explicit {
        Some(path) => {
            let layer = read_layer(path)?
                .with_context(|| format!("Config file {} does not exist", path.display()))?;
            (path.to_path_buf(), layer)
        }
        None => {
            let path = project_root.join(PROJECT_CONFIG);
            let layer = read_layer(&path)?.unwrap_or_default();
            (path, layer)
        }
    };
    merge_tables(&mut merged, upper);

    let config = decode(merged, &upper_path)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration (last layer {})", upper_path.display()))?;
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG))
}

fn read_layer(path: &Path) -> Result<Option<toml::Table>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str::<toml::Table>(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn decode(table: toml::Table, path: &Path) -> Result<MusterConfig> {
    MusterConfig::deserialize(toml::Value::Table(table))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Section-wise overlay: nested tables merge, everything else is replaced.
fn merge_tables(base: &mut toml::Table, upper: toml::Table) {
    for (key, value) in upper {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

fn default_department() -> String {
    "DevSecOps".to_string()
}

fn default_status() -> String {
    "PENDING".to_string()
}

const fn default_trailing_days() -> u32 {
    30
}
