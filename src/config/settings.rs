use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PilferError, Result};

/// Project-level configuration, loaded from `.pilfer.toml`.
///
/// Every field has a sensible default so pilfer works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// File (relative to project root) holding the open-session manifest.
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Hidden directory (relative to project root) for the shadow mirror.
    #[serde(default = "default_shadow_dir")]
    pub shadow_dir: String,

    /// Password file to use when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_password_file: Option<String>,

    /// Directory names the scanner never descends into.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_manifest_file() -> String {
    "vaultedFileList.json".to_string()
}

fn default_shadow_dir() -> String {
    ".vault".to_string()
}

fn default_exclude() -> Vec<String> {
    vec![".git".to_string()]
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_file: default_manifest_file(),
            shadow_dir: default_shadow_dir(),
            vault_password_file: None,
            exclude: default_exclude(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".pilfer.toml";

    /// Load settings from `<project_dir>/.pilfer.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            PilferError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path to the manifest file.
    ///
    /// Example: `project_dir/vaultedFileList.json`
    pub fn manifest_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.manifest_file)
    }

    /// Full path to the shadow mirror root.
    ///
    /// Example: `project_dir/.vault`
    pub fn shadow_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.shadow_dir)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
