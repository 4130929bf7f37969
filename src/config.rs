//! Configuration loading.
//!
//! The config file tunes the store location and the thresholds checks read
//! from the account context. Search order mirrors the usual project-then-
//! global convention; every field has a default so no file is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding scans and findings.
    pub database_path: PathBuf,
    /// Days an active access key may go unused before it is flagged.
    pub unused_key_days: i64,
    /// Days after which an active access key is due for rotation.
    pub stale_key_days: i64,
    /// Minimum acceptable password length.
    pub min_password_length: u32,
    /// Tags every running instance must carry.
    pub required_tags: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("cloud-audit.db"),
            unused_key_days: 90,
            stale_key_days: 365,
            min_password_length: 14,
            required_tags: vec![
                "Name".to_string(),
                "Environment".to_string(),
                "Owner".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a file, dispatching on extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| AuditError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| AuditError::Config {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
            "json" => serde_json::from_str(&content).map_err(|e| AuditError::Config {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
            "toml" => toml::from_str(&content).map_err(|e| AuditError::Config {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
            _ => Err(AuditError::Config {
                path: path.display().to_string(),
                message: format!("unsupported config format: {ext}"),
            }),
        }
    }

    /// Load configuration from the project directory or the global config.
    ///
    /// Search order:
    /// 1. `.cloud-audit.yaml` / `.yml` / `.json` / `.toml` in the project root
    /// 2. `~/.config/cloud-audit/config.yaml`
    /// 3. Defaults
    pub fn load(project_root: Option<&Path>) -> Self {
        if let Some(root) = project_root {
            for filename in &[
                ".cloud-audit.yaml",
                ".cloud-audit.yml",
                ".cloud-audit.json",
                ".cloud-audit.toml",
            ] {
                let path = root.join(filename);
                if path.exists() {
                    if let Ok(config) = Self::from_file(&path) {
                        return config;
                    }
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let global = config_dir.join("cloud-audit").join("config.yaml");
            if global.exists() {
                if let Ok(config) = Self::from_file(&global) {
                    return config;
                }
            }
        }

        Self::default()
    }
}
