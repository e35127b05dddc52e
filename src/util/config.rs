//! Configuration file support for llvmstage.
//!
//! Two configuration file locations are read:
//! - Global: `~/.llvmstage/config.toml` - User-wide defaults
//! - Project: `.llvmstage/config.toml` - Overrides for one build area
//!
//! Project config takes precedence over global config. These settings play
//! the role of framework-wide build options: they apply to every recipe built
//! with them and override what an individual recipe asks for.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// llvmstage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildSettings,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Default number of parallel jobs handed to the native build tool
    pub jobs: Option<usize>,

    /// Wrap compilers in RPATH-injecting scripts for bootstrap stages
    #[serde(default)]
    pub rpath: bool,

    /// CUDA compute capabilities, overriding the recipe's list
    #[serde(default)]
    pub cuda_compute_capabilities: Vec<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.rpath {
            self.build.rpath = true;
        }
        if !other.build.cuda_compute_capabilities.is_empty() {
            self.build.cuda_compute_capabilities = other.build.cuda_compute_capabilities;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.llvmstage/config.toml)
/// 2. Global config (~/.llvmstage/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global llvmstage config directory (~/.llvmstage).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".llvmstage"))
}

/// Get the global config path (~/.llvmstage/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.llvmstage/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".llvmstage").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = project_config_path(tmp.path());
        std::fs::create_dir_all(project.parent().unwrap()).unwrap();

        std::fs::write(
            &global,
            "[build]\njobs = 4\ncuda_compute_capabilities = [\"7.0\"]\n",
        )
        .unwrap();
        std::fs::write(&project, "[build]\njobs = 16\nrpath = true\n").unwrap();

        let config = load_config(Some(&global), &project);

        assert_eq!(config.build.jobs, Some(16));
        assert!(config.build.rpath);
        assert_eq!(config.build.cuda_compute_capabilities, vec!["7.0"]);
    }

    #[test]
    fn test_broken_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("config.toml");
        std::fs::write(&project, "[build\njobs = ").unwrap();

        let config = load_config(None, &project);
        assert_eq!(config.build.jobs, None);
        assert!(!config.build.rpath);
    }
}
