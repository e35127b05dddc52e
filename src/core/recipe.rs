//! Recipe files.
//!
//! A recipe describes one component build:
//!
//! ```toml
//! name = "Clang"
//! version = "18.1.8"
//!
//! [options]
//! bootstrap = true
//! build_targets = ["X86", "NVPTX"]
//! cuda_compute_capabilities = ["7.5", "8.0"]
//!
//! [paths]
//! source_dir = "src"
//! install_dir = "/opt/clang/18.1.8"
//!
//! [dependencies]
//! LLVM = "/opt/llvm/18.1.8"
//! lld = "/opt/lld/18.1.8"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::build_config::BuildOptions;

fn default_build_type() -> String {
    "Release".to_string()
}

/// A parsed recipe file.
#[derive(Debug, Clone, Deserialize)]
pub struct Recipe {
    /// Component name, e.g. `Clang` or `LLVMruntimes`
    pub name: String,

    /// LLVM release
    pub version: String,

    /// CMAKE_BUILD_TYPE for every stage
    #[serde(default = "default_build_type")]
    pub build_type: String,

    #[serde(default)]
    pub options: BuildOptions,

    #[serde(default)]
    pub paths: RecipePaths,

    /// Explicit install roots, consulted before the environment
    #[serde(default)]
    pub dependencies: BTreeMap<String, PathBuf>,
}

/// Directory layout of a build.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecipePaths {
    /// Directory holding the unpacked monorepo components
    pub source_dir: Option<PathBuf>,
    /// Where stage output directories are created (defaults to `source_dir`)
    pub build_dir: Option<PathBuf>,
    /// Installation prefix
    pub install_dir: Option<PathBuf>,
}

impl Recipe {
    /// Parse a recipe from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse recipe")
    }

    /// Load a recipe file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe: {}", path.display()))?;
        let mut recipe: Recipe = toml::from_str(&contents)
            .with_context(|| format!("failed to parse recipe: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        recipe.resolve_paths(base);
        Ok(recipe)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let absolutize = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        absolutize(&mut self.paths.source_dir);
        absolutize(&mut self.paths.build_dir);
        absolutize(&mut self.paths.install_dir);

        for root in self.dependencies.values_mut() {
            if root.is_relative() {
                *root = base.join(&*root);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_recipe() {
        let recipe = Recipe::parse("name = \"polly\"\nversion = \"18.1.8\"\n").unwrap();

        assert_eq!(recipe.name, "polly");
        assert_eq!(recipe.build_type, "Release");
        assert!(recipe.options.assertions);
        assert!(recipe.dependencies.is_empty());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clang.toml");
        std::fs::write(
            &path,
            r#"
name = "Clang"
version = "18.1.8"

[options]
build_targets = ["X86"]
bootstrap = true

[paths]
source_dir = "src"
install_dir = "/opt/clang"

[dependencies]
lld = "deps/lld"
"#,
        )
        .unwrap();

        let recipe = Recipe::load(&path).unwrap();

        assert_eq!(recipe.paths.source_dir, Some(tmp.path().join("src")));
        assert_eq!(recipe.paths.install_dir, Some(PathBuf::from("/opt/clang")));
        assert_eq!(recipe.dependencies["lld"], tmp.path().join("deps/lld"));
        assert!(recipe.options.bootstrap);
        assert_eq!(recipe.options.build_targets, Some(vec!["X86".to_string()]));
    }

    #[test]
    fn test_unknown_option_type_is_an_error() {
        let err = Recipe::parse("name = \"x\"\nversion = \"18.1.8\"\n[options]\nbootstrap = \"yes\"\n");
        assert!(err.is_err());
    }
}
