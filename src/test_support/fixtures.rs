//! Fixtures for common build scenarios.

use std::path::Path;

use crate::core::build_config::{BuildConfig, BuildOptions};
use crate::core::version::LlvmVersion;
use crate::resolver::{names, StaticResolver};

/// A configured, non-bootstrap Polly build targeting X86.
pub fn polly_config() -> BuildConfig {
    let mut config = BuildConfig::new(
        "polly",
        LlvmVersion::parse("18.1.8").expect("fixture version"),
        "Release",
        BuildOptions::default(),
    );
    config.targets = vec!["X86".to_string()];
    config
}

/// A fresh, unconfigured build for `name`.
pub fn config_for(name: &str, options: BuildOptions) -> BuildConfig {
    BuildConfig::new(
        name,
        LlvmVersion::parse("18.1.8").expect("fixture version"),
        "Release",
        options,
    )
}

/// Install roots under `root` for every dependency a Clang build needs.
///
/// Each root is created on disk with an empty `bin` and `lib`.
pub fn clang_dependencies(root: &Path) -> StaticResolver {
    let mut resolver = StaticResolver::new();
    for name in [
        names::LLVM,
        names::LLVM_RUNTIMES,
        names::LLD,
        names::COMPILER_RT,
        names::GCCCORE,
    ] {
        let dep = root.join("deps").join(name);
        std::fs::create_dir_all(dep.join("bin")).expect("create fixture bin");
        std::fs::create_dir_all(dep.join("lib")).expect("create fixture lib");
        resolver.insert(name, dep);
    }
    resolver
}

/// Only the LLVM core install, which every component needs.
pub fn llvm_only(root: &Path) -> StaticResolver {
    let dep = root.join("deps").join(names::LLVM);
    std::fs::create_dir_all(dep.join("bin")).expect("create fixture bin");
    StaticResolver::new().with(names::LLVM, dep)
}

/// Recipe text for a component.
pub fn recipe_text(name: &str, options: &str) -> String {
    format!(
        "name = \"{}\"\nversion = \"18.1.8\"\n\n[options]\n{}\n",
        name, options
    )
}
