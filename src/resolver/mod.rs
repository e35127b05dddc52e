//! Dependency install-root lookup.
//!
//! A build only needs to know whether a sibling component is installed and
//! where. Lookups go through [`DependencyResolver`] so recipes, the
//! surrounding module environment and tests can all provide answers.

mod env;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::errors::ConfigError;

pub use env::{root_env_var, EnvResolver};

/// Well-known dependency names.
pub mod names {
    pub const LLVM: &str = "LLVM";
    pub const LLVM_RUNTIMES: &str = "LLVMruntimes";
    pub const LLD: &str = "lld";
    pub const LLDB: &str = "lldb";
    pub const COMPILER_RT: &str = "compiler-rt";
    pub const CLANG: &str = "clang";
    pub const CLANG_TOOLS_EXTRA: &str = "clang-tools-extra";
    pub const FLANG: &str = "flang";
    pub const MLIR: &str = "mlir";
    pub const POLLY: &str = "polly";
    pub const CUDA: &str = "CUDA";
    pub const ROCR_RUNTIME: &str = "ROCR-Runtime";
    pub const HWLOC: &str = "hwloc";
    pub const Z3: &str = "Z3";
    pub const GCCCORE: &str = "GCCcore";
    pub const GCC: &str = "GCC";
}

/// Answers "is package P available, and where is it installed".
pub trait DependencyResolver {
    /// Install root of `name`, if it is available.
    fn resolve(&self, name: &str) -> Option<PathBuf>;

    fn is_available(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Install root of a dependency `project` cannot be built without.
    fn require(&self, name: &str, project: &str) -> Result<PathBuf, ConfigError> {
        self.resolve(name).ok_or_else(|| ConfigError::MissingDependency {
            name: name.to_string(),
            project: project.to_string(),
        })
    }
}

/// Fixed name → root table. Names match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    roots: BTreeMap<String, PathBuf>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn with(mut self, name: impl AsRef<str>, root: impl Into<PathBuf>) -> Self {
        self.insert(name, root);
        self
    }

    pub fn insert(&mut self, name: impl AsRef<str>, root: impl Into<PathBuf>) {
        self.roots
            .insert(name.as_ref().to_ascii_lowercase(), root.into());
    }
}

impl<S: AsRef<str>, P: Into<PathBuf>> FromIterator<(S, P)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        let mut resolver = StaticResolver::new();
        for (name, root) in iter {
            resolver.insert(name, root);
        }
        resolver
    }
}

impl DependencyResolver for StaticResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.roots.get(&name.to_ascii_lowercase()).cloned()
    }
}

/// Asks each resolver in turn; the first answer wins.
#[derive(Default)]
pub struct ChainResolver {
    layers: Vec<Box<dyn DependencyResolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, resolver: impl DependencyResolver + 'static) -> Self {
        self.layers.push(Box::new(resolver));
        self
    }
}

impl DependencyResolver for ChainResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.layers.iter().find_map(|layer| layer.resolve(name))
    }
}
