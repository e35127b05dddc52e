//! Build options and the resolved per-build configuration record.

use serde::{Deserialize, Serialize};

use crate::builder::env::EnvOverlay;
use crate::core::artifacts::{ArtifactExpectation, TestTargetSet};
use crate::core::project::ProjectId;
use crate::core::version::LlvmVersion;

fn default_true() -> bool {
    true
}

/// Recipe-level options recognized for every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Backends to build; `None` selects them from the host and GPU deps
    pub build_targets: Option<Vec<String>>,

    /// Compile LLVM assertions into the produced tools
    #[serde(default = "default_true")]
    pub assertions: bool,

    /// Rebuild Clang twice with its own output (Clang only)
    pub bootstrap: bool,

    /// Enable RTTI and exception handling in the produced compiler
    pub enable_rtti: bool,

    /// OpenMP runtime baked into Clang's defaults (e.g. `libomp`)
    pub default_openmp_runtime: Option<String>,

    /// Default CUDA capability for offload, e.g. `7.5`
    pub default_cuda_capability: Option<String>,

    /// CUDA capabilities to build the offload runtime for
    pub cuda_compute_capabilities: Vec<String>,

    /// AMDGPU processors to build the offload runtime for
    pub amd_gfx_list: Vec<String>,

    /// Install the Python bindings of Clang or MLIR
    pub python_bindings: bool,

    /// Do not run any test suite
    pub skip_all_tests: bool,

    /// Highest tolerated number of failed tests per suite
    pub test_suite_max_failed: u64,

    /// Enable Z3 support in the static analyzer when Z3 is available
    #[serde(default = "default_true")]
    pub static_analyzer: bool,

    /// The active toolchain already carries a CUDA compiler
    pub toolchain_cuda: bool,

    /// Parallel jobs for the native build tool
    pub parallel: Option<usize>,

    /// Extra flags appended after everything this tool computes
    pub configopts: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            build_targets: None,
            assertions: true,
            bootstrap: false,
            enable_rtti: false,
            default_openmp_runtime: None,
            default_cuda_capability: None,
            cuda_compute_capabilities: Vec::new(),
            amd_gfx_list: Vec::new(),
            python_bindings: false,
            skip_all_tests: false,
            test_suite_max_failed: 0,
            static_analyzer: true,
            toolchain_cuda: false,
            parallel: None,
            configopts: Vec::new(),
        }
    }
}

/// Everything resolved about one build invocation.
///
/// Created once at initialization and mutated while the build is
/// configured; the staged coordinator, test interpreter and verifier only
/// read it.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Component name as written in the recipe
    pub name: String,
    pub project: ProjectId,
    pub version: LlvmVersion,
    /// CMAKE_BUILD_TYPE
    pub build_type: String,
    /// Selected code-generation backends, in order
    pub targets: Vec<String>,
    pub options: BuildOptions,
    /// Native configure flags; later entries override earlier ones
    pub configopts: Vec<String>,
    pub parallel: Option<usize>,
    /// Environment applied around every stage
    pub env: EnvOverlay,
    pub artifacts: ArtifactExpectation,
    pub test_targets: TestTargetSet,
}

impl BuildConfig {
    /// Start a configuration for component `name` with nothing resolved yet.
    pub fn new(
        name: impl Into<String>,
        version: LlvmVersion,
        build_type: impl Into<String>,
        options: BuildOptions,
    ) -> Self {
        let name = name.into();
        BuildConfig {
            project: ProjectId::from_name(&name),
            name,
            version,
            build_type: build_type.into(),
            targets: Vec::new(),
            parallel: options.parallel,
            options,
            configopts: Vec::new(),
            env: EnvOverlay::new(),
            artifacts: ArtifactExpectation::new(),
            test_targets: TestTargetSet::new(),
        }
    }

    /// Append a native configure flag.
    pub fn add_opt(&mut self, flag: impl Into<String>) {
        self.configopts.push(flag.into());
    }

    /// Append a `-DNAME=VALUE` cache definition.
    pub fn define(&mut self, name: &str, value: impl AsRef<str>) {
        self.add_opt(format!("-D{}={}", name, value.as_ref()));
    }

    /// Effective value of a cache definition (the last one wins).
    pub fn defined(&self, name: &str) -> Option<&str> {
        let prefix = format!("-D{}=", name);
        self.configopts
            .iter()
            .rev()
            .find_map(|opt| opt.strip_prefix(prefix.as_str()))
    }

    pub fn has_target(&self, backend: &str) -> bool {
        self.targets.iter().any(|t| t == backend)
    }

    pub fn bootstrap(&self) -> bool {
        self.options.bootstrap
    }

    /// Number of stages the coordinator will run.
    pub fn stage_count(&self) -> usize {
        if self.bootstrap() {
            3
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BuildConfig {
        BuildConfig::new(
            "polly",
            LlvmVersion::parse("18.1.8").unwrap(),
            "Release",
            BuildOptions::default(),
        )
    }

    #[test]
    fn test_new_normalizes_project() {
        let options = BuildOptions {
            parallel: Some(8),
            ..BuildOptions::default()
        };
        let cfg = BuildConfig::new(
            "LLVMruntimes",
            LlvmVersion::parse("18.1.8").unwrap(),
            "Release",
            options,
        );
        assert_eq!(cfg.project, ProjectId::Runtimes);
        assert_eq!(cfg.name, "LLVMruntimes");
        assert_eq!(cfg.parallel, Some(8));
        assert!(cfg.targets.is_empty());
    }

    #[test]
    fn test_last_definition_wins() {
        let mut cfg = config();
        cfg.define("LLVM_INCLUDE_TESTS", "OFF");
        cfg.add_opt("-DLLVM_ENABLE_ASSERTIONS=ON");
        cfg.define("LLVM_INCLUDE_TESTS", "ON");

        assert_eq!(cfg.defined("LLVM_INCLUDE_TESTS"), Some("ON"));
        assert_eq!(cfg.defined("LLVM_ENABLE_ASSERTIONS"), Some("ON"));
        assert_eq!(cfg.defined("LLVM_ENABLE"), None);
    }

    #[test]
    fn test_option_defaults() {
        let opts: BuildOptions = toml::from_str("bootstrap = true").unwrap();
        assert!(opts.bootstrap);
        assert!(opts.assertions);
        assert!(opts.static_analyzer);
        assert_eq!(opts.test_suite_max_failed, 0);
        assert_eq!(opts.build_targets, None);
    }

    #[test]
    fn test_stage_count() {
        let mut cfg = config();
        assert_eq!(cfg.stage_count(), 1);
        cfg.options.bootstrap = true;
        assert_eq!(cfg.stage_count(), 3);
    }
}
