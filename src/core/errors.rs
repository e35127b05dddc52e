//! Error taxonomy for configuring, building and verifying a component.
//!
//! Every variant names the dependency, value, stage or expectation that was
//! violated. Operations return `anyhow::Result` and wrap these; callers can
//! recover the category with `downcast_ref`.

use std::fmt;

use thiserror::Error;

/// A recipe, dependency set or host that cannot produce a valid build.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is required to build {project}")]
    MissingDependency { name: String, project: String },

    #[error("LLVM version {version} is not supported, please use version {minimum} or newer")]
    UnsupportedVersion { version: String, minimum: String },

    #[error("invalid version `{0}`")]
    InvalidVersion(String),

    #[error("bootstrapping is only supported for Clang, not `{0}`")]
    BootstrapNotSupported(String),

    #[error("no default build targets defined for CPU architecture {0}")]
    UnsupportedArch(String),

    #[error("some of the chosen build targets ({}) are not known backends", .unknown.join(", "))]
    UnknownBackends { unknown: Vec<String> },

    #[error("build target {0} is not supported anymore")]
    UnsupportedBackend(String),

    #[error("can't build with {backend} support without specifying `{setting}`")]
    MissingGpuSetting { backend: String, setting: String },

    #[error("invalid CUDA compute capability `{0}`")]
    InvalidCudaCapability(String),

    #[error("unknown AMDGPU target(s): {}", .unknown.join(", "))]
    UnknownGfxTargets { unknown: Vec<String> },

    #[error("can not build on {os} v5.x: libc is buggy, building stage 2 will fail")]
    UnsupportedHost { os: String },

    #[error("failed to extract test results from output of `{target}`")]
    UnparseableTestOutput { target: String },
}

/// Which half of a stage a native tool invocation belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configure,
    Build,
    Install,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Configure => write!(f, "configure"),
            Phase::Build => write!(f, "build"),
            Phase::Install => write!(f, "install"),
        }
    }
}

/// A native tool invocation that exited unsuccessfully.
#[derive(Debug, Error)]
pub enum BuildToolError {
    #[error("`{command}` failed with exit code {status:?}\n{stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("required tool `{0}` not found")]
    ToolNotFound(String),
}

/// An install that does not match what the build promised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("missing expected paths in installation: {}", .missing.join(", "))]
    MissingArtifacts { missing: Vec<String> },

    #[error("smoke test `{command}` failed with exit code {status:?}\n{output}")]
    SmokeCommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },

    #[error("too many failed tests in `{target}`: {failed} (at most {max_allowed} allowed)")]
    TooManyFailures {
        target: String,
        failed: u64,
        max_allowed: u64,
    },
}
