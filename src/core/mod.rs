//! Core data model: projects, versions, hosts, backends and build records.

pub mod artifacts;
pub mod backend;
pub mod build_config;
pub mod errors;
pub mod host;
pub mod project;
pub mod recipe;
pub mod version;

pub use artifacts::{ArtifactExpectation, TestTargetSet};
pub use build_config::{BuildConfig, BuildOptions};
pub use errors::{BuildToolError, ConfigError, VerificationError};
pub use host::{CpuArch, HostInfo};
pub use project::ProjectId;
pub use recipe::Recipe;
pub use version::LlvmVersion;
