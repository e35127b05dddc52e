//! llvmstage - staged builds of LLVM components
//!
//! This crate provides the core library functionality for llvmstage,
//! including per-project configuration, the multi-stage bootstrap
//! coordinator, test-result interpretation and install verification.

pub mod builder;
pub mod core;
pub mod ops;
pub mod profile;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for llvmstage unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a scripted build driver and common build fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{build_config::BuildConfig, project::ProjectId, recipe::Recipe};
pub use resolver::DependencyResolver;
