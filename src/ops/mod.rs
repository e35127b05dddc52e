//! High-level operations.
//!
//! This module contains the implementation of llvmstage commands.

pub mod build;
pub mod configure;
pub mod install;
pub mod module_env;
pub mod test_results;
pub mod verify;

pub use build::{build, plan, recipe_resolver, BuildOutcome, BuildPlan, BuildRequest};
pub use configure::{configure, find_test_harness, initialize, ConfigureContext, CudaCapability};
pub use install::{install, post_install};
pub use module_env::{ModuleDirective, ModuleEnv};
pub use test_results::{check_threshold, run_test_suites, ResultParser, SummaryLineParser, TestOutcome};
pub use verify::{verify_install, VerifyReport};
