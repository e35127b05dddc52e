//! Native build driving.
//!
//! This module owns everything that touches the native build tool: the
//! configure/build/install seam, the scoped environment each stage runs in,
//! RPATH compiler wrappers and the staged coordinator tying them together.

pub mod cmake;
pub mod env;
pub mod stage;
pub mod wrapper;

pub use cmake::{BuildDriver, CMakeDriver};
pub use env::{EnvGuard, EnvOverlay};
pub use stage::{BuildLayout, CompilerPair, StageDescriptor, StageState, StagedBuild};
pub use wrapper::WrapperSettings;
