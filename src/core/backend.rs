//! Code-generation backend selection.
//!
//! When a recipe does not list the backends to build, the host CPU picks one
//! and GPU dependencies add their offload backends. Explicit lists are
//! checked against the backends LLVM knows about.

use crate::core::errors::ConfigError;
use crate::core::host::CpuArch;

/// Every backend name accepted in `LLVM_TARGETS_TO_BUILD`.
pub const KNOWN_BACKENDS: &[&str] = &[
    "all", "AArch64", "AMDGPU", "ARM", "CppBackend", "Hexagon", "Mips", "MBlaze", "MSP430",
    "NVPTX", "PowerPC", "R600", "RISCV", "Sparc", "SystemZ", "X86", "XCore",
];

/// Known to LLVM's history but removed long ago.
pub const RETIRED_BACKEND: &str = "MBlaze";

/// Backend for CUDA offload.
pub const CUDA_BACKEND: &str = "NVPTX";

/// Backend for ROCm offload.
pub const ROCM_BACKEND: &str = "AMDGPU";

/// AMDGPU processors the OpenMP offload runtime can be built for.
pub const AMDGPU_GFX_SUPPORT: &[&str] = &[
    "gfx700", "gfx701", "gfx801", "gfx803", "gfx900", "gfx902", "gfx906", "gfx908", "gfx90a",
    "gfx90c", "gfx1010", "gfx1030", "gfx1031",
];

/// Default backend for a host architecture.
pub fn default_backend(arch: CpuArch) -> &'static str {
    match arch {
        CpuArch::X86_64 => "X86",
        CpuArch::Aarch64 => "AArch64",
        CpuArch::Power => "PowerPC",
        CpuArch::Riscv64 => "RISCV",
    }
}

/// GPU toolchains available to the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accelerators {
    /// A CUDA toolkit is a dependency or part of the active toolchain
    pub cuda: bool,
    /// The ROCm runtime is a dependency
    pub rocm: bool,
}

/// Compute the backends to build.
///
/// `explicit` wins when given. Otherwise the host architecture's default is
/// used, followed by NVPTX and then AMDGPU when their toolchains are present.
/// The result is de-duplicated, keeping first occurrence order.
pub fn select_backends(
    explicit: Option<&[String]>,
    host_arch: &str,
    accelerators: Accelerators,
) -> Result<Vec<String>, ConfigError> {
    let requested: Vec<String> = match explicit {
        Some(list) => list.to_vec(),
        None => {
            let arch = CpuArch::require(host_arch)?;
            let mut defaults = vec![default_backend(arch).to_string()];
            if accelerators.cuda {
                defaults.push(CUDA_BACKEND.to_string());
            }
            if accelerators.rocm {
                defaults.push(ROCM_BACKEND.to_string());
            }
            tracing::debug!(
                "Using {:?} as default build targets for CPU/GPU architecture {}",
                defaults,
                host_arch
            );
            defaults
        }
    };

    validate_backends(&requested)?;

    let mut selected: Vec<String> = Vec::with_capacity(requested.len());
    for backend in requested {
        if !selected.contains(&backend) {
            selected.push(backend);
        }
    }
    Ok(selected)
}

/// Reject unknown and retired backend names.
pub fn validate_backends(backends: &[String]) -> Result<(), ConfigError> {
    let mut unknown: Vec<String> = Vec::new();
    for backend in backends {
        if !KNOWN_BACKENDS.contains(&backend.as_str()) && !unknown.contains(backend) {
            unknown.push(backend.clone());
        }
    }
    if !unknown.is_empty() {
        return Err(ConfigError::UnknownBackends { unknown });
    }

    if backends.iter().any(|b| b == RETIRED_BACKEND) {
        return Err(ConfigError::UnsupportedBackend(RETIRED_BACKEND.to_string()));
    }
    Ok(())
}
