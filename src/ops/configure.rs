//! Initialization and configuration of a component build.
//!
//! [`initialize`] turns a recipe into a [`BuildConfig`] and selects the
//! backends. [`configure`] then appends every native configure flag in the
//! order the native tool expects, applying the project profile halfway
//! through so later generic flags can rely on it.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::backend::{
    select_backends, Accelerators, AMDGPU_GFX_SUPPORT, CUDA_BACKEND, ROCM_BACKEND,
};
use crate::core::build_config::BuildConfig;
use crate::core::errors::ConfigError;
use crate::core::host::HostInfo;
use crate::core::recipe::Recipe;
use crate::core::version::LlvmVersion;
use crate::profile::{Profile, ProfileContext};
use crate::resolver::{names, DependencyResolver};
use crate::util::process::find_executable;

/// Components whose CMake package directory is passed on when installed.
const CMAKE_PACKAGES: &[&str] = &[
    names::LLVM,
    names::LLD,
    names::LLDB,
    names::CLANG_TOOLS_EXTRA,
    names::CLANG,
    names::FLANG,
    names::MLIR,
];

/// Create the build configuration for a recipe.
///
/// Rejects unsupported versions and bootstrap requests for anything but
/// Clang before any flag is computed.
pub fn initialize(
    recipe: &Recipe,
    host: &HostInfo,
    resolver: &dyn DependencyResolver,
) -> Result<BuildConfig> {
    let version = LlvmVersion::parse_supported(&recipe.version)?;
    let mut config = BuildConfig::new(
        recipe.name.clone(),
        version,
        recipe.build_type.clone(),
        recipe.options.clone(),
    );

    if config.bootstrap() && !config.project.supports_bootstrap() {
        return Err(ConfigError::BootstrapNotSupported(config.name.clone()).into());
    }

    // Python3 must come from the module environment, not a virtualenv.
    config.define("Python3_FIND_VIRTUALENV", "STANDARD");

    let accelerators = Accelerators {
        cuda: config.options.toolchain_cuda || resolver.is_available(names::CUDA),
        rocm: resolver.is_available(names::ROCR_RUNTIME),
    };
    config.targets = select_backends(
        config.options.build_targets.as_deref(),
        &host.arch,
        accelerators,
    )?;

    tracing::debug!(
        "Initialized {} {} with targets {:?}",
        config.name,
        config.version,
        config.targets
    );
    Ok(config)
}

/// Inputs to [`configure`] beyond the configuration itself.
pub struct ConfigureContext<'a> {
    pub resolver: &'a dyn DependencyResolver,
    pub host: &'a HostInfo,
    /// Directory holding the unpacked component source trees
    pub source_root: &'a Path,
    /// Whether the `llvm-gtest` harness is available
    pub test_harness: bool,
    /// CUDA capabilities from the tool configuration; wins over the recipe
    pub cuda_capabilities: &'a [String],
}

/// Append every configure flag for the build.
pub fn configure(config: &mut BuildConfig, ctx: &ConfigureContext<'_>) -> Result<()> {
    let llvm_root = ctx.resolver.require(names::LLVM, &config.name)?;

    for package in CMAKE_PACKAGES {
        if let Some(root) = ctx.resolver.resolve(package) {
            let cmake_dir = root
                .join("lib")
                .join("cmake")
                .join(package.to_ascii_lowercase());
            let var = format!("{}_DIR", package.to_ascii_uppercase().replace('-', "_"));
            config.define(&var, cmake_dir.display().to_string());
        }
    }

    let llvm_modules = ctx.source_root.join("llvm");
    if llvm_modules.exists() {
        let llvm_modules = llvm_modules.join("cmake").join("modules");
        let module_path = match std::env::var("CMAKE_MODULE_PATH") {
            Ok(existing) if !existing.is_empty() => {
                format!("{};{}", llvm_modules.display(), existing)
            }
            _ => llvm_modules.display().to_string(),
        };
        config.define("CMAKE_MODULE_PATH", module_path);
    }

    config.define("LLVM_LINK_LLVM_DYLIB", "ON");

    if let Some(profile) = Profile::for_project(&config.project) {
        let profile_ctx = ProfileContext {
            resolver: ctx.resolver,
            source_root: ctx.source_root,
            host: ctx.host,
            test_harness: ctx.test_harness,
        };
        profile.apply(config, &profile_ctx)?;
    } else {
        tracing::debug!("No profile for {}, building without specialization", config.name);
    }

    let assertions = if config.options.assertions { "ON" } else { "OFF" };
    config.define("LLVM_ENABLE_ASSERTIONS", assertions);

    if ctx.resolver.is_available(names::LLD) {
        config.define("CMAKE_EXE_LINKER_FLAGS", "-fuse-ld=lld");
    }

    let llvm_bin = llvm_root.join("bin");
    for (var, tool) in [
        ("CMAKE_AR", "llvm-ar"),
        ("CMAKE_NM", "llvm-nm"),
        ("CMAKE_RANLIB", "llvm-ranlib"),
    ] {
        config.define(var, llvm_bin.join(tool).display().to_string());
    }

    if config.options.static_analyzer {
        if let Some(z3_root) = ctx.resolver.resolve(names::Z3) {
            config.define("LLVM_ENABLE_Z3_SOLVER", "ON");
            config.define("LLVM_Z3_INSTALL_DIR", z3_root.display().to_string());
        }
    }

    let targets = config.targets.join(";");
    config.define("LLVM_TARGETS_TO_BUILD", targets);

    if let Some(hwloc_root) = ctx.resolver.resolve(names::HWLOC) {
        config.define("LIBOMP_USE_HWLOC", "ON");
        config.define("LIBOMP_HWLOC_INSTALL_DIR", hwloc_root.display().to_string());
    }

    configure_offload(config, ctx)?;

    let user_opts = config.options.configopts.clone();
    config.configopts.extend(user_opts);

    tracing::debug!("configure flags: {:?}", config.configopts);
    Ok(())
}

fn configure_offload(config: &mut BuildConfig, ctx: &ConfigureContext<'_>) -> Result<()> {
    if config.has_target(CUDA_BACKEND) {
        let requested: &[String] = if ctx.cuda_capabilities.is_empty() {
            &config.options.cuda_compute_capabilities
        } else {
            ctx.cuda_capabilities
        };
        if requested.is_empty() {
            return Err(ConfigError::MissingGpuSetting {
                backend: CUDA_BACKEND.to_string(),
                setting: "cuda_compute_capabilities".to_string(),
            }
            .into());
        }
        let capabilities = requested
            .iter()
            .map(|cc| CudaCapability::parse(cc))
            .collect::<Result<Vec<_>, _>>()?;

        let default = match &config.options.default_cuda_capability {
            Some(cc) => CudaCapability::parse(cc)?,
            None => {
                let minimum = capabilities.iter().min().copied().unwrap_or_default();
                tracing::warn!(
                    "No default CUDA capability defined! Using '{}' taken as minimum from cuda_compute_capabilities",
                    minimum
                );
                minimum
            }
        };

        config.define(
            "CLANG_OPENMP_NVPTX_DEFAULT_ARCH",
            format!("sm_{}", default.compact()),
        );
        let list: Vec<String> = capabilities.iter().map(CudaCapability::compact).collect();
        config.define("LIBOMPTARGET_NVPTX_COMPUTE_CAPABILITIES", list.join(","));
    }

    // Keeps CMake's FindCUDA from picking up a toolkit that is not a dependency.
    if !ctx.resolver.is_available(names::CUDA) {
        config.env.set("CUDA_NVCC_EXECUTABLE", "IGNORE");
    }

    if config.has_target(ROCM_BACKEND) {
        ctx.resolver
            .require(names::ROCR_RUNTIME, &format!("{} with {} support", config.name, ROCM_BACKEND))?;
        let gfx_list = &config.options.amd_gfx_list;
        if gfx_list.is_empty() {
            return Err(ConfigError::MissingGpuSetting {
                backend: ROCM_BACKEND.to_string(),
                setting: "amd_gfx_list".to_string(),
            }
            .into());
        }
        let unknown: Vec<String> = gfx_list
            .iter()
            .filter(|gfx| !AMDGPU_GFX_SUPPORT.contains(&gfx.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownGfxTargets { unknown }.into());
        }
        let joined = gfx_list.join(" ");
        config.define("LIBOMPTARGET_AMDGCN_GFXLIST", joined);
    }
    Ok(())
}

/// A CUDA compute capability such as `7.5`, ordered numerically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CudaCapability {
    pub major: u32,
    pub minor: u32,
}

impl CudaCapability {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidCudaCapability(text.to_string());
        let (major, minor) = text.trim().split_once('.').ok_or_else(invalid)?;
        Ok(CudaCapability {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }

    /// Form used in `sm_XY` names: `7.5` becomes `75`.
    pub fn compact(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }
}

impl std::fmt::Display for CudaCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Locate the `llvm-gtest` unit test harness on PATH.
pub fn find_test_harness() -> Option<PathBuf> {
    find_executable("llvm-gtest")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticResolver;
    use crate::test_support::{clang_dependencies, env_lock, llvm_only, recipe_text};
    use tempfile::TempDir;

    fn recipe(name: &str, options: &str) -> Recipe {
        Recipe::parse(&recipe_text(name, options)).unwrap()
    }

    fn context<'a>(
        resolver: &'a StaticResolver,
        host: &'a HostInfo,
        source_root: &'a Path,
    ) -> ConfigureContext<'a> {
        ConfigureContext {
            resolver,
            host,
            source_root,
            test_harness: true,
            cuda_capabilities: &[],
        }
    }

    fn host() -> HostInfo {
        HostInfo::new("x86_64", "linux")
    }

    #[test]
    fn test_initialize_selects_default_targets() {
        let config = initialize(&recipe("polly", ""), &host(), &StaticResolver::new()).unwrap();
        assert_eq!(config.targets, ["X86"]);
        assert_eq!(config.defined("Python3_FIND_VIRTUALENV"), Some("STANDARD"));
    }

    #[test]
    fn test_initialize_adds_gpu_backends_in_order() {
        let resolver = StaticResolver::new()
            .with(names::ROCR_RUNTIME, "/opt/rocr")
            .with(names::CUDA, "/opt/cuda");
        let config = initialize(&recipe("Clang", ""), &host(), &resolver).unwrap();
        assert_eq!(config.targets, ["X86", "NVPTX", "AMDGPU"]);

        let toolchain_cuda = initialize(
            &recipe("Clang", "toolchain_cuda = true"),
            &host(),
            &StaticResolver::new(),
        )
        .unwrap();
        assert_eq!(toolchain_cuda.targets, ["X86", "NVPTX"]);
    }

    #[test]
    fn test_bootstrap_rejected_for_non_clang() {
        let err = initialize(
            &recipe("polly", "bootstrap = true"),
            &host(),
            &StaticResolver::new(),
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::BootstrapNotSupported("polly".to_string()))
        );
    }

    #[test]
    fn test_old_version_rejected() {
        let old = Recipe::parse("name = \"lld\"\nversion = \"17.0.6\"\n").unwrap();
        let err = initialize(&old, &host(), &StaticResolver::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_unknown_explicit_targets_named() {
        let err = initialize(
            &recipe("polly", "build_targets = [\"X86\", \"Z80\"]"),
            &host(),
            &StaticResolver::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("(Z80)"));
    }

    #[test]
    fn test_configure_polly_flag_order() {
        let _lock = env_lock();
        let tmp = TempDir::new().unwrap();
        let resolver = llvm_only(tmp.path());
        let host = host();
        let mut config = initialize(
            &recipe("polly", "build_targets = [\"X86\"]\nconfigopts = [\"-DLLVM_ENABLE_ASSERTIONS=OFF\"]"),
            &host,
            &resolver,
        )
        .unwrap();

        configure(&mut config, &context(&resolver, &host, tmp.path())).unwrap();

        let llvm_root = tmp.path().join("deps").join("LLVM");
        let position = |prefix: &str| {
            config
                .configopts
                .iter()
                .position(|opt| opt.starts_with(prefix))
                .unwrap()
        };
        assert!(position("-DPython3_FIND_VIRTUALENV") < position("-DLLVM_DIR="));
        assert!(position("-DLLVM_LINK_LLVM_DYLIB") < position("-DLLVM_ENABLE_ASSERTIONS=ON"));
        assert!(position("-DLLVM_ENABLE_ASSERTIONS=ON") < position("-DCMAKE_AR="));
        assert_eq!(
            config.defined("LLVM_DIR").map(PathBuf::from),
            Some(llvm_root.join("lib/cmake/llvm"))
        );
        assert_eq!(
            config.defined("CMAKE_RANLIB").map(PathBuf::from),
            Some(llvm_root.join("bin/llvm-ranlib"))
        );
        assert_eq!(config.defined("LLVM_TARGETS_TO_BUILD"), Some("X86"));
        // user options come last and win
        assert_eq!(config.defined("LLVM_ENABLE_ASSERTIONS"), Some("OFF"));
        assert_eq!(config.defined("CMAKE_EXE_LINKER_FLAGS"), None);

        assert_eq!(
            config.artifacts.files(),
            ["lib/LLVMPolly.so", "lib/libPolly.a", "lib/libPollyISL.a"]
        );
        assert_eq!(config.test_targets.as_slice(), ["check-polly"]);
        assert!(config.env.ops().iter().any(|op| matches!(
            op,
            crate::builder::env::EnvOp::Set { var, value }
                if var == "CUDA_NVCC_EXECUTABLE" && value == "IGNORE"
        )));
    }

    #[test]
    fn test_configure_requires_llvm() {
        let tmp = TempDir::new().unwrap();
        let resolver = StaticResolver::new();
        let host = host();
        let mut config = initialize(&recipe("lld", ""), &host, &resolver).unwrap();

        let err = configure(&mut config, &context(&resolver, &host, tmp.path())).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingDependency {
                name: "LLVM".to_string(),
                project: "lld".to_string(),
            })
        );
    }

    #[test]
    fn test_configure_optional_dependencies() {
        let _lock = env_lock();
        let tmp = TempDir::new().unwrap();
        let resolver = clang_dependencies(tmp.path())
            .with(names::Z3, "/opt/z3")
            .with(names::HWLOC, "/opt/hwloc");
        let host = host();
        let mut config = initialize(&recipe("Clang", ""), &host, &resolver).unwrap();

        configure(&mut config, &context(&resolver, &host, tmp.path())).unwrap();

        assert_eq!(config.defined("CMAKE_EXE_LINKER_FLAGS"), Some("-fuse-ld=lld"));
        assert_eq!(config.defined("LLVM_ENABLE_Z3_SOLVER"), Some("ON"));
        assert_eq!(config.defined("LLVM_Z3_INSTALL_DIR"), Some("/opt/z3"));
        assert_eq!(config.defined("LIBOMP_HWLOC_INSTALL_DIR"), Some("/opt/hwloc"));
        assert!(config.defined("LLD_DIR").is_some());
    }

    #[test]
    fn test_nvptx_requires_capabilities() {
        let _lock = env_lock();
        let tmp = TempDir::new().unwrap();
        let resolver = llvm_only(tmp.path()).with(names::CUDA, "/opt/cuda");
        let host = host();
        let mut config = initialize(&recipe("polly", ""), &host, &resolver).unwrap();

        let err = configure(&mut config, &context(&resolver, &host, tmp.path())).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingGpuSetting {
                backend: "NVPTX".to_string(),
                setting: "cuda_compute_capabilities".to_string(),
            })
        );
    }

    #[test]
    fn test_nvptx_default_capability_is_numeric_minimum() {
        let _lock = env_lock();
        let tmp = TempDir::new().unwrap();
        let resolver = llvm_only(tmp.path()).with(names::CUDA, "/opt/cuda");
        let host = host();
        let mut config = initialize(
            &recipe("polly", "cuda_compute_capabilities = [\"10.0\", \"7.5\", \"8.0\"]"),
            &host,
            &resolver,
        )
        .unwrap();

        configure(&mut config, &context(&resolver, &host, tmp.path())).unwrap();

        assert_eq!(config.defined("CLANG_OPENMP_NVPTX_DEFAULT_ARCH"), Some("sm_75"));
        assert_eq!(
            config.defined("LIBOMPTARGET_NVPTX_COMPUTE_CAPABILITIES"),
            Some("100,75,80")
        );
        assert_eq!(config.defined("POLLY_ENABLE_GPGPU_CODEGEN"), Some("ON"));
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_tool_config_capabilities_win() {
        let _lock = env_lock();
        let tmp = TempDir::new().unwrap();
        let resolver = llvm_only(tmp.path());
        let host = host();
        let mut config = initialize(
            &recipe(
                "polly",
                "build_targets = [\"X86\", \"NVPTX\"]\ncuda_compute_capabilities = [\"7.0\"]\ndefault_cuda_capability = \"8.0\"",
            ),
            &host,
            &resolver,
        )
        .unwrap();
        let overrides = vec!["8.0".to_string(), "9.0".to_string()];
        let mut ctx = context(&resolver, &host, tmp.path());
        ctx.cuda_capabilities = &overrides;

        configure(&mut config, &ctx).unwrap();

        assert_eq!(config.defined("CLANG_OPENMP_NVPTX_DEFAULT_ARCH"), Some("sm_80"));
        assert_eq!(
            config.defined("LIBOMPTARGET_NVPTX_COMPUTE_CAPABILITIES"),
            Some("80,90")
        );
    }

    #[test]
    fn test_amdgpu_settings() {
        let _lock = env_lock();
        let tmp = TempDir::new().unwrap();
        let host = host();

        let no_runtime = llvm_only(tmp.path());
        let mut config = initialize(
            &recipe("polly", "build_targets = [\"AMDGPU\"]\namd_gfx_list = [\"gfx90a\"]"),
            &host,
            &no_runtime,
        )
        .unwrap();
        let err = configure(&mut config, &context(&no_runtime, &host, tmp.path())).unwrap_err();
        assert!(err.to_string().contains("ROCR-Runtime"));

        let resolver = llvm_only(tmp.path()).with(names::ROCR_RUNTIME, "/opt/rocr");
        let mut config = initialize(
            &recipe("polly", "amd_gfx_list = [\"gfx90a\", \"gfx1030\"]"),
            &host,
            &resolver,
        )
        .unwrap();
        assert_eq!(config.targets, ["X86", "AMDGPU"]);
        configure(&mut config, &context(&resolver, &host, tmp.path())).unwrap();
        assert_eq!(
            config.defined("LIBOMPTARGET_AMDGCN_GFXLIST"),
            Some("gfx90a gfx1030")
        );

        let mut config = initialize(
            &recipe("polly", "amd_gfx_list = [\"gfx90a\", \"gfx9999\"]"),
            &host,
            &resolver,
        )
        .unwrap();
        let err = configure(&mut config, &context(&resolver, &host, tmp.path())).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnknownGfxTargets {
                unknown: vec!["gfx9999".to_string()],
            })
        );
    }

    #[test]
    fn test_cmake_module_path_from_llvm_source() {
        let _lock = env_lock();
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("llvm/cmake/modules")).unwrap();
        let resolver = llvm_only(tmp.path());
        let host = host();
        let mut config = initialize(&recipe("lld", ""), &host, &resolver).unwrap();

        std::env::set_var("CMAKE_MODULE_PATH", "/opt/modules");
        let result = configure(&mut config, &context(&resolver, &host, tmp.path()));
        std::env::remove_var("CMAKE_MODULE_PATH");
        result.unwrap();

        let expected = format!(
            "{};/opt/modules",
            tmp.path().join("llvm/cmake/modules").display()
        );
        assert_eq!(config.defined("CMAKE_MODULE_PATH"), Some(expected.as_str()));
    }

    #[test]
    fn test_cuda_capability_ordering() {
        let a = CudaCapability::parse("10.0").unwrap();
        let b = CudaCapability::parse("7.5").unwrap();
        assert!(b < a);
        assert_eq!(b.compact(), "75");
        assert!(CudaCapability::parse("sm_75").is_err());
    }
}
