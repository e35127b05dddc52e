//! Project profiles.
//!
//! A profile is what specializes the generic build for one LLVM project:
//! the components it cannot be built without, its configure flags, the
//! artifacts a good install contains and the suites that test it. The
//! static part lives in [`tables`]; anything that depends on options, the
//! host or the source tree is done by the project's configure function.

pub mod tables;

use std::path::Path;

use anyhow::Result;

use crate::core::backend::CUDA_BACKEND;
use crate::core::build_config::BuildConfig;
use crate::core::errors::ConfigError;
use crate::core::host::HostInfo;
use crate::core::project::ProjectId;
use crate::resolver::{names, DependencyResolver};

pub use tables::ProfileSpec;

/// What a profile may consult while configuring.
pub struct ProfileContext<'a> {
    pub resolver: &'a dyn DependencyResolver,
    /// Directory holding the unpacked component source trees
    pub source_root: &'a Path,
    pub host: &'a HostInfo,
    /// Whether the `llvm-gtest` harness is available
    pub test_harness: bool,
}

/// Project-specific configuration step run after the table is applied.
pub type ConfigureFn = fn(&mut BuildConfig, &ProfileContext<'_>) -> Result<()>;

/// A project's profile: its table plus an optional configure function.
#[derive(Clone, Copy)]
pub struct Profile {
    pub spec: &'static ProfileSpec,
    configure: Option<ConfigureFn>,
}

impl Profile {
    const fn new(spec: &'static ProfileSpec, configure: Option<ConfigureFn>) -> Self {
        Profile { spec, configure }
    }

    /// The profile for `project`, or `None` for a plain pass-through build.
    pub fn for_project(project: &ProjectId) -> Option<Profile> {
        let profile = match project {
            ProjectId::Clang => Profile::new(&tables::CLANG, Some(configure_clang)),
            ProjectId::Flang => Profile::new(&tables::FLANG, None),
            ProjectId::Polly => Profile::new(&tables::POLLY, Some(configure_polly)),
            ProjectId::Mlir => Profile::new(&tables::MLIR, Some(configure_mlir)),
            ProjectId::Lld => Profile::new(&tables::LLD, None),
            ProjectId::Lldb => Profile::new(&tables::LLDB, None),
            ProjectId::CompilerRt => {
                Profile::new(&tables::COMPILER_RT, Some(configure_compiler_rt))
            }
            ProjectId::Runtimes => Profile::new(&tables::RUNTIMES, None),
            ProjectId::Other(_) => return None,
        };
        Some(profile)
    }

    /// Apply the profile to a configuration.
    ///
    /// Hard dependencies are checked before anything is changed.
    pub fn apply(&self, config: &mut BuildConfig, ctx: &ProfileContext<'_>) -> Result<()> {
        for dep in self.spec.hard_deps {
            ctx.resolver.require(dep, &config.name)?;
        }
        add_spec(config, self.spec);
        if let Some(configure) = self.configure {
            configure(config, ctx)?;
        }
        Ok(())
    }
}

fn add_spec(config: &mut BuildConfig, spec: &ProfileSpec) {
    for flag in spec.flags {
        config.add_opt(*flag);
    }
    config
        .artifacts
        .files_in("bin", spec.bins)
        .files_in("lib", spec.libs);
    for file in spec.files {
        config.artifacts.file(*file);
    }
    for dir in spec.dirs {
        config.artifacts.dir(*dir);
    }
    if !spec.test_targets.is_empty() {
        config.test_targets.set(spec.test_targets.iter().copied());
    }
}

fn configure_clang(config: &mut BuildConfig, ctx: &ProfileContext<'_>) -> Result<()> {
    if config.options.enable_rtti {
        config.define("LLVM_REQUIRES_RTTI", "ON");
        config.define("LLVM_ENABLE_RTTI", "ON");
        config.define("LLVM_ENABLE_EH", "ON");
    }
    if let Some(runtime) = config.options.default_openmp_runtime.clone() {
        config.define("CLANG_DEFAULT_OPENMP_RUNTIME", runtime);
    }

    if ctx.test_harness {
        config.define("LLVM_INCLUDE_TESTS", "ON");
    } else {
        tracing::warn!("llvm-gtest not found, disabling tests");
        config.define("LLVM_INCLUDE_TESTS", "OFF");
        config.test_targets.clear();
    }

    // Clang does not find a GCC installed in another prefix on its own.
    let gcc_prefix = ctx
        .resolver
        .resolve(names::GCCCORE)
        .or_else(|| ctx.resolver.resolve(names::GCC))
        .ok_or_else(|| ConfigError::MissingDependency {
            name: format!("{} or {}", names::GCCCORE, names::GCC),
            project: config.name.clone(),
        })?;
    tracing::debug!("Using {} as GCC_INSTALL_PREFIX", gcc_prefix.display());
    config.define("GCC_INSTALL_PREFIX", gcc_prefix.display().to_string());

    config.artifacts.command("clang --version");
    if let Some(polly) = ctx.resolver.resolve(names::POLLY) {
        let plugin = polly
            .join("lib")
            .join(format!("LLVMPolly.{}", ctx.host.shared_lib_ext()));
        config.artifacts.command(format!(
            "echo 'int main(int argc, char **argv) {{ return 1; }}' | clang -xc -fplugin='{}' -O3 -mllvm -polly -c -o /dev/null -",
            plugin.display()
        ));
    }

    let extra_tools = ctx.source_root.join(names::CLANG_TOOLS_EXTRA);
    if extra_tools.exists() {
        tracing::info!("Building Clang with extra tools");
        add_spec(config, &tables::CLANG_TOOLS_EXTRA);
        config.define(
            "LLVM_EXTERNAL_CLANG_TOOLS_EXTRA_SOURCE_DIR",
            extra_tools.display().to_string(),
        );
    }
    Ok(())
}

fn configure_polly(config: &mut BuildConfig, _ctx: &ProfileContext<'_>) -> Result<()> {
    if config.has_target(CUDA_BACKEND) {
        config.define("POLLY_ENABLE_GPGPU_CODEGEN", "ON");
    }
    Ok(())
}

fn configure_mlir(config: &mut BuildConfig, _ctx: &ProfileContext<'_>) -> Result<()> {
    if config.options.python_bindings {
        config.define("MLIR_ENABLE_BINDINGS_PYTHON", "ON");
    }
    Ok(())
}

fn configure_compiler_rt(config: &mut BuildConfig, ctx: &ProfileContext<'_>) -> Result<()> {
    let arch = ctx.host.runtime_arch_name();
    for archive in tables::COMPILER_RT_ARCHIVES {
        config
            .artifacts
            .file(format!("lib/linux/{}-{}.a", archive, arch));
    }
    Ok(())
}
