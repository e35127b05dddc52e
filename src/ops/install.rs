//! Install and post-install steps.

use std::path::Path;

use anyhow::{Context, Result};

use crate::builder::cmake::BuildDriver;
use crate::core::build_config::BuildConfig;
use crate::core::errors::Phase;
use crate::core::project::ProjectId;
use crate::resolver::{names, DependencyResolver};
use crate::util::fs::{copy_dir_all, ensure_dir, symlink_force};

/// Install the final stage and link in what the install needs from siblings.
///
/// Clang looks for its runtime libraries in its resource directory, so the
/// compiler-rt `lib` directory is linked to `lib/clang/<major>/lib`.
pub fn install(
    config: &BuildConfig,
    driver: &mut dyn BuildDriver,
    final_stage_dir: &Path,
    install_dir: &Path,
    resolver: &dyn DependencyResolver,
) -> Result<()> {
    tracing::info!("Installing {} into {}", config.name, install_dir.display());
    driver
        .install(final_stage_dir)
        .with_context(|| format!("{} of {} failed", Phase::Install, config.name))?;

    if config.project == ProjectId::Clang {
        let compiler_rt = resolver.require(names::COMPILER_RT, &config.name)?;
        let resource_dir = install_dir
            .join("lib")
            .join("clang")
            .join(config.version.major().to_string());
        ensure_dir(&resource_dir)?;
        symlink_force(&compiler_rt.join("lib"), &resource_dir.join("lib"))?;
    }
    Ok(())
}

/// Copy language bindings into the install when requested.
pub fn post_install(config: &BuildConfig, project_src: &Path, install_dir: &Path) -> Result<()> {
    if !config.options.python_bindings || !config.project.has_python_bindings() {
        return Ok(());
    }
    let source = project_src.join("bindings").join("python");
    let target = install_dir.join("lib").join("python");
    tracing::info!("Installing Python bindings into {}", target.display());
    copy_dir_all(&source, &target)
        .with_context(|| format!("failed to install Python bindings of {}", config.name))
}
