//! Command implementations

pub mod build;
pub mod completions;
pub mod module_env;
pub mod plan;
pub mod targets;

use anyhow::Result;

use crate::cli::RecipeArgs;
use llvmstage::core::Recipe;
use llvmstage::ops::BuildRequest;
use llvmstage::util::config::{global_config_path, load_config, project_config_path};

/// Turn recipe arguments into a request, with CLI flags over config.
pub fn build_request(args: RecipeArgs) -> Result<BuildRequest> {
    let recipe = Recipe::load(&args.recipe)?;
    let cwd = std::env::current_dir()?;
    let config = load_config(
        global_config_path().as_deref(),
        &project_config_path(&cwd),
    );

    let mut request = BuildRequest::new(recipe);
    request.config = config;
    request.source_dir = args.source_dir;
    request.build_dir = args.build_dir;
    request.install_dir = args.install_dir;
    request.jobs = args.jobs;
    Ok(request)
}
