//! Implementation of `llvmstage build` and `llvmstage plan`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::builder::cmake::BuildDriver;
use crate::builder::env::EnvOverlay;
use crate::builder::stage::{BuildLayout, CompilerPair, StageDescriptor, StagedBuild};
use crate::builder::wrapper::WrapperSettings;
use crate::core::artifacts::{ArtifactExpectation, TestTargetSet};
use crate::core::build_config::BuildConfig;
use crate::core::host::{check_readiness, HostInfo};
use crate::core::recipe::Recipe;
use crate::ops::configure::{configure, find_test_harness, initialize, ConfigureContext};
use crate::ops::install::{install, post_install};
use crate::ops::module_env::ModuleEnv;
use crate::ops::test_results::{run_test_suites, SummaryLineParser, TestOutcome};
use crate::ops::verify::{verify_install, VerifyReport};
use crate::resolver::{names, ChainResolver, DependencyResolver, EnvResolver, StaticResolver};
use crate::util::config::Config;
use crate::util::fs::{normalize_source_dirs, read_to_string};

const OS_RELEASE: &str = "/etc/os-release";

/// Everything a build needs besides the dependency resolver and driver.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub recipe: Recipe,
    pub host: HostInfo,
    /// Layered tool configuration
    pub config: Config,
    /// Overrides the recipe's `source_dir`
    pub source_dir: Option<PathBuf>,
    /// Overrides the recipe's `build_dir`
    pub build_dir: Option<PathBuf>,
    /// Overrides the recipe's `install_dir`
    pub install_dir: Option<PathBuf>,
    /// Overrides the configured job count
    pub jobs: Option<usize>,
    /// Force wrapped-compiler mode
    pub rpath: bool,
    /// Skip every test suite
    pub skip_tests: bool,
    /// Stage 1 compilers; `None` lets the native tool pick
    pub toolchain: Option<CompilerPair>,
    /// Whether `llvm-gtest` is available; detected on PATH when `None`
    pub test_harness: Option<bool>,
}

impl BuildRequest {
    pub fn new(recipe: Recipe) -> Self {
        BuildRequest {
            recipe,
            host: HostInfo::detect(),
            config: Config::default(),
            source_dir: None,
            build_dir: None,
            install_dir: None,
            jobs: None,
            rpath: false,
            skip_tests: false,
            toolchain: None,
            test_harness: None,
        }
    }

    /// Where sources are read from and output written to.
    pub fn layout(&self, config: &BuildConfig) -> Result<BuildLayout> {
        let source_root = self.resolved_source_root()?;
        let build_root = self
            .build_dir
            .clone()
            .or_else(|| self.recipe.paths.build_dir.clone())
            .unwrap_or_else(|| source_root.clone());
        let Some(install_dir) = self
            .install_dir
            .clone()
            .or_else(|| self.recipe.paths.install_dir.clone())
        else {
            bail!(
                "no install directory for {}\nhelp: set `paths.install_dir` in the recipe or pass `--install-dir`",
                config.name
            );
        };

        Ok(BuildLayout {
            source_dir: source_root.join(config.project.source_dir_name()),
            build_root,
            install_dir,
        })
    }

    fn source_root(&self) -> Option<&Path> {
        self.source_dir
            .as_deref()
            .or(self.recipe.paths.source_dir.as_deref())
    }

    /// Source root, falling back to the working directory.
    fn resolved_source_root(&self) -> Result<PathBuf> {
        match self.source_root() {
            Some(root) => Ok(root.to_path_buf()),
            None => std::env::current_dir().context("cannot determine current directory"),
        }
    }

    fn wrappers(&self, layout: &BuildLayout) -> Option<WrapperSettings> {
        (self.rpath || self.config.build.rpath)
            .then(|| WrapperSettings::for_install(&layout.install_dir, []))
    }
}

/// Fully configured build, before anything runs.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub name: String,
    pub project: String,
    pub version: String,
    pub stages: usize,
    pub targets: Vec<String>,
    pub configopts: Vec<String>,
    pub env: EnvOverlay,
    pub artifacts: ArtifactExpectation,
    pub test_targets: TestTargetSet,
    pub layout: BuildLayout,
}

impl BuildPlan {
    fn new(config: &BuildConfig, layout: BuildLayout) -> Self {
        BuildPlan {
            name: config.name.clone(),
            project: config.project.to_string(),
            version: config.version.to_string(),
            stages: config.stage_count(),
            targets: config.targets.clone(),
            configopts: config.configopts.clone(),
            env: config.env.clone(),
            artifacts: config.artifacts.clone(),
            test_targets: config.test_targets.clone(),
            layout,
        }
    }
}

/// Result of a finished build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub config: BuildConfig,
    pub stages: Vec<StageDescriptor>,
    pub tests: Vec<(String, TestOutcome)>,
    pub verified: VerifyReport,
    pub module_env: ModuleEnv,
}

/// Dependencies named in the recipe, then those of loaded modules.
pub fn recipe_resolver(recipe: &Recipe) -> ChainResolver {
    let explicit: StaticResolver = recipe
        .dependencies
        .iter()
        .map(|(name, root)| (name.as_str(), root.clone()))
        .collect();
    ChainResolver::new().then(explicit).then(EnvResolver)
}

/// Initialize and configure without building.
pub fn plan(request: &BuildRequest, resolver: &dyn DependencyResolver) -> Result<BuildPlan> {
    let config = prepare(request, resolver)?;
    let layout = request.layout(&config)?;
    Ok(BuildPlan::new(&config, layout))
}

fn prepare(request: &BuildRequest, resolver: &dyn DependencyResolver) -> Result<BuildConfig> {
    let mut config = initialize(&request.recipe, &request.host, resolver)
        .with_context(|| format!("failed to initialize {}", request.recipe.name))?;
    if let Some(jobs) = request.jobs.or(request.config.build.jobs) {
        config.parallel = Some(jobs);
    }

    let source_root = request.resolved_source_root()?;
    let test_harness = request
        .test_harness
        .unwrap_or_else(|| find_test_harness().is_some());
    let ctx = ConfigureContext {
        resolver,
        host: &request.host,
        source_root: &source_root,
        test_harness,
        cuda_capabilities: &request.config.build.cuda_compute_capabilities,
    };
    configure(&mut config, &ctx)
        .with_context(|| format!("failed to configure {}", config.name))?;
    Ok(config)
}

/// Run the whole pipeline: configure, build every stage, test, install,
/// verify and compute the module environment.
pub fn build(
    request: &BuildRequest,
    resolver: &dyn DependencyResolver,
    driver: &mut dyn BuildDriver,
) -> Result<BuildOutcome> {
    let os_release = Path::new(OS_RELEASE);
    if os_release.is_file() {
        check_readiness(&read_to_string(os_release)?)?;
    }

    if let Some(root) = request.source_root() {
        let version = request.recipe.version.as_str();
        for renamed in normalize_source_dirs(root, version)? {
            tracing::debug!("source tree {}", renamed.display());
        }
    }

    let config = prepare(request, resolver)?;
    let layout = request.layout(&config)?;
    tracing::info!(
        "Building {} {} ({} stage{})",
        config.name,
        config.version,
        config.stage_count(),
        if config.stage_count() == 1 { "" } else { "s" }
    );

    let llvm_bin = resolver
        .resolve(names::LLVM)
        .map(|root| vec![root.join("bin")])
        .unwrap_or_default();
    let mut staged = StagedBuild::new(&config, &layout)
        .toolchain(request.toolchain.clone())
        .wrappers(request.wrappers(&layout))
        .tool_dirs(llvm_bin);
    let stages = staged.run(driver)?;
    let Some(final_stage) = stages.last() else {
        bail!("no stage was built for {}", config.name);
    };

    let tests = if request.skip_tests || config.options.skip_all_tests {
        tracing::info!("Skipping tests");
        Vec::new()
    } else {
        run_test_suites(
            driver,
            &final_stage.build_dir,
            &config.test_targets,
            &SummaryLineParser,
            config.options.test_suite_max_failed,
        )?
    };

    install(
        &config,
        driver,
        &final_stage.build_dir,
        &layout.install_dir,
        resolver,
    )?;
    post_install(&config, &layout.source_dir, &layout.install_dir)?;

    let verified = verify_install(&config.artifacts, &layout.install_dir, &request.host)
        .with_context(|| format!("verification of {} failed", config.name))?;

    let module_env = ModuleEnv::for_install(
        &config.project,
        &layout.install_dir,
        &request.host,
        config.options.python_bindings,
    );

    tracing::info!("Finished {} {}", config.name, config.version);
    Ok(BuildOutcome {
        config,
        stages,
        tests,
        verified,
        module_env,
    })
}
