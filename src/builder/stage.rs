//! Staged build coordinator.
//!
//! A normal build is a single stage compiled by the external toolchain. A
//! bootstrap build adds two more: stage 2 is configured from scratch with
//! the compilers stage 1 produced, stage 3 with those of stage 2. Stages run
//! strictly in order, configure before build, and the first failure ends the
//! run.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::builder::cmake::BuildDriver;
use crate::builder::env::EnvOverlay;
use crate::builder::wrapper::{WrapperSettings, UNUSED_ARGUMENT_FLAG};
use crate::core::build_config::BuildConfig;
use crate::core::errors::{BuildToolError, Phase};
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::process::find_tool;

/// Bitcode linker the OpenMP offload runtime is built with.
const BITCODE_LINKER: &str = "llvm-link";

/// Where a build reads sources from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildLayout {
    /// Source directory of the project being configured
    pub source_dir: PathBuf,
    /// Parent of the per-stage output directories
    pub build_root: PathBuf,
    /// Installation prefix
    pub install_dir: PathBuf,
}

impl BuildLayout {
    /// Output directory of stage `index` (1-based).
    pub fn stage_dir(&self, index: usize) -> PathBuf {
        self.build_root.join(format!("llvm.obj.{}", index))
    }

    /// Directory holding stage `index`'s compiler wrappers.
    pub fn wrapper_dir(&self, index: usize) -> PathBuf {
        self.build_root.join("wrappers").join(format!("stage{}", index))
    }
}

/// C and C++ compiler executables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerPair {
    pub cc: PathBuf,
    pub cxx: PathBuf,
}

impl CompilerPair {
    pub fn new(cc: impl Into<PathBuf>, cxx: impl Into<PathBuf>) -> Self {
        CompilerPair {
            cc: cc.into(),
            cxx: cxx.into(),
        }
    }

    /// The compilers of the external toolchain: `$CC`/`$CXX`, else the
    /// first of gcc/cc and g++/c++ on PATH.
    pub fn detect_external() -> Option<Self> {
        let pick = |var: &str, fallbacks: &[&str]| {
            std::env::var(var)
                .ok()
                .and_then(|name| which::which(name).ok())
                .or_else(|| fallbacks.iter().find_map(|name| which::which(name).ok()))
        };
        let cc = pick("CC", &["gcc", "cc"])?;
        let cxx = pick("CXX", &["g++", "c++"])?;
        Some(CompilerPair { cc, cxx })
    }

    /// Compilers named `clang`/`clang++` as found on the current PATH.
    fn clang_on_path() -> Result<Self> {
        let find = |name: &str| {
            which::which(name).map_err(|_| BuildToolError::ToolNotFound(name.to_string()))
        };
        Ok(CompilerPair {
            cc: find("clang")?,
            cxx: find("clang++")?,
        })
    }
}

/// What one stage was configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    /// 1-based stage number
    pub index: usize,
    pub build_dir: PathBuf,
    /// Compilers passed to configure; `None` lets the native tool choose
    pub compilers: Option<CompilerPair>,
    /// Bitcode linker resolved by full path in wrapped-compiler mode
    pub linker: Option<PathBuf>,
    /// Environment in effect while the stage ran
    pub env: EnvOverlay,
    /// Full configure argument list
    pub configure_args: Vec<String>,
}

impl StageDescriptor {
    /// Directory the stage's executables are built into.
    pub fn bin_dir(&self) -> PathBuf {
        self.build_dir.join("bin")
    }
}

/// Progress of a staged build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    NotStarted,
    Configuring(usize),
    Building(usize),
    Done,
    Failed,
}

impl StageState {
    /// Whether `next` may follow `self` in a run of `total` stages.
    pub fn can_transition_to(self, next: StageState, total: usize) -> bool {
        use StageState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (NotStarted, Configuring(1)) => true,
            (Configuring(k), Building(j)) => k == j,
            (Building(k), Configuring(j)) => j == k + 1 && j <= total,
            (Building(k), Done) => k == total,
            _ => false,
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::NotStarted => write!(f, "not started"),
            StageState::Configuring(k) => write!(f, "stage {} configuring", k),
            StageState::Building(k) => write!(f, "stage {} building", k),
            StageState::Done => write!(f, "done"),
            StageState::Failed => write!(f, "failed"),
        }
    }
}

/// Drives one or three build stages for a configured build.
pub struct StagedBuild<'a> {
    config: &'a BuildConfig,
    layout: &'a BuildLayout,
    toolchain: Option<CompilerPair>,
    wrappers: Option<WrapperSettings>,
    tool_dirs: Vec<PathBuf>,
    state: StageState,
    history: Vec<StageState>,
}

impl<'a> StagedBuild<'a> {
    pub fn new(config: &'a BuildConfig, layout: &'a BuildLayout) -> Self {
        StagedBuild {
            config,
            layout,
            toolchain: None,
            wrappers: None,
            tool_dirs: Vec::new(),
            state: StageState::NotStarted,
            history: vec![StageState::NotStarted],
        }
    }

    /// Compilers stage 1 is configured with.
    pub fn toolchain(mut self, toolchain: Option<CompilerPair>) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Enable wrapped-compiler mode.
    pub fn wrappers(mut self, wrappers: Option<WrapperSettings>) -> Self {
        self.wrappers = wrappers;
        self
    }

    /// Directories searched before PATH for stage 1 tools.
    pub fn tool_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.tool_dirs = dirs;
        self
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    /// Every state the run has been in, oldest first.
    pub fn history(&self) -> &[StageState] {
        &self.history
    }

    /// Run all stages, returning what each was configured with.
    pub fn run(&mut self, driver: &mut dyn BuildDriver) -> Result<Vec<StageDescriptor>> {
        let total = self.config.stage_count();
        let mut stages: Vec<StageDescriptor> = Vec::with_capacity(total);

        for index in 1..=total {
            tracing::info!("Building stage {}", index);
            match self.run_stage(index, stages.last(), driver) {
                Ok(stage) => stages.push(stage),
                Err(e) => {
                    self.transition(StageState::Failed)?;
                    return Err(e);
                }
            }
        }

        self.transition(StageState::Done)?;
        Ok(stages)
    }

    fn run_stage(
        &mut self,
        index: usize,
        previous: Option<&StageDescriptor>,
        driver: &mut dyn BuildDriver,
    ) -> Result<StageDescriptor> {
        let build_dir = self.layout.stage_dir(index);
        remove_dir_all_if_exists(&build_dir)?;
        ensure_dir(&build_dir)?;

        let mut stage_env = EnvOverlay::new();
        if let Some(previous) = previous {
            let previous_bin = previous.bin_dir();
            stage_env.prepend_path("PATH", &previous_bin);

            if let Some(wrappers) = &self.wrappers {
                let wrapper_dir = self.layout.wrapper_dir(index);
                wrappers.prepare(&wrapper_dir, &previous_bin)?;
                stage_env
                    .prepend_path("PATH", &wrapper_dir)
                    .append_flag("CFLAGS", UNUSED_ARGUMENT_FLAG)
                    .append_flag("CXXFLAGS", UNUSED_ARGUMENT_FLAG);
            }
        }
        let env = self.config.env.extended(&stage_env);

        // Restored on every path out of this function.
        let _guard = env.apply()?;

        let compilers = match previous {
            None => self.toolchain.clone(),
            Some(_) => Some(CompilerPair::clang_on_path()?),
        };
        let linker = self.resolve_linker(previous)?;

        let configure_args = self.configure_args(compilers.as_ref(), linker.as_deref());
        tracing::debug!("stage {} configure args: {:?}", index, configure_args);

        self.transition(StageState::Configuring(index))?;
        driver
            .configure(&self.layout.source_dir, &build_dir, &configure_args)
            .with_context(|| format!("stage {} {} failed", index, Phase::Configure))?;

        self.transition(StageState::Building(index))?;
        driver
            .build(&build_dir, self.config.parallel)
            .with_context(|| format!("stage {} {} failed", index, Phase::Build))?;

        Ok(StageDescriptor {
            index,
            build_dir,
            compilers,
            linker,
            env,
            configure_args,
        })
    }

    /// Full path of the bitcode linker in wrapped-compiler mode.
    ///
    /// A wrapper directory only holds the compilers, so the linker cannot be
    /// found next to them. Bootstrap stages take it from the previous
    /// stage's output only, never from PATH; stage 1 from the tool dirs or
    /// PATH.
    fn resolve_linker(&self, previous: Option<&StageDescriptor>) -> Result<Option<PathBuf>> {
        if self.wrappers.is_none() {
            return Ok(None);
        }
        match previous {
            Some(previous) => {
                let linker = previous.bin_dir().join(BITCODE_LINKER);
                if !linker.is_file() {
                    return Err(BuildToolError::ToolNotFound(BITCODE_LINKER.to_string()).into());
                }
                Ok(Some(linker))
            }
            None => {
                let linker = find_tool(BITCODE_LINKER, &self.tool_dirs);
                if linker.is_none() {
                    tracing::warn!("{} not found for stage 1", BITCODE_LINKER);
                }
                Ok(linker)
            }
        }
    }

    fn configure_args(&self, compilers: Option<&CompilerPair>, linker: Option<&Path>) -> Vec<String> {
        let mut args = vec![format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            self.layout.install_dir.display()
        )];
        if let Some(compilers) = compilers {
            args.push(format!("-DCMAKE_C_COMPILER={}", compilers.cc.display()));
            args.push(format!("-DCMAKE_CXX_COMPILER={}", compilers.cxx.display()));
        }
        args.extend(self.config.configopts.iter().cloned());
        args.push(format!("-DCMAKE_BUILD_TYPE={}", self.config.build_type));
        if let Some(linker) = linker {
            args.push(format!("-DLIBOMPTARGET_NVPTX_BC_LINKER={}", linker.display()));
        }
        args
    }

    fn transition(&mut self, next: StageState) -> Result<()> {
        let total = self.config.stage_count();
        if !self.state.can_transition_to(next, total) {
            bail!("invalid stage transition: {} -> {}", self.state, next);
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}
