//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// llvmstage - staged builds of LLVM components
#[derive(Parser)]
#[command(name = "llvmstage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure, build, test, install and verify a component
    Build(BuildArgs),

    /// Show the resolved configuration of a recipe without building
    Plan(PlanArgs),

    /// Show the backends that would be built for a host
    Targets(TargetsArgs),

    /// Emit module environment directives for an install
    ModuleEnv(ModuleEnvArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Recipe location and directory overrides shared by `build` and `plan`.
#[derive(Args)]
pub struct RecipeArgs {
    /// Recipe file describing the component
    pub recipe: PathBuf,

    /// Directory holding the unpacked sources
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Directory for stage build trees
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Installation prefix
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    /// Wrap stage compilers to embed the install's library path
    #[arg(long)]
    pub rpath: bool,

    /// Do not run any test suite
    #[arg(long)]
    pub skip_tests: bool,

    /// C compiler for the first stage
    #[arg(long, requires = "cxx")]
    pub cc: Option<PathBuf>,

    /// C++ compiler for the first stage
    #[arg(long, requires = "cc")]
    pub cxx: Option<PathBuf>,

    /// Write the module environment (Lua) to this file
    #[arg(long)]
    pub module_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,
}

#[derive(Args)]
pub struct TargetsArgs {
    /// CPU architecture (defaults to the host's)
    #[arg(long)]
    pub arch: Option<String>,

    /// Explicit backend list; validated instead of defaulted
    #[arg(long, value_delimiter = ',')]
    pub targets: Option<Vec<String>>,

    /// A CUDA toolkit is available
    #[arg(long)]
    pub cuda: bool,

    /// The ROCm runtime is available
    #[arg(long)]
    pub rocm: bool,
}

#[derive(Args)]
pub struct ModuleEnvArgs {
    /// Installation prefix of the component
    pub install_dir: PathBuf,

    /// Component name, e.g. Clang
    #[arg(long, default_value = "LLVM")]
    pub name: String,

    /// Language bindings were installed
    #[arg(long)]
    pub python_bindings: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = ModuleFormat::Lua)]
    pub format: ModuleFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModuleFormat {
    Lua,
    Json,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
