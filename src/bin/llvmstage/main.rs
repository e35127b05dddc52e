//! llvmstage CLI - staged builds of LLVM components

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("llvmstage=debug")
    } else {
        EnvFilter::new("llvmstage=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Targets(args) => commands::targets::execute(args),
        Commands::ModuleEnv(args) => commands::module_env::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
