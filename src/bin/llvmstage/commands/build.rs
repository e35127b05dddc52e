//! `llvmstage build` command

use anyhow::{Context, Result};

use crate::cli::BuildArgs;
use llvmstage::builder::{CMakeDriver, CompilerPair};
use llvmstage::ops::{build, recipe_resolver};

pub fn execute(args: BuildArgs) -> Result<()> {
    let mut request = super::build_request(args.recipe)?;
    request.rpath = args.rpath;
    request.skip_tests = args.skip_tests;
    request.toolchain = match (args.cc, args.cxx) {
        (Some(cc), Some(cxx)) => Some(CompilerPair::new(cc, cxx)),
        _ => CompilerPair::detect_external(),
    };

    let resolver = recipe_resolver(&request.recipe);
    let mut driver = CMakeDriver::new()?;
    let outcome = build(&request, &resolver, &mut driver)?;

    for (target, result) in &outcome.tests {
        eprintln!("    Tested {} ({} failed)", target, result.failed);
    }
    eprintln!(
        "  Verified {} files, {} directories, {} commands",
        outcome.verified.files.len(),
        outcome.verified.dirs.len(),
        outcome.verified.commands.len()
    );

    let lua = outcome.module_env.to_lua();
    match args.module_file {
        Some(path) => {
            std::fs::write(&path, lua)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("     Wrote {}", path.display());
        }
        None => print!("{}", lua),
    }

    eprintln!(
        "  Finished {} {} in {}",
        outcome.config.name,
        outcome.config.version,
        outcome.module_env.root.display()
    );
    Ok(())
}
