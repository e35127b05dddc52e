//! `llvmstage targets` command

use anyhow::Result;

use crate::cli::TargetsArgs;
use llvmstage::core::backend::{select_backends, Accelerators};
use llvmstage::core::HostInfo;

pub fn execute(args: TargetsArgs) -> Result<()> {
    let arch = args.arch.unwrap_or_else(|| HostInfo::detect().arch);
    let accelerators = Accelerators {
        cuda: args.cuda,
        rocm: args.rocm,
    };

    let selected = select_backends(args.targets.as_deref(), &arch, accelerators)?;
    println!("{}", selected.join(";"));
    Ok(())
}
