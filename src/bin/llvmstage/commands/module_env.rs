//! `llvmstage module-env` command

use anyhow::{bail, Result};

use crate::cli::{ModuleEnvArgs, ModuleFormat};
use llvmstage::core::{HostInfo, ProjectId};
use llvmstage::ops::ModuleEnv;

pub fn execute(args: ModuleEnvArgs) -> Result<()> {
    if !args.install_dir.is_dir() {
        bail!("install directory {} does not exist", args.install_dir.display());
    }

    let env = ModuleEnv::for_install(
        &ProjectId::from_name(&args.name),
        &args.install_dir,
        &HostInfo::detect(),
        args.python_bindings,
    );

    match args.format {
        ModuleFormat::Lua => print!("{}", env.to_lua()),
        ModuleFormat::Json => println!("{}", env.to_json()?),
    }
    Ok(())
}
