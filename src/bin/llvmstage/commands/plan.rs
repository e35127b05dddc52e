//! `llvmstage plan` command
//!
//! Prints the fully configured build as JSON.

use anyhow::Result;

use crate::cli::PlanArgs;
use llvmstage::ops::{plan, recipe_resolver};

pub fn execute(args: PlanArgs) -> Result<()> {
    let request = super::build_request(args.recipe)?;
    let resolver = recipe_resolver(&request.recipe);

    let plan = plan(&request, &resolver)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
