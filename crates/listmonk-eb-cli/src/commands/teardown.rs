//! Teardown precondition command

use super::{load_plan, Context};
use crate::error::CliResult;
use crate::output::print_success;
use listmonk_eb_plan::guard;
use std::path::Path;

/// Fail while any resource in the plan is deletion protected
pub fn execute(ctx: &Context, plan: Option<&Path>) -> CliResult<()> {
    let plan = match plan {
        Some(path) => load_plan(path)?,
        None => ctx.synthesize()?.plan,
    };
    guard::check_teardown(&plan)?;
    print_success(&format!("{} can be torn down", plan.stack_name));
    Ok(())
}
