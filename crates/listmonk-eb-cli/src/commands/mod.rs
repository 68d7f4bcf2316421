//! CLI command implementations

pub mod diff;
pub mod graph;
pub mod outputs;
pub mod synth;
pub mod teardown;

use crate::error::CliResult;
use crate::output::OutputFormat;
use listmonk_eb_plan::{Plan, Synthesis};
use listmonk_eb_types::StackParameters;
use std::path::Path;

/// Merged parameters and output settings shared by every command
pub struct Context {
    pub params: StackParameters,
    pub format: OutputFormat,
}

impl Context {
    pub fn synthesize(&self) -> CliResult<Synthesis> {
        Ok(listmonk_eb_plan::synthesize(&self.params)?)
    }
}

/// Load and validate a saved plan.json
pub fn load_plan(path: &Path) -> CliResult<Plan> {
    let json = std::fs::read_to_string(path)?;
    Ok(Plan::from_json(&json)?)
}
