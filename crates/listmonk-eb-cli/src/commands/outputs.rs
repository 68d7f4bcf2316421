//! Operator outputs command

use super::Context;
use crate::error::CliResult;
use crate::output;
use listmonk_eb_plan::template;
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct OutputRow {
    name: String,
    value: String,
    description: String,
}

/// Print the values exposed to operators after deployment
pub fn execute(ctx: &Context) -> CliResult<()> {
    let synthesis = ctx.synthesize()?;
    let rows: Vec<OutputRow> = synthesis
        .plan
        .outputs()
        .iter()
        .map(|o| OutputRow {
            name: o.name.clone(),
            value: template::render_value(&o.value).to_string(),
            description: o.description.clone(),
        })
        .collect();

    output::print_output(rows, ctx.format)
}
