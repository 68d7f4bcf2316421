//! Creation order command

use super::Context;
use crate::error::CliResult;
use crate::output;
use listmonk_eb_plan::DependencyGraph;
use serde::Serialize;
use tabled::Tabled;

/// Table row for one resource in its creation wave
#[derive(Debug, Serialize, Tabled)]
struct WaveRow {
    wave: usize,
    id: String,
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    kind: String,
    component: String,
}

/// Print every resource grouped by the wave in which it can be created
pub fn execute(ctx: &Context) -> CliResult<()> {
    let synthesis = ctx.synthesize()?;
    let plan = &synthesis.plan;
    let graph = DependencyGraph::build(plan)?;

    let mut rows = Vec::with_capacity(plan.len());
    for (wave, ids) in graph.waves().into_iter().enumerate() {
        for id in ids {
            let Some(resource) = plan.resource(id) else {
                continue;
            };
            rows.push(WaveRow {
                wave,
                id: id.to_string(),
                kind: resource.kind.type_name().to_string(),
                component: resource.component.to_string(),
            });
        }
    }

    output::print_output(rows, ctx.format)
}
