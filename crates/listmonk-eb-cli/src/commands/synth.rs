//! Synthesis command

use super::Context;
use crate::error::CliResult;
use crate::output::{self, print_info, print_success, OutputFormat};
use listmonk_eb_plan::template;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;
use tracing::info;

pub const TEMPLATE_FILE: &str = "template.json";
pub const PLAN_FILE: &str = "plan.json";

/// Table row for per-component resource counts
#[derive(Debug, Serialize, Tabled)]
struct ComponentRow {
    component: String,
    resources: usize,
}

/// Write the template and the plan into `out_dir`
pub fn execute(ctx: &Context, out_dir: &Path) -> CliResult<()> {
    let synthesis = ctx.synthesize()?;
    let plan = &synthesis.plan;

    std::fs::create_dir_all(out_dir)?;
    let template_path = out_dir.join(TEMPLATE_FILE);
    let plan_path = out_dir.join(PLAN_FILE);
    std::fs::write(&template_path, template::to_string_pretty(plan)?)?;
    std::fs::write(&plan_path, plan.to_json()?)?;
    info!(dir = %out_dir.display(), resources = plan.len(), "Wrote synthesis output");

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for resource in plan.resources() {
        *counts.entry(resource.component.to_string()).or_default() += 1;
    }
    let rows: Vec<ComponentRow> = counts
        .into_iter()
        .map(|(component, resources)| ComponentRow { component, resources })
        .collect();

    output::print_output(rows, ctx.format)?;
    if matches!(ctx.format, OutputFormat::Table) {
        print_success(&format!("Template written to {}", template_path.display()));
        print_success(&format!("Plan written to {}", plan_path.display()));
        print_info(&format!(
            "{} bundle {} -> s3://{}/{}",
            synthesis.params.image_tag,
            &synthesis.artifact.digest[..12],
            synthesis.artifact.bucket,
            synthesis.artifact.key
        ));
    }
    Ok(())
}
