//! Plan diff command

use super::{load_plan, Context};
use crate::error::CliResult;
use crate::output::{self, print_info, print_success, print_warning, OutputFormat};
use listmonk_eb_plan::{ChangeAction, PlanDiff, ResourceChange};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;
use tracing::debug;

/// Table row for one resource change
#[derive(Debug, Serialize, Tabled)]
struct ChangeRow {
    action: String,
    id: String,
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    kind: String,
    properties: String,
}

impl From<&ResourceChange> for ChangeRow {
    fn from(c: &ResourceChange) -> Self {
        Self {
            action: c.action.to_string(),
            id: c.id.to_string(),
            kind: c.kind.type_name().to_string(),
            properties: c.properties.join(", "),
        }
    }
}

/// Compare the plan at `previous` with a fresh synthesis
pub fn execute(ctx: &Context, previous: &Path) -> CliResult<()> {
    let before = load_plan(previous)?;
    let synthesis = ctx.synthesize()?;
    let diff = PlanDiff::between(&before, &synthesis.plan)?;
    debug!(changes = diff.changes.len(), outputs = diff.outputs.len(), "Diff computed");

    if !matches!(ctx.format, OutputFormat::Table) {
        return output::print_single(&diff, ctx.format);
    }
    if diff.is_empty() {
        print_success("No changes");
        return Ok(());
    }

    let rows: Vec<ChangeRow> = diff.changes.iter().map(ChangeRow::from).collect();
    output::print_output(rows, ctx.format)?;

    for action in [
        ChangeAction::Create,
        ChangeAction::Update,
        ChangeAction::Replace,
        ChangeAction::Delete,
    ] {
        let count = diff.count(action);
        if count > 0 {
            print_info(&format!("{count} to {action}"));
        }
    }
    if !diff.outputs.is_empty() {
        print_info(&format!("Outputs changed: {}", diff.outputs.join(", ")));
    }
    for change in diff.blocked() {
        print_warning(&format!(
            "{} {} is deletion protected and will be refused",
            change.action, change.id
        ));
    }
    Ok(())
}
