//! Teardown preconditions
//!
//! Deletion protection on the data cluster is switched off out-of-band. Until
//! it is, tearing the plan down (or replacing the cluster) is refused here
//! with the list of resources that hold it up.

use crate::diff::PlanDiff;
use crate::error::{PlanError, Result};
use crate::plan::Plan;
use listmonk_eb_types::Resource;
use tracing::warn;

/// Resources the engine refuses to delete
pub fn protected_resources(plan: &Plan) -> Vec<&Resource> {
    plan.resources()
        .iter()
        .filter(|r| r.is_deletion_protected())
        .collect()
}

/// Fail if deleting the whole plan would hit deletion protection.
pub fn check_teardown(plan: &Plan) -> Result<()> {
    let protected: Vec<_> = protected_resources(plan)
        .into_iter()
        .map(|r| r.id.clone())
        .collect();
    if protected.is_empty() {
        return Ok(());
    }
    warn!(count = protected.len(), "Teardown blocked by deletion protection");
    Err(PlanError::DeletionProtected(protected))
}

/// Fail if applying `diff` would delete or replace a protected resource.
pub fn check_changes(diff: &PlanDiff) -> Result<()> {
    let blocked: Vec<_> = diff.blocked().into_iter().map(|c| c.id.clone()).collect();
    if blocked.is_empty() {
        return Ok(());
    }
    warn!(count = blocked.len(), "Change blocked by deletion protection");
    Err(PlanError::DeletionProtected(blocked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Fragment;
    use crate::testing::params;
    use listmonk_eb_types::{Component, LogicalId, ResourceKind};

    fn plan_with(protected: bool) -> Plan {
        let mut plan = Plan::new(&params());
        let db = Resource::new(LogicalId::new("Db"), ResourceKind::DbCluster, Component::DataCluster)
            .set("DeletionProtection", protected);
        plan.absorb(Fragment::new((), vec![db])).unwrap();
        plan
    }

    #[test]
    fn protected_cluster_blocks_teardown() {
        let err = check_teardown(&plan_with(true)).unwrap_err();
        match err {
            PlanError::DeletionProtected(ids) => assert_eq!(ids, vec![LogicalId::new("Db")]),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn unprotected_plan_can_be_torn_down() {
        assert!(check_teardown(&plan_with(false)).is_ok());
    }

    #[test]
    fn diff_dropping_protected_cluster_is_refused() {
        let previous = plan_with(true);
        let next = Plan::new(&params());
        let diff = PlanDiff::between(&previous, &next).unwrap();
        assert!(matches!(check_changes(&diff), Err(PlanError::DeletionProtected(_))));
    }
}
