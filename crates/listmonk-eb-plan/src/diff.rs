//! Plan diffing
//!
//! Compares a previously applied plan with a fresh one and classifies what the
//! engine will do with each resource. A changed replacement property (or any
//! change to an immutable kind) means a new physical resource; its new
//! identifier then counts as a change in every property that references it.

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::plan::Plan;
use listmonk_eb_types::{LogicalId, Resource, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What happens to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    Create,
    Update,
    Replace,
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub id: LogicalId,
    pub kind: ResourceKind,
    pub action: ChangeAction,
    /// Properties that differ (or point at a replaced resource)
    pub properties: Vec<String>,
    /// Whether the resource is protected from deletion in the previous plan
    pub protected: bool,
}

/// Changes between two plans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDiff {
    pub changes: Vec<ResourceChange>,
    pub outputs: Vec<String>,
}

impl PlanDiff {
    /// Diff `next` against the `previous` plan.
    pub fn between(previous: &Plan, next: &Plan) -> Result<Self> {
        let graph = DependencyGraph::build(next)?;
        let mut replaced: BTreeSet<LogicalId> = BTreeSet::new();
        let mut changes = Vec::new();

        // Creation order, so replacements are known before their dependents.
        for id in graph.creation_order() {
            let Some(new) = next.resource(id) else {
                continue;
            };
            let Some(old) = previous.resource(id) else {
                changes.push(change(new, ChangeAction::Create, Vec::new(), false));
                continue;
            };

            let changed = changed_properties(old, new, &replaced);
            let policy_changed = old.deletion_policy != new.deletion_policy
                || old.update_replace_policy != new.update_replace_policy;

            let action = if old.kind != new.kind
                || changed.iter().any(|p| new.kind.requires_replacement(p))
            {
                ChangeAction::Replace
            } else if !changed.is_empty() || policy_changed {
                ChangeAction::Update
            } else {
                continue;
            };

            if action == ChangeAction::Replace {
                replaced.insert(id.clone());
            }
            changes.push(change(new, action, changed, old.is_deletion_protected()));
        }

        for old in previous.resources().iter().rev() {
            if !next.contains(&old.id) {
                changes.push(change(old, ChangeAction::Delete, Vec::new(), old.is_deletion_protected()));
            }
        }

        let outputs = previous
            .outputs()
            .iter()
            .map(|o| o.name.as_str())
            .chain(next.outputs().iter().map(|o| o.name.as_str()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|name| previous.output(name) != next.output(name))
            .map(str::to_string)
            .collect();

        Ok(Self { changes, outputs })
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.outputs.is_empty()
    }

    pub fn count(&self, action: ChangeAction) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }

    pub fn with_action(&self, action: ChangeAction) -> impl Iterator<Item = &ResourceChange> {
        self.changes.iter().filter(move |c| c.action == action)
    }

    /// Deletions and replacements the engine would refuse while deletion
    /// protection is on.
    pub fn blocked(&self) -> Vec<&ResourceChange> {
        self.changes
            .iter()
            .filter(|c| c.protected && matches!(c.action, ChangeAction::Delete | ChangeAction::Replace))
            .collect()
    }
}

fn change(resource: &Resource, action: ChangeAction, properties: Vec<String>, protected: bool) -> ResourceChange {
    ResourceChange {
        id: resource.id.clone(),
        kind: resource.kind,
        action,
        properties,
        protected,
    }
}

fn changed_properties(old: &Resource, new: &Resource, replaced: &BTreeSet<LogicalId>) -> Vec<String> {
    let keys: BTreeSet<&String> = old
        .properties()
        .keys()
        .chain(new.properties().keys())
        .collect();

    keys.into_iter()
        .filter(|key| {
            let before = old.property(key);
            let after = new.property(key);
            before != after
                || after.is_some_and(|p| p.references().iter().any(|r| replaced.contains(r)))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Fragment;
    use crate::testing::params;
    use listmonk_eb_types::{Component, Value};

    fn plan(resources: Vec<Resource>) -> Plan {
        let mut plan = Plan::new(&params());
        plan.absorb(Fragment::new((), resources)).unwrap();
        plan
    }

    fn sg(description: &str, tag: &str) -> Vec<Resource> {
        let group = LogicalId::new("Sg");
        vec![
            Resource::new(group.clone(), ResourceKind::SecurityGroup, Component::AccessPolicy)
                .set("GroupDescription", description)
                .set("Tags", tag),
            Resource::new(LogicalId::new("Rule"), ResourceKind::SecurityGroupIngress, Component::AccessPolicy)
                .set("GroupId", Value::attribute(&group, "GroupId"))
                .set("Description", "rule"),
        ]
    }

    #[test]
    fn identical_plans_have_no_changes() {
        let diff = PlanDiff::between(&plan(sg("a", "t")), &plan(sg("a", "t"))).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn non_replacement_property_updates_in_place() {
        let diff = PlanDiff::between(&plan(sg("a", "t1")), &plan(sg("a", "t2"))).unwrap();
        assert_eq!(diff.count(ChangeAction::Update), 1);
        assert_eq!(diff.changes[0].properties, vec!["Tags".to_string()]);
    }

    #[test]
    fn replacement_propagates_to_referencing_resources() {
        let diff = PlanDiff::between(&plan(sg("a", "t")), &plan(sg("b", "t"))).unwrap();
        assert_eq!(diff.count(ChangeAction::Replace), 2);
        let rule = diff.changes.iter().find(|c| c.id.as_str() == "Rule").unwrap();
        assert_eq!(rule.properties, vec!["GroupId".to_string()]);
    }

    #[test]
    fn removed_resources_are_deleted() {
        let mut resources = sg("a", "t");
        resources.pop();
        let diff = PlanDiff::between(&plan(sg("a", "t")), &plan(resources)).unwrap();
        assert_eq!(diff.count(ChangeAction::Delete), 1);
        assert!(diff.blocked().is_empty());
    }

    #[test]
    fn deleting_a_protected_resource_is_blocked() {
        let db = Resource::new(LogicalId::new("Db"), ResourceKind::DbCluster, Component::DataCluster)
            .set("DeletionProtection", true);
        let diff = PlanDiff::between(&plan(vec![db]), &plan(Vec::new())).unwrap();
        let blocked = diff.blocked();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].id.as_str(), "Db");
    }

    #[test]
    fn immutable_kinds_always_replace() {
        let v = |d: &str| {
            vec![Resource::new(LogicalId::new("V"), ResourceKind::ApplicationVersion, Component::Environment)
                .set("Description", d)]
        };
        let diff = PlanDiff::between(&plan(v("one")), &plan(v("two"))).unwrap();
        assert_eq!(diff.count(ChangeAction::Replace), 1);
    }
}
