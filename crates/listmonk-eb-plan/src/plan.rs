//! The plan container
//!
//! A [`Plan`] collects what the component builders declare. Builders never
//! touch the plan directly: each returns a [`Fragment`] (its descriptor plus
//! the resources it declares) and the caller absorbs it. Absorbing checks the
//! structural rules every downstream consumer relies on:
//!
//! - logical ids are unique
//! - a resource only depends on resources already in the plan, so no
//!   component can assume a sibling exists without an edge to it
//! - every reference inside a resource's properties is backed by an edge

use crate::error::{PlanError, Result};
use crate::graph::DependencyGraph;
use listmonk_eb_types::{Component, LogicalId, ResolvedParameters, Resource, ResourceKind, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::debug;

/// What a builder hands back: its descriptor and the resources behind it
#[derive(Debug)]
pub struct Fragment<T> {
    pub descriptor: T,
    pub resources: Vec<Resource>,
    pub grants: Vec<Grant>,
    pub assets: Vec<AssetEntry>,
}

impl<T> Fragment<T> {
    pub fn new(descriptor: T, resources: Vec<Resource>) -> Self {
        Self {
            descriptor,
            resources,
            grants: Vec::new(),
            assets: Vec::new(),
        }
    }

    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    pub fn with_asset(mut self, asset: AssetEntry) -> Self {
        self.assets.push(asset);
        self
    }
}

/// Read access granted to a service principal on stored objects
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub principal: String,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

/// A local file set the external uploader must place in storage
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetEntry {
    pub source: PathBuf,
    pub digest: String,
    pub bucket: String,
    pub key: String,
}

/// A value surfaced to operators after apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    pub value: Value,
    pub description: String,
}

/// Every resource, output, grant and asset of one deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub stack_name: String,
    pub account: String,
    pub region: String,
    resources: Vec<Resource>,
    outputs: Vec<Output>,
    grants: BTreeSet<Grant>,
    assets: BTreeSet<AssetEntry>,
    #[serde(skip)]
    index: HashMap<LogicalId, usize>,
}

impl Plan {
    pub fn new(params: &ResolvedParameters) -> Self {
        Self {
            stack_name: params.stack_name.clone(),
            account: params.account.clone(),
            region: params.region.clone(),
            resources: Vec::new(),
            outputs: Vec::new(),
            grants: BTreeSet::new(),
            assets: BTreeSet::new(),
            index: HashMap::new(),
        }
    }

    /// Take in a builder's fragment and return its descriptor.
    pub fn absorb<T>(&mut self, fragment: Fragment<T>) -> Result<T> {
        for resource in fragment.resources {
            self.insert(resource)?;
        }
        for grant in fragment.grants {
            self.grant(grant);
        }
        self.assets.extend(fragment.assets);
        Ok(fragment.descriptor)
    }

    fn insert(&mut self, resource: Resource) -> Result<()> {
        if self.index.contains_key(&resource.id) {
            return Err(PlanError::DuplicateResource(resource.id));
        }
        if let Some(missing) = resource
            .dependencies()
            .iter()
            .find(|dep| !self.index.contains_key(*dep))
        {
            return Err(PlanError::DanglingDependency {
                resource: resource.id.clone(),
                missing: missing.clone(),
            });
        }
        if let Some(target) = resource.undeclared_references().into_iter().next() {
            return Err(PlanError::UndeclaredDependency {
                resource: resource.id,
                target,
            });
        }

        debug!(
            id = %resource.id,
            kind = %resource.kind,
            component = %resource.component,
            dependencies = resource.dependencies().len(),
            "Resource declared"
        );
        self.index.insert(resource.id.clone(), self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    /// Record a grant. Returns `false` if the same grant was already present.
    pub fn grant(&mut self, grant: Grant) -> bool {
        self.grants.insert(grant)
    }

    /// Surface a value to operators.
    ///
    /// Outputs may point at resources but never at secret material.
    pub fn add_output(&mut self, output: Output) -> Result<()> {
        if output.value.contains_secret() {
            return Err(PlanError::SecretInOutput(output.name));
        }
        if self.outputs.iter().any(|o| o.name == output.name) {
            return Err(PlanError::DuplicateOutput(output.name));
        }
        if let Some(missing) = output
            .value
            .references()
            .into_iter()
            .find(|id| !self.index.contains_key(id))
        {
            return Err(PlanError::DanglingDependency {
                resource: LogicalId::new(output.name),
                missing,
            });
        }
        self.outputs.push(output);
        Ok(())
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, id: &LogicalId) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    /// Declaration position of a resource
    pub fn position(&self, id: &LogicalId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &LogicalId) -> bool {
        self.index.contains_key(id)
    }

    pub fn by_component(&self, component: Component) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.component == component)
    }

    pub fn by_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn grants(&self) -> &BTreeSet<Grant> {
        &self.grants
    }

    pub fn assets(&self) -> &BTreeSet<AssetEntry> {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Re-check every structural rule on a plan that did not come through
    /// [`Plan::absorb`] (for example one loaded from disk).
    pub fn validate(&self) -> Result<()> {
        for resource in &self.resources {
            for dep in resource.dependencies() {
                if !self.index.contains_key(dep) {
                    return Err(PlanError::DanglingDependency {
                        resource: resource.id.clone(),
                        missing: dep.clone(),
                    });
                }
            }
            if let Some(target) = resource.undeclared_references().into_iter().next() {
                return Err(PlanError::UndeclaredDependency {
                    resource: resource.id.clone(),
                    target,
                });
            }
        }
        for output in &self.outputs {
            if output.value.contains_secret() {
                return Err(PlanError::SecretInOutput(output.name.clone()));
            }
        }
        DependencyGraph::build(self)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a saved plan, rebuilding the index and validating it.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut plan: Plan = serde_json::from_str(json)?;
        plan.index.clear();
        for (i, resource) in plan.resources.iter().enumerate() {
            if plan.index.insert(resource.id.clone(), i).is_some() {
                return Err(PlanError::DuplicateResource(resource.id.clone()));
            }
        }
        plan.validate()?;
        Ok(plan)
    }
}
