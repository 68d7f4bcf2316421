//! Execution identities for the hosting environment
//!
//! Two roles with disjoint trust: the orchestration role can only be assumed
//! by the hosting service, the runtime role only by compute instances. The
//! capability grants come from a closed set of managed policies and are
//! append-only.

use crate::error::Result;
use crate::plan::Fragment;
use listmonk_eb_types::{
    Component, LogicalId, Partition, Properties, Property, ResolvedParameters, Resource,
    ResourceKind, Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

/// Service allowed to assume a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServicePrincipal {
    /// The environment-orchestration service
    Orchestration,
    /// Compute instances
    Compute,
}

impl ServicePrincipal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orchestration => "elasticbeanstalk.amazonaws.com",
            Self::Compute => "ec2.amazonaws.com",
        }
    }
}

impl fmt::Display for ServicePrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-managed capability bundles a role may be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagedPolicy {
    /// Read enhanced health signals
    EnhancedHealth,
    /// Remote session management
    SessionManagement,
    /// Web-tier operational bundle
    WebTier,
}

impl ManagedPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnhancedHealth => "service-role/AWSElasticBeanstalkEnhancedHealth",
            Self::SessionManagement => "AmazonSSMManagedInstanceCore",
            Self::WebTier => "AWSElasticBeanstalkWebTier",
        }
    }

    pub fn arn(&self, partition: Partition) -> String {
        format!("arn:{partition}:iam::aws:policy/{}", self.name())
    }
}

/// One role and what it may do
#[derive(Debug, Clone)]
pub struct Identity {
    pub role: LogicalId,
    pub role_name: String,
    pub principal: ServicePrincipal,
    grants: Vec<ManagedPolicy>,
}

impl Identity {
    fn new(role: LogicalId, role_name: String, principal: ServicePrincipal) -> Self {
        Self {
            role,
            role_name,
            principal,
            grants: Vec::new(),
        }
    }

    /// Grant a capability. Returns `false` if it was already granted.
    pub fn grant(&mut self, policy: ManagedPolicy) -> bool {
        if self.grants.contains(&policy) {
            return false;
        }
        self.grants.push(policy);
        true
    }

    pub fn grants(&self) -> &[ManagedPolicy] {
        &self.grants
    }

    pub fn role_arn(&self) -> Value {
        Value::attribute(&self.role, "Arn")
    }

    fn role_resource(&self, partition: Partition) -> Resource {
        let trust = Properties::new()
            .with(
                "Statement",
                Property::list([Properties::new()
                    .with("Action", "sts:AssumeRole")
                    .with("Effect", "Allow")
                    .with(
                        "Principal",
                        Properties::new().with("Service", self.principal.as_str()),
                    )]),
            )
            .with("Version", "2012-10-17");

        Resource::new(self.role.clone(), ResourceKind::Role, Component::Identity)
            .set("AssumeRolePolicyDocument", trust)
            .set(
                "ManagedPolicyArns",
                Property::list(self.grants.iter().map(|p| p.arn(partition))),
            )
            .set("RoleName", self.role_name.as_str())
    }
}

/// Orchestration and runtime identities
#[derive(Debug, Clone)]
pub struct IdentityPair {
    pub orchestration: Identity,
    pub runtime: Identity,
    /// Wraps the runtime role; the orchestration role has none
    pub instance_profile: LogicalId,
}

impl IdentityPair {
    /// Profile reference for attaching the runtime role to compute
    pub fn runtime_profile(&self) -> Value {
        Value::reference(&self.instance_profile)
    }
}

#[instrument(skip_all, fields(prefix = %params.prefix))]
pub fn build(params: &ResolvedParameters) -> Result<Fragment<IdentityPair>> {
    let prefix = params.prefix.as_str();

    let mut orchestration = Identity::new(
        LogicalId::from_path(&[&format!("{prefix}-EbServiceRole"), "Resource"]),
        format!("{prefix}-eb-service-role"),
        ServicePrincipal::Orchestration,
    );
    orchestration.grant(ManagedPolicy::EnhancedHealth);

    let mut runtime = Identity::new(
        LogicalId::from_path(&[&format!("{prefix}-EbEc2Role"), "Resource"]),
        format!("{prefix}-eb-ec2-role"),
        ServicePrincipal::Compute,
    );
    runtime.grant(ManagedPolicy::SessionManagement);
    runtime.grant(ManagedPolicy::WebTier);

    // Only the runtime role is ever attached to compute.
    let instance_profile = LogicalId::from_path(&[&format!("{prefix}-EbInstanceProfile")]);

    let resources = vec![
        orchestration.role_resource(params.partition),
        runtime.role_resource(params.partition),
        Resource::new(instance_profile.clone(), ResourceKind::InstanceProfile, Component::Identity)
            .set("Roles", Property::list([Value::reference(&runtime.role)])),
    ];

    for identity in [&orchestration, &runtime] {
        debug!(
            role = %identity.role_name,
            principal = %identity.principal,
            grants = identity.grants().len(),
            "Identity declared"
        );
    }
    info!(resources = resources.len(), "Identities declared");

    Ok(Fragment::new(
        IdentityPair {
            orchestration,
            runtime,
            instance_profile,
        },
        resources,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::params;

    fn trusted_service(role: &Resource) -> Option<Property> {
        let Some(Property::Map(doc)) = role.property("AssumeRolePolicyDocument") else {
            return None;
        };
        let Some(Property::List(statements)) = doc.get("Statement") else {
            return None;
        };
        let Property::Map(statement) = &statements[0] else {
            return None;
        };
        let Some(Property::Map(principal)) = statement.get("Principal") else {
            return None;
        };
        principal.get("Service").cloned()
    }

    #[test]
    fn roles_trust_one_service_each() {
        let fragment = build(&params()).unwrap();
        let roles: Vec<_> = fragment
            .resources
            .iter()
            .filter(|r| r.kind == ResourceKind::Role)
            .collect();
        assert_eq!(roles.len(), 2);
        assert_eq!(
            trusted_service(roles[0]),
            Some(Property::from("elasticbeanstalk.amazonaws.com"))
        );
        assert_eq!(trusted_service(roles[1]), Some(Property::from("ec2.amazonaws.com")));
    }

    #[test]
    fn grants_are_least_privilege() {
        let pair = build(&params()).unwrap().descriptor;
        assert_eq!(pair.orchestration.grants(), &[ManagedPolicy::EnhancedHealth]);
        assert_eq!(
            pair.runtime.grants(),
            &[ManagedPolicy::SessionManagement, ManagedPolicy::WebTier]
        );
    }

    #[test]
    fn grants_are_append_only_and_deduplicated() {
        let mut pair = build(&params()).unwrap().descriptor;
        assert!(!pair.runtime.grant(ManagedPolicy::WebTier));
        assert_eq!(pair.runtime.grants().len(), 2);
    }

    #[test]
    fn only_runtime_gets_a_profile() {
        let fragment = build(&params()).unwrap();
        let pair = &fragment.descriptor;
        let profiles: Vec<_> = fragment
            .resources
            .iter()
            .filter(|r| r.kind == ResourceKind::InstanceProfile)
            .collect();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, pair.instance_profile);
        assert_eq!(
            profiles[0].property("Roles"),
            Some(&Property::list([Value::reference(&pair.runtime.role)]))
        );
    }

    #[test]
    fn policy_arns_follow_partition() {
        assert_eq!(
            ManagedPolicy::EnhancedHealth.arn(Partition::Aws),
            "arn:aws:iam::aws:policy/service-role/AWSElasticBeanstalkEnhancedHealth"
        );
        assert_eq!(
            ManagedPolicy::WebTier.arn(Partition::AwsCn),
            "arn:aws-cn:iam::aws:policy/AWSElasticBeanstalkWebTier"
        );
    }
}
