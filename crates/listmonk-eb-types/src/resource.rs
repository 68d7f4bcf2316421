//! Resource descriptors
//!
//! A [`Resource`] is one declared piece of infrastructure. It is resolved once
//! during plan construction and never mutated by the plan afterwards.

use crate::{LogicalId, Properties, Property};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Every resource type a plan can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Vpc,
    Subnet,
    RouteTable,
    SubnetRouteTableAssociation,
    Route,
    InternetGateway,
    VpcGatewayAttachment,
    ElasticIp,
    NatGateway,
    SecurityGroup,
    SecurityGroupIngress,
    Secret,
    SecretTargetAttachment,
    DbSubnetGroup,
    DbCluster,
    DbInstance,
    Role,
    InstanceProfile,
    Application,
    ApplicationVersion,
    Environment,
}

impl ResourceKind {
    /// Provider type name used in rendered templates
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::Route => "AWS::EC2::Route",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::VpcGatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::ElasticIp => "AWS::EC2::EIP",
            Self::NatGateway => "AWS::EC2::NatGateway",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::Secret => "AWS::SecretsManager::Secret",
            Self::SecretTargetAttachment => "AWS::SecretsManager::SecretTargetAttachment",
            Self::DbSubnetGroup => "AWS::RDS::DBSubnetGroup",
            Self::DbCluster => "AWS::RDS::DBCluster",
            Self::DbInstance => "AWS::RDS::DBInstance",
            Self::Role => "AWS::IAM::Role",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
            Self::Application => "AWS::ElasticBeanstalk::Application",
            Self::ApplicationVersion => "AWS::ElasticBeanstalk::ApplicationVersion",
            Self::Environment => "AWS::ElasticBeanstalk::Environment",
        }
    }

    /// Properties whose change forces the provider to create a new resource
    /// instead of updating the existing one.
    pub fn replacement_properties(&self) -> &'static [&'static str] {
        match self {
            Self::Vpc => &["CidrBlock", "InstanceTenancy"],
            Self::Subnet => &["AvailabilityZone", "CidrBlock", "VpcId"],
            Self::RouteTable => &["VpcId"],
            Self::SubnetRouteTableAssociation => &["SubnetId"],
            Self::Route => &["DestinationCidrBlock", "RouteTableId"],
            Self::InternetGateway | Self::VpcGatewayAttachment => &[],
            Self::ElasticIp => &["Domain"],
            Self::NatGateway => &["AllocationId", "SubnetId"],
            Self::SecurityGroup => &["GroupDescription", "GroupName", "VpcId"],
            Self::SecurityGroupIngress => &[
                "FromPort",
                "GroupId",
                "IpProtocol",
                "SourceSecurityGroupId",
                "ToPort",
            ],
            Self::Secret => &["Name"],
            Self::SecretTargetAttachment => &["SecretId"],
            Self::DbSubnetGroup => &["DBSubnetGroupName"],
            Self::DbCluster => &[
                "DBClusterIdentifier",
                "DBSubnetGroupName",
                "DatabaseName",
                "Engine",
                "StorageEncrypted",
            ],
            Self::DbInstance => &["DBClusterIdentifier", "DBInstanceIdentifier"],
            Self::Role => &["Path", "RoleName"],
            Self::InstanceProfile => &["InstanceProfileName", "Path"],
            Self::Application => &["ApplicationName"],
            Self::ApplicationVersion => &[],
            Self::Environment => &["ApplicationName", "CNAMEPrefix", "EnvironmentName", "Tier"],
        }
    }

    /// Kinds that can never be updated in place; any change is a replacement.
    pub fn is_immutable(&self) -> bool {
        matches!(self, Self::ApplicationVersion)
    }

    pub fn requires_replacement(&self, property: &str) -> bool {
        self.is_immutable() || self.replacement_properties().contains(&property)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// The builder that owns a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Component {
    Network,
    AccessPolicy,
    Credential,
    DataCluster,
    Identity,
    Artifact,
    Environment,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::AccessPolicy => "access-policy",
            Self::Credential => "credential",
            Self::DataCluster => "data-cluster",
            Self::Identity => "identity",
            Self::Artifact => "artifact",
            Self::Environment => "environment",
        };
        f.write_str(name)
    }
}

/// What the provider does with the physical resource when it leaves the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

impl DeletionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }
}

/// One declared resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Logical id, unique within a plan
    pub id: LogicalId,

    /// Resource type
    pub kind: ResourceKind,

    /// Owning builder
    pub component: Component,

    properties: Properties,

    depends_on: BTreeSet<LogicalId>,

    /// Policy applied when the resource is removed from the plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,

    /// Policy applied to the old resource when it is replaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl Resource {
    pub fn new(id: LogicalId, kind: ResourceKind, component: Component) -> Self {
        Self {
            id,
            kind,
            component,
            properties: Properties::new(),
            depends_on: BTreeSet::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    /// Set a property.
    ///
    /// Every resource the value points at becomes a declared dependency of
    /// this resource.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        let value = value.into();
        value.collect_references(&mut self.depends_on);
        self.properties.insert(key, value);
        self
    }

    /// Declare an ordering edge that no property expresses.
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        self.depends_on.insert(id.clone());
        self
    }

    /// Apply the same policy on deletion and on replacement.
    pub fn retain_with(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    pub fn dependencies(&self) -> &BTreeSet<LogicalId> {
        &self.depends_on
    }

    /// Resources referenced from properties
    pub fn referenced(&self) -> BTreeSet<LogicalId> {
        let mut out = BTreeSet::new();
        self.properties.collect_references(&mut out);
        out
    }

    /// References that are not backed by a declared edge
    pub fn undeclared_references(&self) -> Vec<LogicalId> {
        self.referenced()
            .into_iter()
            .filter(|id| !self.depends_on.contains(id))
            .collect()
    }

    /// Whether the provider must refuse to delete this resource
    pub fn is_deletion_protected(&self) -> bool {
        self.property("DeletionProtection")
            .and_then(Property::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn set_declares_edges_for_references() {
        let vpc = LogicalId::new("Vpc");
        let subnet = Resource::new(LogicalId::new("Subnet"), ResourceKind::Subnet, Component::Network)
            .set("VpcId", Value::reference(&vpc))
            .set("CidrBlock", "10.0.0.0/18");
        assert!(subnet.dependencies().contains(&vpc));
        assert!(subnet.undeclared_references().is_empty());
    }

    #[test]
    fn explicit_edges_need_no_property() {
        let app = LogicalId::new("App");
        let version = Resource::new(
            LogicalId::new("Version"),
            ResourceKind::ApplicationVersion,
            Component::Environment,
        )
        .depends_on(&app);
        assert!(version.dependencies().contains(&app));
        assert!(version.referenced().is_empty());
    }

    #[test]
    fn application_version_is_immutable() {
        assert!(ResourceKind::ApplicationVersion.requires_replacement("Description"));
        assert!(!ResourceKind::Environment.requires_replacement("OptionSettings"));
        assert!(ResourceKind::Environment.requires_replacement("EnvironmentName"));
    }

    #[test]
    fn deletion_protection_read_from_properties() {
        let cluster = Resource::new(LogicalId::new("Db"), ResourceKind::DbCluster, Component::DataCluster)
            .set("DeletionProtection", true);
        assert!(cluster.is_deletion_protected());

        let sg = Resource::new(LogicalId::new("Sg"), ResourceKind::SecurityGroup, Component::AccessPolicy);
        assert!(!sg.is_deletion_protected());
    }

    #[test]
    fn type_names_are_provider_namespaced() {
        assert_eq!(ResourceKind::Vpc.type_name(), "AWS::EC2::VPC");
        assert_eq!(ResourceKind::DbCluster.to_string(), "AWS::RDS::DBCluster");
    }
}
