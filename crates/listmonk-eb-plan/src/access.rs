//! Access policy builder
//!
//! Three boundaries, one security group each:
//!
//! | Boundary    | Inbound                         |
//! |-------------|---------------------------------|
//! | edge        | any IPv4 on TCP 80 and 443      |
//! | application | edge on TCP 80                  |
//! | data        | application on the database port|
//!
//! All boundaries allow every outbound connection. Rules only ever get added;
//! adding a rule that already exists is a no-op.

use crate::error::{PlanError, Result};
use crate::network::NetworkTopology;
use crate::plan::Fragment;
use listmonk_eb_types::{
    Component, IngressRule, LogicalId, Peer, Port, Properties, Property, ResolvedParameters,
    Resource, ResourceKind, Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

/// Which tier a boundary guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Edge,
    Application,
    Data,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edge => write!(f, "edge"),
            Self::Application => write!(f, "application"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// A security group and the inbound rules it enforces.
///
/// Rules are fixed once the boundary is built; outside this crate they can
/// only be read.
///
/// ```compile_fail
/// use listmonk_eb_plan::AccessBoundary;
/// use listmonk_eb_types::{IngressRule, Peer, Port};
///
/// fn widen(boundary: &mut AccessBoundary) {
///     let _ = boundary.allow_from(IngressRule {
///         peer: Peer::AnyIpv4,
///         port: Port::HTTP,
///         description: "late".into(),
///     });
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AccessBoundary {
    pub tier: Tier,
    pub security_group: LogicalId,
    pub name: String,
    pub description: String,
    rules: Vec<IngressRule>,
    ingress_resources: Vec<LogicalId>,
}

impl AccessBoundary {
    fn new(tier: Tier, root: &str, name: String, description: String) -> Self {
        Self {
            tier,
            security_group: LogicalId::from_path(&[root, "Resource"]),
            name,
            description,
            rules: Vec::new(),
            ingress_resources: Vec::new(),
        }
    }

    /// Add an inbound rule.
    ///
    /// Returns `false` when the same peer and port are already allowed. Only
    /// the edge boundary may accept traffic from any address.
    pub(crate) fn allow_from(&mut self, rule: IngressRule) -> Result<bool> {
        if rule.peer.is_open() && self.tier != Tier::Edge {
            return Err(PlanError::OpenIngress {
                boundary: self.name.clone(),
            });
        }
        if self.rules.iter().any(|r| r.same_as(&rule)) {
            debug!(boundary = %self.name, peer = %rule.peer, port = %rule.port, "Rule already present");
            return Ok(false);
        }
        self.rules.push(rule);
        Ok(true)
    }

    pub fn rules(&self) -> &[IngressRule] {
        &self.rules
    }

    /// Security group id, for attaching compute or load balancers
    pub fn group_id(&self) -> Value {
        Value::attribute(&self.security_group, "GroupId")
    }

    /// Resources a consumer must wait for before relying on this boundary:
    /// the group itself and every standalone ingress rule.
    pub fn ready_ids(&self) -> Vec<&LogicalId> {
        std::iter::once(&self.security_group)
            .chain(self.ingress_resources.iter())
            .collect()
    }

    fn group_resource(&self, network: &NetworkTopology) -> Resource {
        let inline: Vec<Property> = self
            .rules
            .iter()
            .filter(|r| r.peer.is_open())
            .map(|r| {
                Properties::new()
                    .with("CidrIp", Peer::ANY_IPV4_CIDR)
                    .with("Description", r.description.as_str())
                    .with("FromPort", r.port.number())
                    .with("IpProtocol", "tcp")
                    .with("ToPort", r.port.number())
                    .into()
            })
            .collect();

        let group = Resource::new(
            self.security_group.clone(),
            ResourceKind::SecurityGroup,
            Component::AccessPolicy,
        )
        .set("GroupDescription", self.description.as_str())
        .set("GroupName", self.name.as_str())
        .set("VpcId", network.vpc_id())
        .set(
            "SecurityGroupEgress",
            Property::list([Properties::new()
                .with("CidrIp", Peer::ANY_IPV4_CIDR)
                .with("Description", "Allow all outbound traffic by default")
                .with("IpProtocol", "-1")]),
        );
        if inline.is_empty() {
            group
        } else {
            group.set("SecurityGroupIngress", Property::List(inline))
        }
    }

    /// Standalone ingress resources for rules whose peer is another boundary
    fn peer_ingress(&mut self, peers: &[&AccessBoundary]) -> Vec<Resource> {
        let mut resources = Vec::new();
        for rule in &self.rules {
            let Peer::Boundary(source) = &rule.peer else {
                continue;
            };
            let source_name = peers
                .iter()
                .find(|b| &b.security_group == source)
                .map_or(source.as_str(), |b| b.name.as_str());
            let id = LogicalId::from_path(&[
                self.security_group.as_str(),
                &format!("from {source_name}:{}", rule.port.number()),
            ]);
            resources.push(
                Resource::new(id.clone(), ResourceKind::SecurityGroupIngress, Component::AccessPolicy)
                    .set("GroupId", self.group_id())
                    .set("SourceSecurityGroupId", Value::attribute(source, "GroupId"))
                    .set("Description", rule.description.as_str())
                    .set("FromPort", rule.port.number())
                    .set("IpProtocol", "tcp")
                    .set("ToPort", rule.port.number()),
            );
            self.ingress_resources.push(id);
        }
        resources
    }
}

/// The three boundaries of the deployment
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub edge: AccessBoundary,
    pub application: AccessBoundary,
    pub data: AccessBoundary,
}

/// Declare the three security groups and the rules between them.
#[instrument(skip_all, fields(prefix = %params.prefix))]
pub fn build(params: &ResolvedParameters, network: &NetworkTopology) -> Result<Fragment<AccessPolicy>> {
    let prefix = params.prefix.as_str();

    let mut application = AccessBoundary::new(
        Tier::Application,
        &format!("{prefix}-AppSg"),
        format!("{prefix}-app-sg"),
        format!("{prefix} EB instances"),
    );
    let mut edge = AccessBoundary::new(
        Tier::Edge,
        &format!("{prefix}-LbSg"),
        format!("{prefix}-alb-sg"),
        format!("{prefix} ALB"),
    );
    let mut data = AccessBoundary::new(
        Tier::Data,
        &format!("{prefix}-DbSg"),
        format!("{prefix}-db-sg"),
        format!("{prefix} Aurora PostgreSQL"),
    );

    edge.allow_from(IngressRule {
        peer: Peer::AnyIpv4,
        port: Port::HTTP,
        description: format!("{prefix} HTTP"),
    })?;
    edge.allow_from(IngressRule {
        peer: Peer::AnyIpv4,
        port: Port::HTTPS,
        description: format!("{prefix} HTTPS"),
    })?;
    application.allow_from(IngressRule {
        peer: Peer::Boundary(edge.security_group.clone()),
        port: Port::HTTP,
        description: format!("{prefix} ALB to EC2:80"),
    })?;
    data.allow_from(IngressRule {
        peer: Peer::Boundary(application.security_group.clone()),
        port: Port::POSTGRES,
        description: format!("{prefix} App to Postgres"),
    })?;
    // The cluster's own default-port allowance lands on the same rule.
    data.allow_from(IngressRule {
        peer: Peer::Boundary(application.security_group.clone()),
        port: Port::POSTGRES,
        description: format!("{prefix} App access"),
    })?;

    // Groups first: peer rules point at the group on the other side.
    let mut resources = vec![
        application.group_resource(network),
        edge.group_resource(network),
        data.group_resource(network),
    ];
    resources.extend(application.peer_ingress(&[&edge]));
    resources.extend(data.peer_ingress(&[&application]));

    info!(
        edge_rules = edge.rules().len(),
        application_rules = application.rules().len(),
        data_rules = data.rules().len(),
        resources = resources.len(),
        "Access boundaries declared"
    );

    Ok(Fragment::new(
        AccessPolicy {
            edge,
            application,
            data,
        },
        resources,
    ))
}
