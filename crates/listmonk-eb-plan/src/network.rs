//! Network topology builder
//!
//! One public and one private-with-egress subnet per availability zone,
//! carved evenly out of the VPC block (public subnets first). Private subnets
//! reach the internet through a small number of shared NAT gateways that sit
//! in the public subnets.

use crate::error::Result;
use crate::plan::Fragment;
use crate::tags;
use listmonk_eb_types::{
    Component, Ipv4Cidr, LogicalId, ParameterError, Peer, ResolvedParameters, Resource,
    ResourceKind, SubnetType, Value,
};
use tracing::{debug, info, instrument};

/// One declared subnet and its routing
#[derive(Debug, Clone, PartialEq)]
pub struct SubnetRef {
    pub id: LogicalId,
    pub subnet_type: SubnetType,
    pub availability_zone: String,
    pub cidr: Ipv4Cidr,
    pub route_table: LogicalId,
}

/// The network every other component is placed into
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    pub vpc: LogicalId,
    pub cidr: Ipv4Cidr,
    pub availability_zones: Vec<String>,
    pub internet_gateway: LogicalId,
    pub gateway_attachment: LogicalId,
    pub nat_gateways: Vec<LogicalId>,
    subnets: Vec<SubnetRef>,
}

impl NetworkTopology {
    pub fn vpc_id(&self) -> Value {
        Value::reference(&self.vpc)
    }

    /// Subnets of one type, in zone order
    pub fn select(&self, subnet_type: SubnetType) -> impl Iterator<Item = &SubnetRef> {
        self.subnets
            .iter()
            .filter(move |s| s.subnet_type == subnet_type)
    }

    /// Comma-separated subnet ids of one type
    pub fn subnet_ids(&self, subnet_type: SubnetType) -> Value {
        Value::join(
            ",",
            self.select(subnet_type)
                .map(|s| Value::reference(&s.id))
                .collect(),
        )
    }

    /// Individual subnet id references of one type
    pub fn subnet_refs(&self, subnet_type: SubnetType) -> Vec<Value> {
        self.select(subnet_type)
            .map(|s| Value::reference(&s.id))
            .collect()
    }

    pub fn subnets(&self) -> &[SubnetRef] {
        &self.subnets
    }

    /// NAT gateway that a private subnet in zone `index` routes through
    pub fn egress_gateway_for(&self, index: usize) -> Option<&LogicalId> {
        egress_gateway(&self.nat_gateways, index)
    }
}

/// Zones share gateways round-robin.
fn egress_gateway(nat_gateways: &[LogicalId], index: usize) -> Option<&LogicalId> {
    if nat_gateways.is_empty() {
        return None;
    }
    nat_gateways.get(index % nat_gateways.len())
}

/// Declare the VPC, its subnets, routing and NAT gateways.
#[instrument(skip_all, fields(prefix = %params.prefix, cidr = %params.network.cidr))]
pub fn build(params: &ResolvedParameters) -> Result<Fragment<NetworkTopology>> {
    let settings = &params.network;
    let zones = &settings.availability_zones;
    let root = format!("{}-Vpc", params.prefix);

    let blocks = settings
        .cidr
        .split(zones.len() * 2)
        .map_err(ParameterError::from)?;

    let vpc = LogicalId::from_path(&[&root, "Resource"]);
    let igw = LogicalId::from_path(&[&root, "IGW"]);
    let attachment = LogicalId::from_path(&[&root, "VPCGW"]);

    let mut resources = vec![
        Resource::new(vpc.clone(), ResourceKind::Vpc, Component::Network)
            .set("CidrBlock", settings.cidr.to_string())
            .set("EnableDnsHostnames", true)
            .set("EnableDnsSupport", true)
            .set("InstanceTenancy", "default")
            .set("Tags", tags::name(&root)),
        Resource::new(igw.clone(), ResourceKind::InternetGateway, Component::Network)
            .set("Tags", tags::name(&root)),
        Resource::new(attachment.clone(), ResourceKind::VpcGatewayAttachment, Component::Network)
            .set("VpcId", Value::reference(&vpc))
            .set("InternetGatewayId", Value::reference(&igw)),
    ];

    let mut subnets = Vec::with_capacity(blocks.len());
    let mut public_routes = Vec::with_capacity(zones.len());

    for (i, zone) in zones.iter().enumerate() {
        let name = format!("{}-publicSubnet{}", params.prefix, i + 1);
        let subnet = declare_subnet(
            &mut resources,
            &root,
            &name,
            &vpc,
            SubnetType::Public,
            zone,
            blocks[i],
        );

        let route = LogicalId::from_path(&[&root, &name, "DefaultRoute"]);
        resources.push(
            Resource::new(route.clone(), ResourceKind::Route, Component::Network)
                .set("RouteTableId", Value::reference(&subnet.route_table))
                .set("DestinationCidrBlock", Peer::ANY_IPV4_CIDR)
                .set("GatewayId", Value::reference(&igw))
                .depends_on(&attachment),
        );
        public_routes.push(route);
        subnets.push(subnet);
    }

    let mut nat_gateways = Vec::with_capacity(usize::from(settings.nat_gateways));
    for i in 0..usize::from(settings.nat_gateways) {
        let public = &subnets[i];
        let name = format!("{}-publicSubnet{}", params.prefix, i + 1);
        let eip = LogicalId::from_path(&[&root, &name, "EIP"]);
        let nat = LogicalId::from_path(&[&root, &name, "NATGateway"]);

        resources.push(
            Resource::new(eip.clone(), ResourceKind::ElasticIp, Component::Network)
                .set("Domain", "vpc")
                .set("Tags", tags::name(&format!("{root}/{name}"))),
        );
        resources.push(
            Resource::new(nat.clone(), ResourceKind::NatGateway, Component::Network)
                .set("SubnetId", Value::reference(&public.id))
                .set("AllocationId", Value::attribute(&eip, "AllocationId"))
                .set("Tags", tags::name(&format!("{root}/{name}")))
                .depends_on(&public_routes[i]),
        );
        nat_gateways.push(nat);
    }

    for (i, zone) in zones.iter().enumerate() {
        let name = format!("{}-private-egressSubnet{}", params.prefix, i + 1);
        let subnet = declare_subnet(
            &mut resources,
            &root,
            &name,
            &vpc,
            SubnetType::PrivateWithEgress,
            zone,
            blocks[zones.len() + i],
        );

        let nat = egress_gateway(&nat_gateways, i).ok_or_else(|| ParameterError::Invalid {
            name: "nat_gateways",
            reason: "private subnets need at least one NAT gateway".into(),
        })?;
        resources.push(
            Resource::new(
                LogicalId::from_path(&[&root, &name, "DefaultRoute"]),
                ResourceKind::Route,
                Component::Network,
            )
            .set("RouteTableId", Value::reference(&subnet.route_table))
            .set("DestinationCidrBlock", Peer::ANY_IPV4_CIDR)
            .set("NatGatewayId", Value::reference(nat)),
        );
        subnets.push(subnet);
    }

    info!(
        zones = zones.len(),
        subnets = subnets.len(),
        nat_gateways = nat_gateways.len(),
        resources = resources.len(),
        "Network topology declared"
    );

    Ok(Fragment::new(
        NetworkTopology {
            vpc,
            cidr: settings.cidr,
            availability_zones: zones.clone(),
            internet_gateway: igw,
            gateway_attachment: attachment,
            nat_gateways,
            subnets,
        },
        resources,
    ))
}

fn declare_subnet(
    resources: &mut Vec<Resource>,
    root: &str,
    name: &str,
    vpc: &LogicalId,
    subnet_type: SubnetType,
    zone: &str,
    cidr: Ipv4Cidr,
) -> SubnetRef {
    let id = LogicalId::from_path(&[root, name, "Subnet"]);
    let route_table = LogicalId::from_path(&[root, name, "RouteTable"]);
    let association = LogicalId::from_path(&[root, name, "RouteTableAssociation"]);
    let path = format!("{root}/{name}");

    resources.push(
        Resource::new(id.clone(), ResourceKind::Subnet, Component::Network)
            .set("VpcId", Value::reference(vpc))
            .set("AvailabilityZone", zone)
            .set("CidrBlock", cidr.to_string())
            .set("MapPublicIpOnLaunch", subnet_type == SubnetType::Public)
            .set("Tags", tags::subnet(&path, subnet_type)),
    );
    resources.push(
        Resource::new(route_table.clone(), ResourceKind::RouteTable, Component::Network)
            .set("VpcId", Value::reference(vpc))
            .set("Tags", tags::name(&path)),
    );
    resources.push(
        Resource::new(
            association,
            ResourceKind::SubnetRouteTableAssociation,
            Component::Network,
        )
        .set("RouteTableId", Value::reference(&route_table))
        .set("SubnetId", Value::reference(&id)),
    );

    debug!(subnet = %id, %zone, %cidr, kind = subnet_type.label(), "Subnet declared");

    SubnetRef {
        id,
        subnet_type,
        availability_zone: zone.to_string(),
        cidr,
        route_table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::params;
    use listmonk_eb_types::{Property, StackParameters};

    fn topology(p: &ResolvedParameters) -> (NetworkTopology, Vec<Resource>) {
        let fragment = build(p).unwrap();
        (fragment.descriptor, fragment.resources)
    }

    fn route_target<'a>(resources: &'a [Resource], table: &LogicalId) -> &'a Resource {
        resources
            .iter()
            .find(|r| {
                r.kind == ResourceKind::Route
                    && r.property("RouteTableId") == Some(&Property::from(Value::reference(table)))
            })
            .unwrap()
    }

    #[test]
    fn one_public_and_one_private_subnet_per_zone() {
        let (net, _) = topology(&params());
        assert_eq!(net.select(SubnetType::Public).count(), 2);
        assert_eq!(net.select(SubnetType::PrivateWithEgress).count(), 2);
        assert_eq!(net.nat_gateways.len(), 1);
    }

    #[test]
    fn blocks_are_carved_public_first() {
        let (net, _) = topology(&params());
        let cidrs: Vec<String> = net.subnets().iter().map(|s| s.cidr.to_string()).collect();
        assert_eq!(
            cidrs,
            vec!["10.0.0.0/18", "10.0.64.0/18", "10.0.128.0/18", "10.0.192.0/18"]
        );
        assert_eq!(net.subnets()[0].subnet_type, SubnetType::Public);
        assert_eq!(net.subnets()[2].subnet_type, SubnetType::PrivateWithEgress);
    }

    #[test]
    fn private_subnets_share_the_single_gateway() {
        let (net, resources) = topology(&params());
        let nat = Property::from(Value::reference(&net.nat_gateways[0]));
        for subnet in net.select(SubnetType::PrivateWithEgress) {
            let route = route_target(&resources, &subnet.route_table);
            assert_eq!(route.property("NatGatewayId"), Some(&nat));
        }
    }

    #[test]
    fn private_subnets_spread_over_several_gateways() {
        let p = StackParameters {
            max_azs: Some(3),
            nat_gateways: Some(2),
            ..crate::testing::stack_parameters()
        }
        .resolve()
        .unwrap();
        let (net, resources) = topology(&p);
        let targets: Vec<_> = net
            .select(SubnetType::PrivateWithEgress)
            .map(|s| route_target(&resources, &s.route_table).property("NatGatewayId").cloned())
            .collect();
        assert_eq!(targets[0], Some(Property::from(Value::reference(&net.nat_gateways[0]))));
        assert_eq!(targets[1], Some(Property::from(Value::reference(&net.nat_gateways[1]))));
        assert_eq!(targets[2], targets[0]);
        for (i, target) in targets.iter().enumerate() {
            let expected = net.egress_gateway_for(i).map(|id| Property::from(Value::reference(id)));
            assert_eq!(target, &expected);
        }
    }

    #[test]
    fn no_gateway_means_no_egress() {
        assert_eq!(egress_gateway(&[], 0), None);
    }

    #[test]
    fn public_routes_wait_for_the_gateway_attachment() {
        let (net, resources) = topology(&params());
        for subnet in net.select(SubnetType::Public) {
            let route = route_target(&resources, &subnet.route_table);
            assert!(route.dependencies().contains(&net.gateway_attachment));
        }
    }

    #[test]
    fn subnet_ids_join_by_type() {
        let (net, _) = topology(&params());
        let Value::Join { delimiter, parts } = net.subnet_ids(SubnetType::PrivateWithEgress) else {
            panic!("expected join");
        };
        assert_eq!(delimiter, ",");
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0],
            Value::reference(&net.select(SubnetType::PrivateWithEgress).next().unwrap().id)
        );
    }

    #[test]
    fn only_public_subnets_map_public_ips() {
        let (_, resources) = topology(&params());
        let flags: Vec<_> = resources
            .iter()
            .filter(|r| r.kind == ResourceKind::Subnet)
            .map(|r| r.property("MapPublicIpOnLaunch").and_then(Property::as_bool))
            .collect();
        assert_eq!(flags, vec![Some(true), Some(true), Some(false), Some(false)]);
    }
}
