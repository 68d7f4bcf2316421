//! Network primitives: address blocks, subnet types, ports and traffic peers

use crate::LogicalId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Smallest subnet the provider allows.
const MAX_SUBNET_PREFIX: u8 = 28;

/// Address block errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CidrError {
    #[error("malformed CIDR block: {0}")]
    Malformed(String),

    #[error("CIDR block {0} has host bits set")]
    HostBitsSet(String),

    #[error("cannot carve {count} subnets out of {block}: subnets would be smaller than /28")]
    TooSmall { block: String, count: usize },
}

/// An IPv4 address block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Carve the block into `count` equally sized, consecutive subnets.
    ///
    /// The subnet size is the largest power-of-two division that fits
    /// `count`, so four subnets in a /16 are four /18s.
    pub fn split(&self, count: usize) -> Result<Vec<Ipv4Cidr>, CidrError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let bits = count.next_power_of_two().trailing_zeros() as u8;
        let prefix = self.prefix + bits;
        if prefix > MAX_SUBNET_PREFIX {
            return Err(CidrError::TooSmall {
                block: self.to_string(),
                count,
            });
        }

        let base = u64::from(u32::from(self.network));
        let size = 1u64 << (32 - prefix);
        Ok((0..count as u64)
            .map(|i| Ipv4Cidr {
                network: Ipv4Addr::from((base + i * size) as u32),
                prefix,
            })
            .collect())
    }
}

impl FromStr for Ipv4Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| CidrError::Malformed(s.to_string()))?;
        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| CidrError::Malformed(s.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| CidrError::Malformed(s.to_string()))?;
        if prefix > 32 {
            return Err(CidrError::Malformed(s.to_string()));
        }

        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
        if u32::from(network) & !mask != 0 {
            return Err(CidrError::HostBitsSet(s.to_string()));
        }

        Ok(Self { network, prefix })
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = CidrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// How a subnet reaches the internet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubnetType {
    /// Routes through the internet gateway; instances may hold public IPs
    Public,
    /// No inbound reachability; outbound through a shared NAT gateway
    PrivateWithEgress,
}

impl SubnetType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::PrivateWithEgress => "Private",
        }
    }
}

/// A TCP port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Port(u16);

impl Port {
    pub const HTTP: Port = Port(80);
    pub const HTTPS: Port = Port(443);
    pub const POSTGRES: Port = Port(5432);

    pub const fn tcp(port: u16) -> Self {
        Self(port)
    }

    pub fn number(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp:{}", self.0)
    }
}

/// Source of inbound traffic
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Peer {
    /// Any IPv4 address
    AnyIpv4,
    /// Members of another access boundary, by security group
    Boundary(LogicalId),
}

impl Peer {
    pub const ANY_IPV4_CIDR: &'static str = "0.0.0.0/0";

    pub fn is_open(&self) -> bool {
        matches!(self, Self::AnyIpv4)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyIpv4 => f.write_str(Self::ANY_IPV4_CIDR),
            Self::Boundary(id) => write!(f, "{id}"),
        }
    }
}

/// One inbound allowance on a boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: Port,
    pub description: String,
}

impl IngressRule {
    /// Two rules with the same peer and port are the same rule.
    pub fn same_as(&self, other: &IngressRule) -> bool {
        self.peer == other.peer && self.port == other.port
    }
}
