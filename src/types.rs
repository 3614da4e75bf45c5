use ipnet::Ipv4Net;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::SocketAddrV4;
use std::str::FromStr;

use crate::error::RouterError;
use crate::network::address;

/// RIP-style infinity: a route at this cost is unreachable.
pub const INFINITY_COST: u32 = 16;

/// Key of the routing table: either a CIDR block or a bare node address
/// standing for that node's own reachability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetworkId {
    Prefix(Ipv4Net),
    Node(SocketAddrV4),
}

impl NetworkId {
    pub fn as_prefix(&self) -> Option<&Ipv4Net> {
        match self {
            NetworkId::Prefix(net) => Some(net),
            NetworkId::Node(_) => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, NetworkId::Node(_))
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkId::Prefix(net) => write!(f, "{}", net),
            NetworkId::Node(addr) => write!(f, "{}", addr),
        }
    }
}

impl FromStr for NetworkId {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            s.parse::<SocketAddrV4>()
                .map(NetworkId::Node)
                .map_err(|_| RouterError::MalformedAddress(s.to_string()))
        } else {
            address::parse_prefix(s).map(NetworkId::Prefix)
        }
    }
}

impl From<SocketAddrV4> for NetworkId {
    fn from(addr: SocketAddrV4) -> Self {
        NetworkId::Node(addr)
    }
}

impl From<Ipv4Net> for NetworkId {
    fn from(net: Ipv4Net) -> Self {
        NetworkId::Prefix(net)
    }
}

impl Serialize for NetworkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Route cost, always within `[0, INFINITY_COST]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Metric(u8);

impl Metric {
    pub const ZERO: Metric = Metric(0);
    pub const INFINITY: Metric = Metric(INFINITY_COST as u8);

    pub fn new(cost: u32) -> Self {
        Metric(cost.min(INFINITY_COST) as u8)
    }

    pub fn value(self) -> u32 {
        u32::from(self.0)
    }

    pub fn is_infinite(self) -> bool {
        self == Metric::INFINITY
    }

    pub fn saturating_add(self, cost: u32) -> Metric {
        Metric::new(self.value().saturating_add(cost))
    }
}

impl From<u32> for Metric {
    fn from(cost: u32) -> Self {
        Metric::new(cost)
    }
}

impl From<Metric> for u32 {
    fn from(metric: Metric) -> Self {
        metric.value()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub cost: Metric,
    pub next_hop: NetworkId,
}

impl RouteEntry {
    pub fn new(cost: impl Into<Metric>, next_hop: NetworkId) -> Self {
        Self {
            cost: cost.into(),
            next_hop,
        }
    }

    pub fn poisoned(&self) -> Self {
        Self {
            cost: Metric::INFINITY,
            next_hop: self.next_hop.clone(),
        }
    }
}
