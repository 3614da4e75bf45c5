use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddrV4;

use crate::NeighborAddr;

/// Directly connected peers and the weight of the link to each. Fixed after
/// startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeighborSet {
    links: BTreeMap<NeighborAddr, u32>,
}

impl NeighborSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, neighbor: NeighborAddr, cost: u32) -> Option<u32> {
        self.links.insert(neighbor, cost)
    }

    pub fn link_cost(&self, neighbor: &NeighborAddr) -> Option<u32> {
        self.links.get(neighbor).copied()
    }

    pub fn contains(&self, neighbor: &NeighborAddr) -> bool {
        self.links.contains_key(neighbor)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &NeighborAddr> {
        self.links.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NeighborAddr, &u32)> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl FromIterator<(SocketAddrV4, u32)> for NeighborSet {
    fn from_iter<I: IntoIterator<Item = (SocketAddrV4, u32)>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().collect(),
        }
    }
}
