use serde::{Serialize, Serializer};
use std::collections::HashMap;

use crate::types::{Metric, NetworkId, RouteEntry};

/// The live distance-vector table. Always holds the self-entry for the
/// administered network at cost 0, next-hop itself.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    entries: HashMap<NetworkId, RouteEntry>,
    local_network: NetworkId,
}

impl RoutingTable {
    pub fn new(local_network: NetworkId) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            local_network.clone(),
            RouteEntry::new(Metric::ZERO, local_network.clone()),
        );
        Self {
            entries,
            local_network,
        }
    }

    pub fn local_network(&self) -> &NetworkId {
        &self.local_network
    }

    pub fn get(&self, destination: &NetworkId) -> Option<&RouteEntry> {
        self.entries.get(destination)
    }

    /// Overwrites the entry for `destination`. Writes to the self-entry are
    /// ignored and reported as `false`.
    pub fn put(&mut self, destination: NetworkId, entry: RouteEntry) -> bool {
        if destination == self.local_network {
            return false;
        }
        self.entries.insert(destination, entry);
        true
    }

    /// Copy of the table, detached from later mutation.
    pub fn snapshot(&self) -> HashMap<NetworkId, RouteEntry> {
        self.entries.clone()
    }

    pub fn keys(&self) -> impl Iterator<Item = &NetworkId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NetworkId, &RouteEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RoutingTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter())
    }
}
