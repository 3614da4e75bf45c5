//! Builds the per-neighbor view of the routing table: split horizon with
//! poison reverse, then CIDR supernetting of adjacent blocks that share a
//! next-hop.

use ipnet::Ipv4Net;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::messages::Advertisement;
use super::neighbor::NeighborSet;
use crate::network::address;
use crate::types::{Metric, NetworkId, RouteEntry};
use crate::NeighborAddr;

/// Routes whose next-hop is `neighbor` are announced back to it at infinity.
pub fn poison_reverse(
    snapshot: &HashMap<NetworkId, RouteEntry>,
    neighbor: &NetworkId,
) -> HashMap<NetworkId, RouteEntry> {
    snapshot
        .iter()
        .map(|(network, entry)| {
            let entry = if entry.next_hop == *neighbor {
                entry.poisoned()
            } else {
                entry.clone()
            };
            (network.clone(), entry)
        })
        .collect()
}

/// Supernet of `lower` and `upper` when they are equal-size, adjacent and
/// `lower` is the aligned half of the pair.
fn supernet_of(lower: &Ipv4Net, upper: &Ipv4Net) -> Option<Ipv4Net> {
    let len = lower.prefix_len();
    if len == 0 || len != upper.prefix_len() {
        return None;
    }

    let size = address::block_size(len);
    let lo = u64::from(address::value_of(lower));
    let hi = u64::from(address::value_of(upper));
    if hi.checked_sub(lo) != Some(size) || (lo / size) % 2 != 0 {
        return None;
    }

    let new_len = len - 1;
    address::from_integer(address::value_of(lower) & address::mask_for(new_len), new_len).ok()
}

/// Aggregates a (poisoned) table. Node addresses and the administered network
/// pass through untouched. Each next-hop group is sorted by address, then
/// prefix length, and scanned once, left to right, merging a pair at most
/// once; merged output is not rescanned. A supernet never replaces a route
/// that is in the table itself or a supernet already emitted; such a pair
/// is treated as a miss.
pub fn summarize(
    routes: HashMap<NetworkId, RouteEntry>,
    local_network: &NetworkId,
) -> HashMap<NetworkId, RouteEntry> {
    let known: HashSet<NetworkId> = routes.keys().cloned().collect();
    let mut summarized = HashMap::with_capacity(routes.len());
    let mut by_next_hop: BTreeMap<NetworkId, Vec<(Ipv4Net, Metric)>> = BTreeMap::new();

    for (network, entry) in routes {
        let net = match network.as_prefix() {
            Some(net) if network != *local_network => *net,
            _ => {
                summarized.insert(network, entry);
                continue;
            }
        };
        by_next_hop
            .entry(entry.next_hop)
            .or_default()
            .push((net, entry.cost));
    }

    for (next_hop, mut group) in by_next_hop {
        if group.len() < 2 {
            for (net, cost) in group {
                summarized.insert(net.into(), RouteEntry::new(cost, next_hop.clone()));
            }
            continue;
        }

        group.sort_by_key(|(net, _)| (address::value_of(net), net.prefix_len()));

        let mut i = 0;
        while i < group.len() {
            let (net, cost) = group[i];
            if let Some(&(next_net, next_cost)) = group.get(i + 1) {
                if let Some(supernet) = supernet_of(&net, &next_net) {
                    let supernet = NetworkId::from(supernet);
                    if !known.contains(&supernet) && !summarized.contains_key(&supernet) {
                        summarized.insert(
                            supernet,
                            RouteEntry::new(cost.max(next_cost), next_hop.clone()),
                        );
                        i += 2;
                        continue;
                    }
                }
            }
            summarized.insert(net.into(), RouteEntry::new(cost, next_hop.clone()));
            i += 1;
        }
    }

    summarized
}

/// Poisons and aggregates `snapshot` for one destination neighbor.
pub fn build_advertisement(
    sender: NeighborAddr,
    local_network: &NetworkId,
    snapshot: &HashMap<NetworkId, RouteEntry>,
    neighbor: NeighborAddr,
) -> Advertisement {
    let poisoned = poison_reverse(snapshot, &NetworkId::Node(neighbor));
    Advertisement::new(sender, summarize(poisoned, local_network))
}

/// One advertisement per neighbor, all cut from the same snapshot.
pub fn build_for_neighbors(
    sender: NeighborAddr,
    local_network: &NetworkId,
    snapshot: &HashMap<NetworkId, RouteEntry>,
    neighbors: &NeighborSet,
) -> Vec<(NeighborAddr, Advertisement)> {
    neighbors
        .addresses()
        .map(|neighbor| {
            (
                *neighbor,
                build_advertisement(sender, local_network, snapshot, *neighbor),
            )
        })
        .collect()
}
