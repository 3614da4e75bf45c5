use log::{debug, info};
use std::collections::HashMap;

use super::routing_table::RoutingTable;
use crate::network::address;
use crate::types::{Metric, NetworkId, RouteEntry};
use crate::NeighborAddr;

/// What a single merge pass did to the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub installed: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.installed + self.updated > 0
    }
}

/// Networks this node must never learn from anyone: its own network, its own
/// address, and any announced block that contains its own network.
fn is_local(network: &NetworkId, local_network: &NetworkId, local_address: &NetworkId) -> bool {
    if network == local_network || network == local_address {
        return true;
    }
    match (network.as_prefix(), local_network.as_prefix()) {
        (Some(received), Some(local)) => address::covers(received, local),
        _ => false,
    }
}

/// Relaxes `table` with the routes `sender` announced over a link of
/// `link_cost`. A route is replaced when the new cost is strictly better, or
/// when `sender` is already its next-hop; unknown routes are only installed
/// when reachable.
pub fn merge_routes(
    table: &mut RoutingTable,
    local_address: NeighborAddr,
    sender: NeighborAddr,
    link_cost: u32,
    routes: &HashMap<NetworkId, RouteEntry>,
) -> MergeOutcome {
    let local_network = table.local_network().clone();
    let local_address = NetworkId::Node(local_address);
    let via = NetworkId::Node(sender);
    let mut outcome = MergeOutcome::default();

    for (network, info) in routes {
        if is_local(network, &local_network, &local_address) {
            outcome.skipped += 1;
            continue;
        }

        let candidate = Metric::new(link_cost.saturating_add(info.cost.value()));
        let proposed = RouteEntry::new(candidate, via.clone());

        match table.get(network) {
            None if candidate.is_infinite() => {
                outcome.skipped += 1;
            }
            None => {
                info!("Learned {} via {} at cost {}", network, sender, candidate);
                table.put(network.clone(), proposed);
                outcome.installed += 1;
            }
            Some(current) => {
                let accept = candidate < current.cost || current.next_hop == via;
                if accept && *current != proposed {
                    info!(
                        "Route to {} changed: cost {} via {} -> cost {} via {}",
                        network, current.cost, current.next_hop, candidate, sender
                    );
                    table.put(network.clone(), proposed);
                    outcome.updated += 1;
                } else {
                    outcome.skipped += 1;
                }
            }
        }
    }

    debug!(
        "Merged update from {}: {} installed, {} updated, {} skipped",
        sender, outcome.installed, outcome.updated, outcome.skipped
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: &str = "127.0.0.1:5000";
    const A: &str = "127.0.0.1:5001";
    const B: &str = "127.0.0.1:5002";
    const C: &str = "127.0.0.1:5003";

    fn net(s: &str) -> NetworkId {
        s.parse().unwrap()
    }

    fn addr(s: &str) -> NeighborAddr {
        s.parse().unwrap()
    }

    fn routes(entries: &[(&str, u32)]) -> HashMap<NetworkId, RouteEntry> {
        entries
            .iter()
            .map(|(network, cost)| (net(network), RouteEntry::new(*cost, net("10.255.0.0/16"))))
            .collect()
    }

    fn table_with_n_via_a() -> RoutingTable {
        let mut table = RoutingTable::new(net("10.0.1.0/24"));
        table.put(net("10.0.7.0/24"), RouteEntry::new(5, net(A)));
        table
    }

    #[test]
    fn test_strict_improvement_from_other_neighbor() {
        let mut table = table_with_n_via_a();
        let outcome = merge_routes(&mut table, addr(ME), addr(B), 1, &routes(&[("10.0.7.0/24", 2)]));
        assert_eq!(outcome.updated, 1);
        assert_eq!(table.get(&net("10.0.7.0/24")), Some(&RouteEntry::new(3, net(B))));
    }

    #[test]
    fn test_worse_news_from_current_next_hop_is_trusted() {
        let mut table = table_with_n_via_a();
        merge_routes(&mut table, addr(ME), addr(A), 1, &routes(&[("10.0.7.0/24", 10)]));
        assert_eq!(table.get(&net("10.0.7.0/24")), Some(&RouteEntry::new(11, net(A))));
    }

    #[test]
    fn test_worse_news_from_other_neighbor_is_ignored() {
        let mut table = table_with_n_via_a();
        let outcome = merge_routes(&mut table, addr(ME), addr(C), 1, &routes(&[("10.0.7.0/24", 10)]));
        assert!(!outcome.changed());
        assert_eq!(table.get(&net("10.0.7.0/24")), Some(&RouteEntry::new(5, net(A))));
    }

    #[test]
    fn test_equal_cost_from_other_neighbor_is_ignored() {
        let mut table = table_with_n_via_a();
        merge_routes(&mut table, addr(ME), addr(B), 1, &routes(&[("10.0.7.0/24", 4)]));
        assert_eq!(table.get(&net("10.0.7.0/24")).unwrap().next_hop, net(A));
    }

    #[test]
    fn test_poison_from_next_hop_withdraws_route() {
        let mut table = table_with_n_via_a();
        merge_routes(&mut table, addr(ME), addr(A), 1, &routes(&[("10.0.7.0/24", 16)]));
        assert!(table.get(&net("10.0.7.0/24")).unwrap().cost.is_infinite());
    }

    #[test]
    fn test_unreachable_unknown_network_is_not_installed() {
        let mut table = RoutingTable::new(net("10.0.1.0/24"));
        let outcome = merge_routes(
            &mut table,
            addr(ME),
            addr(A),
            1,
            &routes(&[("10.0.8.0/24", 16), ("10.0.9.0/24", 15)]),
        );
        assert_eq!(outcome.installed, 0);
        assert!(table.get(&net("10.0.8.0/24")).is_none());
        // 15 + 1 saturates at infinity too.
        assert!(table.get(&net("10.0.9.0/24")).is_none());
    }

    #[test]
    fn test_candidate_cost_is_clamped() {
        let mut table = table_with_n_via_a();
        merge_routes(&mut table, addr(ME), addr(A), 12, &routes(&[("10.0.7.0/24", 9)]));
        assert_eq!(table.get(&net("10.0.7.0/24")).unwrap().cost, Metric::INFINITY);
    }

    #[test]
    fn test_own_network_and_address_are_skipped() {
        let mut table = RoutingTable::new(net("10.0.1.0/24"));
        let outcome = merge_routes(
            &mut table,
            addr(ME),
            addr(A),
            1,
            &routes(&[("10.0.1.0/24", 0), (ME, 1)]),
        );
        assert_eq!(outcome.skipped, 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&net("10.0.1.0/24")).unwrap().cost, Metric::ZERO);
    }

    #[test]
    fn test_supernet_covering_own_network_is_skipped() {
        let mut table = RoutingTable::new(net("10.0.1.0/24"));
        merge_routes(
            &mut table,
            addr(ME),
            addr(A),
            1,
            &routes(&[("10.0.0.0/23", 2), ("10.0.0.0/16", 2), ("10.0.2.0/23", 2)]),
        );
        assert!(table.get(&net("10.0.0.0/23")).is_none());
        assert!(table.get(&net("10.0.0.0/16")).is_none());
        assert_eq!(table.get(&net("10.0.2.0/23")).unwrap().cost.value(), 3);
        let own = table.get(&net("10.0.1.0/24")).unwrap();
        assert_eq!(own, &RouteEntry::new(0, net("10.0.1.0/24")));
    }

    #[test]
    fn test_node_entries_are_learned() {
        let mut table = RoutingTable::new(net("10.0.1.0/24"));
        merge_routes(&mut table, addr(ME), addr(A), 2, &routes(&[(C, 3)]));
        assert_eq!(table.get(&net(C)), Some(&RouteEntry::new(5, net(A))));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let update = routes(&[("10.0.7.0/24", 1), ("10.0.8.0/24", 4), ("10.0.9.0/24", 16)]);
        let mut table = table_with_n_via_a();
        merge_routes(&mut table, addr(ME), addr(B), 2, &update);
        let once = table.snapshot();

        let second = merge_routes(&mut table, addr(ME), addr(B), 2, &update);
        assert!(!second.changed());
        assert_eq!(table.snapshot(), once);
    }
}
