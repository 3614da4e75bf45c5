use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};

use crate::config::RouterConfig;
use crate::control_server;
use crate::error::{Result, RouterError};
use crate::network::Transport;
use crate::protocol::{advertisement, merge, task_manager};
use crate::protocol::{Advertisement, MergeOutcome, NeighborSet, RoutingTable};
use crate::types::{NetworkId, RouteEntry};
use crate::{NeighborAddr, RouterState, SharedRouterState};

/// Read-only view of a node, as served on `/routes`.
#[derive(Debug, Clone, Serialize)]
pub struct RouterView {
    pub address: NeighborAddr,
    pub network: NetworkId,
    pub neighbors: NeighborSet,
    pub update_interval: u64,
    pub routing_table: RoutingTable,
    pub last_updates: BTreeMap<NeighborAddr, DateTime<Utc>>,
}

/// A distance-vector node: its configuration and the table shared between
/// the update task and inbound requests.
pub struct Router {
    config: RouterConfig,
    state: SharedRouterState,
}

impl Router {
    /// Seeds the table with the self-entry and one entry per direct neighbor.
    pub fn new(config: RouterConfig) -> Self {
        let mut state = RouterState::new(config.local_network());
        for (neighbor, cost) in config.neighbors.iter() {
            let id = NetworkId::Node(*neighbor);
            state.routing_table.put(id.clone(), RouteEntry::new(*cost, id));
        }

        info!(
            "Initial routing table:\n{}",
            serde_json::to_string_pretty(&state.routing_table).unwrap_or_default()
        );

        Self {
            config,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn address(&self) -> NeighborAddr {
        self.config.address
    }

    pub async fn snapshot(&self) -> HashMap<NetworkId, RouteEntry> {
        self.state.read().await.routing_table.snapshot()
    }

    /// Merges an advertisement from a direct neighbor. The whole pass runs
    /// under the table's write lock.
    pub async fn submit_advertisement(&self, advertisement: Advertisement) -> Result<MergeOutcome> {
        let link_cost = self
            .config
            .neighbors
            .link_cost(&advertisement.sender)
            .ok_or_else(|| RouterError::UnknownSender(advertisement.sender.to_string()))?;

        let mut state = self.state.write().await;
        let outcome = merge::merge_routes(
            &mut state.routing_table,
            self.config.address,
            advertisement.sender,
            link_cost,
            &advertisement.routes,
        );
        state.last_updates.insert(advertisement.sender, Utc::now());
        Ok(outcome)
    }

    /// One advertisement per neighbor, all built from a single snapshot.
    pub async fn build_advertisements(&self) -> Vec<(NeighborAddr, Advertisement)> {
        let snapshot = self.snapshot().await;
        advertisement::build_for_neighbors(
            self.config.address,
            &self.config.local_network(),
            &snapshot,
            &self.config.neighbors,
        )
    }

    pub async fn read_state(&self) -> RouterView {
        let state = self.state.read().await;
        RouterView {
            address: self.config.address,
            network: self.config.local_network(),
            neighbors: self.config.neighbors.clone(),
            update_interval: self.config.update_interval,
            routing_table: state.routing_table.clone(),
            last_updates: state.last_updates.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    /// Runs the update task and the control server until `shutdown`
    /// resolves, then stops the update task.
    pub async fn start<F>(
        self: Arc<Self>,
        listener: TcpListener,
        transport: Arc<dyn Transport>,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let update_handle = task_manager::start_update_task(self.clone(), transport, shutdown_rx);

        let served = control_server::serve(listener, self.clone(), shutdown).await;

        let _ = shutdown_tx.send(());
        if let Err(e) = update_handle.await {
            error!("Update task ended abnormally: {}", e);
        }
        info!("Router {} stopped", self.config.address);
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;

    const A: &str = "127.0.0.1:5001";
    const B: &str = "127.0.0.1:5002";

    fn net(s: &str) -> NetworkId {
        s.parse().unwrap()
    }

    fn router() -> Router {
        let neighbors: NeighborSet = [(A.parse().unwrap(), 5), (B.parse().unwrap(), 10)]
            .into_iter()
            .collect();
        Router::new(RouterConfig::new(
            "127.0.0.1:5000".parse().unwrap(),
            "10.0.1.0/24".parse().unwrap(),
            neighbors,
        ))
    }

    fn advert(sender: &str, entries: &[(&str, u32)]) -> Advertisement {
        let routes = entries
            .iter()
            .map(|(network, cost)| (net(network), RouteEntry::new(*cost, net(sender))))
            .collect();
        Advertisement::new(sender.parse().unwrap(), routes)
    }

    #[tokio::test]
    async fn test_initial_table() {
        let router = router();
        let table = router.snapshot().await;
        assert_eq!(table.len(), 3);
        assert_eq!(table[&net("10.0.1.0/24")], RouteEntry::new(0, net("10.0.1.0/24")));
        assert_eq!(table[&net(A)], RouteEntry::new(5, net(A)));
        assert_eq!(table[&net(B)], RouteEntry::new(10, net(B)));
    }

    #[tokio::test]
    async fn test_unknown_sender_is_rejected_without_mutation() {
        let router = router();
        let before = router.snapshot().await;
        let err = router
            .submit_advertisement(advert("127.0.0.1:5009", &[("10.0.5.0/24", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::UnknownSender(_)));
        assert_eq!(router.snapshot().await, before);
        assert!(router.read_state().await.last_updates.is_empty());
    }

    #[tokio::test]
    async fn test_submit_uses_link_cost_of_sender() {
        let router = router();
        let outcome = router
            .submit_advertisement(advert(A, &[("10.0.5.0/24", 1), (B, 1)]))
            .await
            .unwrap();
        assert_eq!(outcome.installed, 1);
        assert_eq!(outcome.updated, 1);

        let table = router.snapshot().await;
        assert_eq!(table[&net("10.0.5.0/24")], RouteEntry::new(6, net(A)));
        // B is cheaper through A (5 + 1) than over the direct link (10).
        assert_eq!(table[&net(B)], RouteEntry::new(6, net(A)));
        assert!(router.read_state().await.last_updates.contains_key(&A.parse().unwrap()));
    }

    #[tokio::test]
    async fn test_build_advertisements_poisons_per_neighbor() {
        let router = router();
        router
            .submit_advertisement(advert(A, &[("10.0.5.0/24", 1)]))
            .await
            .unwrap();

        let adverts: HashMap<_, _> = router.build_advertisements().await.into_iter().collect();
        assert_eq!(adverts.len(), 2);
        let to_a = &adverts[&A.parse().unwrap()];
        let to_b = &adverts[&B.parse().unwrap()];
        assert_eq!(to_a.routes[&net("10.0.5.0/24")].cost, Metric::INFINITY);
        assert_eq!(to_b.routes[&net("10.0.5.0/24")].cost.value(), 6);
        assert_eq!(to_b.sender, "127.0.0.1:5000".parse().unwrap());
    }

    #[tokio::test]
    async fn test_self_entry_survives_hostile_updates() {
        let router = router();
        router
            .submit_advertisement(advert(A, &[("10.0.1.0/24", 0), ("10.0.0.0/23", 0), ("10.0.1.0/25", 0)]))
            .await
            .unwrap();
        let table = router.snapshot().await;
        assert_eq!(table[&net("10.0.1.0/24")], RouteEntry::new(0, net("10.0.1.0/24")));
        assert!(!table.contains_key(&net("10.0.0.0/23")));
    }

    #[tokio::test]
    async fn test_read_state_shape() {
        let router = router();
        let json = serde_json::to_value(router.read_state().await).unwrap();
        assert_eq!(json["address"], "127.0.0.1:5000");
        assert_eq!(json["network"], "10.0.1.0/24");
        assert_eq!(json["update_interval"], 10);
        assert_eq!(json["neighbors"][A], 5);
        assert_eq!(json["routing_table"]["10.0.1.0/24"]["cost"], 0);
    }
}
