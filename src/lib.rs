pub mod config;
pub mod control_server;
pub mod error;
pub mod network;
pub mod protocol;
pub mod router;
pub mod types;

use std::collections::HashMap;
use std::net::SocketAddrV4;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use error::{Result, RouterError};
pub use router::Router;

/// Address (`ip:port`) of a node; neighbors are keyed by it.
pub type NeighborAddr = SocketAddrV4;

#[derive(Debug, Clone)]
pub struct RouterState {
    pub routing_table: protocol::RoutingTable,
    pub last_updates: HashMap<NeighborAddr, chrono::DateTime<chrono::Utc>>,
}

impl RouterState {
    pub fn new(local_network: types::NetworkId) -> Self {
        Self {
            routing_table: protocol::RoutingTable::new(local_network),
            last_updates: HashMap::new(),
        }
    }
}

pub type SharedRouterState = Arc<RwLock<RouterState>>;
