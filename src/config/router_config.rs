use anyhow::Context;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, RouterError};
use crate::protocol::NeighborSet;
use crate::types::{INFINITY_COST, NetworkId};
use crate::NeighborAddr;

pub const DEFAULT_UPDATE_INTERVAL: u64 = 10;
pub const DEFAULT_PUSH_TIMEOUT: u64 = 5;

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL
}

fn default_push_timeout() -> u64 {
    DEFAULT_PUSH_TIMEOUT
}

/// Startup parameters of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub address: NeighborAddr,
    pub network: Ipv4Net,
    pub neighbors: NeighborSet,
    #[serde(default = "default_update_interval")]
    pub update_interval: u64, // seconds
    #[serde(default = "default_push_timeout")]
    pub push_timeout: u64, // seconds
}

impl RouterConfig {
    pub fn new(address: NeighborAddr, network: Ipv4Net, neighbors: NeighborSet) -> Self {
        Self {
            address,
            network,
            neighbors,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            push_timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }

    pub fn with_update_interval(mut self, secs: u64) -> Self {
        self.update_interval = secs;
        self
    }

    pub fn with_push_timeout(mut self, secs: u64) -> Self {
        self.push_timeout = secs;
        self
    }

    pub fn local_network(&self) -> NetworkId {
        NetworkId::Prefix(self.network)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout)
    }

    pub fn validate(&self) -> Result<()> {
        if self.update_interval == 0 {
            return Err(RouterError::Configuration("update interval must be at least 1s".into()));
        }
        if self.push_timeout == 0 {
            return Err(RouterError::Configuration("push timeout must be at least 1s".into()));
        }
        for (neighbor, cost) in self.neighbors.iter() {
            if *neighbor == self.address {
                return Err(RouterError::Configuration(format!(
                    "{} is listed as its own neighbor",
                    neighbor
                )));
            }
            if *cost == 0 {
                return Err(RouterError::Configuration(format!(
                    "link cost to {} must be positive",
                    neighbor
                )));
            }
            if *cost >= INFINITY_COST {
                log::warn!(
                    "Link cost {} to {} is at or above infinity; the neighbor is unreachable",
                    cost,
                    neighbor
                );
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: RouterConfig = serde_json::from_str(&content)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("cannot write config file {}", path.display()))?;
        Ok(())
    }
}
