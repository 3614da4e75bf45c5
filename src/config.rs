pub mod router_config;

pub use router_config::*;

use anyhow::Context;
use std::path::Path;

use crate::error::{Result, RouterError};
use crate::protocol::NeighborSet;
use crate::NeighborAddr;

/// Parses a neighbor file: a header row, then `address,cost` per line.
pub fn parse_neighbors_csv(content: &str) -> Result<NeighborSet> {
    let mut neighbors = NeighborSet::new();

    for (index, line) in content.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let line_no = index + 1;
        let (address, cost) = line.split_once(',').ok_or_else(|| {
            RouterError::Configuration(format!("line {}: expected `address,cost`", line_no))
        })?;
        let address: NeighborAddr = address.trim().parse().map_err(|_| {
            RouterError::Configuration(format!("line {}: bad neighbor address {}", line_no, address.trim()))
        })?;
        let cost: u32 = cost.trim().parse().map_err(|_| {
            RouterError::Configuration(format!("line {}: bad link cost {}", line_no, cost.trim()))
        })?;

        if neighbors.insert(address, cost).is_some() {
            return Err(RouterError::Configuration(format!(
                "line {}: neighbor {} listed twice",
                line_no, address
            )));
        }
    }

    Ok(neighbors)
}

pub fn load_neighbors_csv(path: impl AsRef<Path>) -> anyhow::Result<NeighborSet> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read neighbor file {}", path.display()))?;
    parse_neighbors_csv(&content).with_context(|| format!("bad neighbor file {}", path.display()))
}
