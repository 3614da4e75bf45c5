use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::error::{Result, RouterError};
use crate::types::{NetworkId, RouteEntry};
use crate::NeighborAddr;

/// Wire form of an advertisement, as posted to `/receive_update`. Each
/// entry stays raw JSON (`{"cost": n, "next_hop": "..."}`) so one bad entry
/// can be dropped on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub sender_address: String,
    pub routing_table: Map<String, Value>,
}

/// A validated advertisement from one node to one neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub sender: NeighborAddr,
    pub routes: HashMap<NetworkId, RouteEntry>,
}

/// Reads one received entry. The cost must be a non-negative integer; the
/// advertised next-hop is only informational and falls back to the sender.
fn parse_entry(sender: NeighborAddr, network: &str, info: &Value) -> Result<(NetworkId, RouteEntry)> {
    let network = network.parse::<NetworkId>()?;
    let cost = info
        .get("cost")
        .and_then(Value::as_u64)
        .ok_or_else(|| RouterError::MalformedPayload(format!("bad cost in {}", info)))?;
    let next_hop = info
        .get("next_hop")
        .and_then(Value::as_str)
        .and_then(|hop| hop.parse().ok())
        .unwrap_or(NetworkId::Node(sender));
    let cost = u32::try_from(cost).unwrap_or(u32::MAX);
    Ok((network, RouteEntry::new(cost, next_hop)))
}

impl Advertisement {
    pub fn new(sender: NeighborAddr, routes: HashMap<NetworkId, RouteEntry>) -> Self {
        Self { sender, routes }
    }

    pub fn to_message(&self) -> UpdateMessage {
        UpdateMessage {
            sender_address: self.sender.to_string(),
            routing_table: self
                .routes
                .iter()
                .map(|(network, entry)| {
                    (
                        network.to_string(),
                        json!({
                            "cost": entry.cost.value(),
                            "next_hop": entry.next_hop.to_string(),
                        }),
                    )
                })
                .collect(),
        }
    }

    /// Validates a received message. A missing or unparsable sender rejects
    /// the whole message; malformed entries are dropped individually.
    pub fn from_message(message: UpdateMessage) -> Result<Self> {
        let sender_text = message.sender_address.trim();
        if sender_text.is_empty() {
            return Err(RouterError::MalformedPayload("missing sender_address".into()));
        }
        let sender: NeighborAddr = sender_text.parse().map_err(|_| {
            RouterError::MalformedPayload(format!("bad sender_address {}", sender_text))
        })?;

        let mut routes = HashMap::with_capacity(message.routing_table.len());
        for (network, info) in &message.routing_table {
            match parse_entry(sender, network, info) {
                Ok((network, entry)) => {
                    routes.insert(network, entry);
                }
                Err(e) => warn!("Dropping entry {} from {}: {}", network, sender, e),
            }
        }

        Ok(Self { sender, routes })
    }
}
