use async_trait::async_trait;
use log::debug;
use std::time::Duration;

use crate::error::{Result, RouterError};
use crate::protocol::Advertisement;
use crate::NeighborAddr;

pub const UPDATE_PATH: &str = "/receive_update";

/// Outbound side of the protocol: delivers one advertisement to one neighbor.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn push_advertisement(&self, neighbor: NeighborAddr, advertisement: &Advertisement) -> Result<()>;
}

/// Posts advertisements as JSON to `http://{neighbor}/receive_update`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RouterError::Configuration(format!("http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn push_advertisement(&self, neighbor: NeighborAddr, advertisement: &Advertisement) -> Result<()> {
        let url = format!("http://{}{}", neighbor, UPDATE_PATH);
        let transport_error = |e: reqwest::Error| RouterError::Transport {
            neighbor: neighbor.to_string(),
            reason: e.to_string(),
        };

        self.client
            .post(&url)
            .json(&advertisement.to_message())
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;

        debug!("Sent {} routes to {}", advertisement.routes.len(), url);
        Ok(())
    }
}
