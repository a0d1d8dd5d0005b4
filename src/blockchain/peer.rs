use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::block::Block;

/// Path every node serves its chain on
pub const CHAIN_PATH: &str = "/api/v1/chain";

/// Errors that can occur while talking to a peer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {peer} failed: {reason}")]
    RequestFailed { peer: String, reason: String },

    #[error("Peer {peer} answered with status {status}")]
    BadStatus { peer: String, status: u16 },

    #[error("Peer {peer} sent an unreadable body: {reason}")]
    InvalidBody { peer: String, reason: String },
}

/// A peer's chain together with the length it reports
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainSnapshot {
    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// The length of the chain
    pub length: usize,
}

/// Retrieves the chain held by a peer
#[async_trait]
pub trait PeerFetcher: Send + Sync {
    /// Fetches the chain of the peer at `peer` (`host:port`)
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, TransportError>;
}

/// Fetches peer chains over HTTP
#[derive(Debug, Clone)]
pub struct HttpPeerFetcher {
    client: reqwest::Client,
}

impl HttpPeerFetcher {
    /// Creates a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpPeerFetcher { client })
    }
}

#[async_trait]
impl PeerFetcher for HttpPeerFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, TransportError> {
        let url = format!("http://{}{}", peer, CHAIN_PATH);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                peer: peer.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::BadStatus {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<ChainSnapshot>()
            .await
            .map_err(|e| TransportError::InvalidBody {
                peer: peer.to_string(),
                reason: e.to_string(),
            })
    }
}
