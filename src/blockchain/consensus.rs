use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::join_all;
use log::{debug, info, warn};
use thiserror::Error;
use url::Url;

use super::chain::Blockchain;
use super::peer::PeerFetcher;
use super::validation::is_valid_chain;

/// Errors that can occur while managing peers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("Invalid node address: {0}")]
    InvalidNodeAddress(String),
}

/// Tracks peers and applies the longest-valid-chain rule against them
pub struct Consensus {
    /// Peer locations as `host:port`, kept sorted so scans are deterministic
    nodes: RwLock<BTreeSet<String>>,

    fetcher: Arc<dyn PeerFetcher>,
}

impl Consensus {
    pub fn new(fetcher: Arc<dyn PeerFetcher>) -> Self {
        Consensus {
            nodes: RwLock::new(BTreeSet::new()),
            fetcher,
        }
    }

    /// Adds a peer to the set
    ///
    /// Accepts a URL such as `http://192.168.0.5:5000` or a bare
    /// `192.168.0.5:5000`; only the `host:port` part is kept.
    ///
    /// # Returns
    ///
    /// The location that was stored
    pub fn register_node(&self, address: &str) -> Result<String, ConsensusError> {
        let location = parse_location(address)?;

        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(location.clone());

        Ok(location)
    }

    /// Gets all registered peers in scan order
    pub fn nodes(&self) -> Vec<String> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Replaces the local chain with the longest valid chain among the peers
    ///
    /// Unreachable peers and peers answering with anything but a chain are
    /// skipped. Among equally long candidates the first peer in scan order
    /// wins.
    ///
    /// # Returns
    ///
    /// true if the local chain was replaced
    pub async fn resolve_conflicts(&self, blockchain: &Blockchain) -> bool {
        let peers = self.nodes();
        let mut max_length = blockchain.chain_length();

        info!(
            "Resolving conflicts against {} peers, local chain length {}",
            peers.len(),
            max_length
        );

        let responses = join_all(peers.iter().map(|peer| self.fetcher.fetch_chain(peer))).await;

        let mut new_chain = None;
        for (peer, response) in peers.iter().zip(responses) {
            let snapshot = match response {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    debug!("Skipping peer {}: {}", peer, err);
                    continue;
                }
            };

            if snapshot.length != snapshot.chain.len() {
                warn!(
                    "Peer {} reported length {} for a chain of {} blocks",
                    peer,
                    snapshot.length,
                    snapshot.chain.len()
                );
                continue;
            }

            if snapshot.length > max_length && is_valid_chain(&snapshot.chain) {
                debug!("Peer {} offers a valid chain of length {}", peer, snapshot.length);
                max_length = snapshot.length;
                new_chain = Some(snapshot.chain);
            }
        }

        match new_chain {
            Some(chain) => blockchain.replace_chain(chain),
            None => false,
        }
    }
}

/// Extracts the `host:port` a peer is reachable at
pub fn parse_location(address: &str) -> Result<String, ConsensusError> {
    let address = address.trim();
    let invalid = || ConsensusError::InvalidNodeAddress(address.to_string());

    if address.is_empty() {
        return Err(invalid());
    }

    let url = if address.contains("://") {
        Url::parse(address)
    } else {
        Url::parse(&format!("http://{}", address))
    }
    .map_err(|_| invalid())?;

    let host = url.host_str().filter(|host| !host.is_empty()).ok_or_else(invalid)?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
