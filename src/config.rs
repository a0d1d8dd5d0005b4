use std::time::Duration;

use clap::Parser;
use uuid::Uuid;

/// Command-line configuration for a ledger node
#[derive(Debug, Clone, Parser)]
#[command(name = "pow-ledger-node", version, about = "Proof-of-work ledger node")]
pub struct Config {
    /// Interface to listen on
    #[arg(long, env = "LEDGER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "LEDGER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Address credited with mining rewards (random when omitted)
    #[arg(long, env = "LEDGER_NODE_ID")]
    pub node_id: Option<String>,

    /// Peers to register at startup, e.g. http://10.0.0.2:5000
    #[arg(long = "peer", env = "LEDGER_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Seconds to wait for a peer's chain before skipping it
    #[arg(long, env = "LEDGER_PEER_TIMEOUT_SECS", default_value_t = 10)]
    pub peer_timeout_secs: u64,

    /// Run conflict resolution before answering balance queries
    #[arg(
        long,
        env = "LEDGER_RESOLVE_BEFORE_BALANCE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub resolve_before_balance: bool,
}

impl Config {
    /// Gets the reward address, generating one if none was configured
    pub fn node_identifier(&self) -> String {
        match &self.node_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}
