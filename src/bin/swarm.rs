//! loadswarm demo binary.
//!
//! Spins up a whole population of agents in one process on the in-memory
//! network, seeds each from its item file, and lets the diffusion
//! protocol run until ctrl-c. Every agent saves its ledger on shutdown.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin swarm -- topology.json
//! ```
//!
//! # Environment variables
//!
//! - `RUST_LOG` — log filter (default: "info")
//! - `SWARM_ROUND_PERIOD_MS` — round period override in milliseconds
//!
//! The topology file lists the agents, their capability tags, and their
//! item files:
//!
//! ```json
//! {
//!   "agents": [
//!     { "id": "worker1@swarm", "capabilities": ["welder"], "items_file": "data/worker1.json" },
//!     { "id": "worker2@swarm", "capabilities": [], "items_file": "data/worker2.json" }
//!   ]
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use loadswarm::{AgentConfig, AgentHandle, InMemoryNetwork, JsonItemStore, PeerRef, WorkerAgent};

#[derive(Debug, Deserialize)]
struct Topology {
    agents: Vec<TopologyAgent>,
}

#[derive(Debug, Deserialize)]
struct TopologyAgent {
    id: String,
    #[serde(default)]
    capabilities: Vec<String>,
    items_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let topology_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "topology.json".to_string());
    let content = std::fs::read_to_string(&topology_path)
        .with_context(|| format!("cannot read topology file {}", topology_path))?;
    let topology: Topology =
        serde_json::from_str(&content).context("malformed topology file")?;

    let round_period = std::env::var("SWARM_ROUND_PERIOD_MS")
        .ok()
        .and_then(|ms| ms.parse::<u64>().ok())
        .map(Duration::from_millis);

    let network = InMemoryNetwork::new();
    let mut handles: Vec<AgentHandle> = Vec::new();

    for entry in &topology.agents {
        let peers: Vec<PeerRef> = topology
            .agents
            .iter()
            .filter(|other| other.id != entry.id)
            .map(|other| PeerRef::with_capabilities(other.id.as_str(), other.capabilities.clone()))
            .collect();

        let mut config = AgentConfig::new(entry.id.as_str())
            .with_peers(peers)
            .with_capabilities(entry.capabilities.clone());
        if let Some(period) = round_period {
            config = config.with_round_period(period);
        }

        let transport = Arc::new(network.attach(config.id.clone()));
        let store = Arc::new(JsonItemStore::new(&entry.items_file));
        let agent = Arc::new(
            WorkerAgent::new(config, transport, store)
                .with_context(|| format!("cannot start agent {}", entry.id))?,
        );
        handles.push(agent.spawn());
    }
    log::info!("swarm of {} agents running; ctrl-c to stop", handles.len());

    // Periodic load report until shutdown.
    let report = async {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            for handle in &handles {
                log::info!(
                    "{}: load {:.2} ({} items{})",
                    handle.id(),
                    handle.total_load(),
                    handle.item_count(),
                    if handle.is_idle() { "" } else { ", negotiating" }
                );
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = report => unreachable!(),
    }

    log::info!("shutting down");
    for handle in handles {
        handle.shutdown().await;
    }
    Ok(())
}
