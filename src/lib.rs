//! # loadswarm
//!
//! Decentralized diffusion load balancing across autonomous peer agents.
//!
//! A population of agents, each holding a ledger of weighted work items,
//! continuously negotiates pairwise item transfers so that load converges
//! toward equality, subject to per-item capability constraints. There is
//! no coordinator and no shared memory: every agent runs its own round
//! scheduler, negotiation state machine, and liveness monitor, and talks
//! to peers exclusively through asynchronous point-to-point messages.
//!
//! A round is: pick a neighbor, query its load, compare against the
//! balance threshold, maybe propose one item transfer, and wait for the
//! confirmation. Anything that goes wrong — timeout, rejection, a dead
//! peer — resets the agent to idle with its ledger intact; the next
//! round simply tries again.

pub mod agent;
pub mod config;
pub mod directory;
pub mod errors;
pub mod ledger;
pub mod negotiation;
pub mod persistence;
pub mod protocol;
pub mod selection;
pub mod transport;

pub use agent::{AgentHandle, WorkerAgent};
pub use config::AgentConfig;
pub use directory::{AgentId, NeighborDirectory, PeerRef};
pub use errors::{LedgerError, PersistenceError, StartupError, TransportError};
pub use ledger::{Item, ItemLedger};
pub use negotiation::{compare_loads, LoadDecision, Negotiation, NegotiationPhase};
pub use persistence::{ItemStore, JsonItemStore, MemoryItemStore};
pub use protocol::{Envelope, Message};
pub use selection::select_item_to_shed;
pub use transport::{InMemoryNetwork, MailboxTransport, Transport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
