//! The worker agent: one autonomous peer running the negotiation
//! protocol over its item ledger.
//!
//! All of an agent's state lives behind a single mutex — the one
//! mutation domain of the protocol. The periodic tasks (round scheduler,
//! liveness monitor, backup save) and the receive loop each take that
//! lock, mutate, and release it before touching the network or the disk,
//! so no lock is ever held across an await point. Agents share nothing
//! with each other; they interact exclusively through [`Transport`]
//! envelopes.

pub mod handlers;
pub mod liveness;
pub mod rounds;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::directory::{AgentId, NeighborDirectory};
use crate::errors::StartupError;
use crate::ledger::{Item, ItemLedger};
use crate::negotiation::Negotiation;
use crate::persistence::ItemStore;
use crate::protocol::{Envelope, Message};
use crate::transport::Transport;

/// How many completed transfer outcomes the receiver remembers for
/// deduplicating retried requests.
const RECENT_TRANSFER_CAPACITY: usize = 64;

/// Receiver-side memory of recent transfer outcomes, keyed by the
/// transfer correlation id. A duplicate `transfer_request` is answered
/// with the recorded reply instead of being applied twice.
#[derive(Debug, Default)]
pub(crate) struct RecentTransfers {
    order: VecDeque<Uuid>,
    replies: HashMap<Uuid, Message>,
}

impl RecentTransfers {
    pub(crate) fn get(&self, transfer_id: &Uuid) -> Option<&Message> {
        self.replies.get(transfer_id)
    }

    pub(crate) fn record(&mut self, transfer_id: Uuid, reply: Message) {
        if self.replies.insert(transfer_id, reply).is_none() {
            self.order.push_back(transfer_id);
            if self.order.len() > RECENT_TRANSFER_CAPACITY {
                if let Some(evicted) = self.order.pop_front() {
                    self.replies.remove(&evicted);
                }
            }
        }
    }
}

/// The mutable half of an agent, guarded by the agent's mutex.
#[derive(Debug, Default)]
pub(crate) struct AgentInner {
    pub(crate) ledger: ItemLedger,
    pub(crate) negotiation: Option<Negotiation>,
    pub(crate) recent_transfers: RecentTransfers,
}

/// One autonomous peer.
pub struct WorkerAgent {
    config: AgentConfig,
    directory: NeighborDirectory,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ItemStore>,
    inner: Mutex<AgentInner>,
}

impl WorkerAgent {
    /// Build an agent, loading its seed items from the store. A load
    /// failure is fatal.
    pub fn new(
        config: AgentConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ItemStore>,
    ) -> Result<Self, StartupError> {
        let items = store.load_items()?;
        let ledger = ItemLedger::from_items(items);
        log::info!(
            "[{}] starting with {} items, load {:.2}",
            config.id,
            ledger.item_count(),
            ledger.total_load()
        );

        let directory = NeighborDirectory::new(config.peers.clone());
        Ok(Self {
            config,
            directory,
            transport,
            store,
            inner: Mutex::new(AgentInner {
                ledger,
                negotiation: None,
                recent_transfers: RecentTransfers::default(),
            }),
        })
    }

    pub fn id(&self) -> &AgentId {
        &self.config.id
    }

    pub fn capabilities(&self) -> &HashSet<String> {
        &self.config.capabilities
    }

    /// Current aggregate load.
    pub fn total_load(&self) -> f64 {
        self.inner.lock().ledger.total_load()
    }

    pub fn item_count(&self) -> usize {
        self.inner.lock().ledger.item_count()
    }

    /// Snapshot of the owned items.
    pub fn items(&self) -> Vec<Item> {
        self.inner.lock().ledger.items().to_vec()
    }

    /// Whether the agent has no negotiation in flight.
    pub fn is_idle(&self) -> bool {
        self.inner.lock().negotiation.is_none()
    }

    pub(crate) fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub(crate) fn directory(&self) -> &NeighborDirectory {
        &self.directory
    }

    pub(crate) fn inner(&self) -> &Mutex<AgentInner> {
        &self.inner
    }

    /// Save a snapshot of the ledger. Failure is logged and reported,
    /// never propagated: the in-memory state stands and the save is
    /// retried on the next opportunity.
    pub(crate) fn persist(&self, context: &str) -> bool {
        let items = self.inner.lock().ledger.items().to_vec();
        match self.store.save_items(&items) {
            Ok(()) => {
                log::debug!("[{}] {}: {} items saved", self.config.id, context, items.len());
                true
            }
            Err(error) => {
                log::warn!("[{}] {} failed: {}", self.config.id, context, error);
                false
            }
        }
    }

    /// Send a message to a peer, logging delivery failures.
    pub(crate) async fn send_to(&self, to: &AgentId, message: Message) {
        let kind = message.kind();
        let envelope = Envelope::new(self.config.id.clone(), to.clone(), message);
        if let Err(error) = self.transport.send(envelope).await {
            log::warn!("[{}] could not send {} to {}: {}", self.config.id, kind, to, error);
        }
    }

    /// Send a round-owned message; a delivery failure aborts the round.
    pub(crate) async fn send_or_abort(&self, to: &AgentId, message: Message) {
        let kind = message.kind();
        let envelope = Envelope::new(self.config.id.clone(), to.clone(), message);
        if let Err(error) = self.transport.send(envelope).await {
            log::warn!(
                "[{}] could not send {} to {}: {}; aborting round",
                self.config.id,
                kind,
                to,
                error
            );
            self.inner.lock().negotiation = None;
        }
    }

    /// Start the agent's task set: receive loop, round scheduler,
    /// liveness monitor, and backup save timer.
    pub fn spawn(self: &Arc<Self>) -> AgentHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        // Receive loop: envelopes are handled one at a time, which gives
        // the per-agent arrival-order guarantee.
        {
            let agent = Arc::clone(self);
            let mut shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        inbound = agent.transport.recv(agent.config.reply_timeout) => {
                            if let Some(envelope) = inbound {
                                agent.handle_envelope(envelope).await;
                            }
                        }
                    }
                }
            }));
        }

        // Round scheduler.
        {
            let agent = Arc::clone(self);
            let mut shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(agent.config.round_period);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = ticker.tick() => agent.scheduler_tick().await,
                    }
                }
            }));
        }

        // Liveness monitor.
        {
            let agent = Arc::clone(self);
            let mut shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(agent.config.liveness_period);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = ticker.tick() => agent.liveness_tick().await,
                    }
                }
            }));
        }

        // Periodic backup save.
        {
            let agent = Arc::clone(self);
            let mut shutdown = shutdown_rx;
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(agent.config.save_interval);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = ticker.tick() => {
                            agent.persist("backup save");
                        }
                    }
                }
            }));
        }

        AgentHandle {
            agent: Arc::clone(self),
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// Handle to a spawned agent: state inspection plus graceful shutdown.
pub struct AgentHandle {
    agent: Arc<WorkerAgent>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl AgentHandle {
    pub fn id(&self) -> &AgentId {
        self.agent.id()
    }

    pub fn total_load(&self) -> f64 {
        self.agent.total_load()
    }

    pub fn item_count(&self) -> usize {
        self.agent.item_count()
    }

    pub fn items(&self) -> Vec<Item> {
        self.agent.items()
    }

    pub fn is_idle(&self) -> bool {
        self.agent.is_idle()
    }

    /// Stop all tasks and write a final save. An in-flight round is
    /// abandoned; the ledger holds no partial state, so nothing is lost.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        self.agent.persist("final save");
        log::info!("[{}] stopped", self.agent.id());
    }
}
