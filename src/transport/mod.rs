//! Messaging boundary: addressed, typed message delivery between named
//! agents.
//!
//! The core only needs two operations: send an envelope to a named peer,
//! and wait a bounded time for the next inbound envelope — expiry of the
//! wait returns `None`, it is never an error. [`InMemoryNetwork`] is the
//! in-process reference substrate backing the demo binary and the
//! integration tests; a real deployment would implement [`Transport`]
//! over an actual wire.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};

use crate::directory::AgentId;
use crate::errors::TransportError;
use crate::protocol::Envelope;

/// An agent's endpoint into the messaging substrate.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver an envelope to its `to` address.
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Wait up to `wait` for the next inbound envelope. `None` means
    /// nothing arrived within the wait, which is not an error.
    async fn recv(&self, wait: Duration) -> Option<Envelope>;
}

/// In-process messaging substrate: one unbounded mailbox per attached
/// agent, registered by address.
#[derive(Debug, Default)]
pub struct InMemoryNetwork {
    mailboxes: DashMap<AgentId, mpsc::UnboundedSender<Envelope>>,
}

impl InMemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach an agent, creating its mailbox. Re-attaching an address
    /// replaces the previous mailbox (the old endpoint goes dead).
    pub fn attach(self: &Arc<Self>, address: AgentId) -> MailboxTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        self.mailboxes.insert(address.clone(), tx);
        MailboxTransport {
            network: Arc::clone(self),
            local: address,
            inbox: Mutex::new(rx),
        }
    }

    /// Drop an agent's mailbox; subsequent sends to it fail.
    pub fn detach(&self, address: &AgentId) {
        self.mailboxes.remove(address);
    }

    fn route(&self, envelope: Envelope) -> Result<(), TransportError> {
        let to = envelope.to.clone();
        let sender = self
            .mailboxes
            .get(&to)
            .ok_or_else(|| TransportError::UnknownPeer {
                address: to.clone(),
            })?;
        sender
            .send(envelope)
            .map_err(|_| TransportError::MailboxClosed { address: to })
    }
}

/// An agent's endpoint on the [`InMemoryNetwork`].
#[derive(Debug)]
pub struct MailboxTransport {
    network: Arc<InMemoryNetwork>,
    local: AgentId,
    inbox: Mutex<mpsc::UnboundedReceiver<Envelope>>,
}

impl MailboxTransport {
    pub fn local_address(&self) -> &AgentId {
        &self.local
    }
}

#[async_trait]
impl Transport for MailboxTransport {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.network.route(envelope)
    }

    async fn recv(&self, wait: Duration) -> Option<Envelope> {
        let mut inbox = self.inbox.lock().await;
        match tokio::time::timeout(wait, inbox.recv()).await {
            Ok(Some(envelope)) => Some(envelope),
            // Channel closed or wait expired: nothing happened this tick.
            _ => None,
        }
    }
}
