//! Error types for the loadswarm protocol core.
//!
//! Per-round failures (timeouts, rejections, stale replies) are not errors
//! at all — they are state-machine transitions handled in `agent`. The
//! types here cover the faults that callers must handle explicitly.

use thiserror::Error;
use uuid::Uuid;

use crate::directory::AgentId;

/// Errors from the item ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Removal of an item that is not in the ledger. Never silently
    /// no-ops; a missing item during a transfer completion indicates a
    /// protocol bug.
    #[error("item not found in ledger: {item_id}")]
    ItemNotFound { item_id: Uuid },
}

/// Errors from the messaging substrate.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The destination address is not known to the substrate.
    #[error("unknown peer: {address}")]
    UnknownPeer { address: AgentId },

    /// The destination was known but its mailbox has been closed.
    #[error("mailbox closed for peer: {address}")]
    MailboxClosed { address: AgentId },
}

/// Errors from the item store.
///
/// Save failures are non-fatal: the ledger mutation stands and the save
/// is retried on the next save opportunity. Load failures are fatal at
/// agent startup (wrapped in [`StartupError`]).
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("item store i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed item store content: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Fatal errors while bringing an agent up.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Seed items could not be loaded from the store.
    #[error("failed to load seed items: {0}")]
    SeedLoad(#[from] PersistenceError),
}
