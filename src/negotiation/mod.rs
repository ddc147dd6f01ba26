//! Negotiation state: the single-flight record of a round in progress,
//! plus the pure load-comparison decision procedure.
//!
//! An agent holds at most one [`Negotiation`] at a time; `None` means
//! idle and eligible for a new round. The record owns everything a round
//! accumulates — chosen neighbor, candidate item, transfer correlation
//! id — so aborting a round is a single assignment back to `None`.
//! Timeout is a first-class transition: expiry is checked on scheduler
//! ticks, and an unanswered liveness probe aborts the round.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::directory::PeerRef;
use crate::ledger::Item;

/// Phase of an active negotiation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    /// Load query sent; waiting for the peer's `load_reply`.
    AwaitingLoadReply,
    /// Transfer proposed; waiting for `transfer_confirm`.
    AwaitingTransferConfirm,
}

/// The single-flight record of an active round.
#[derive(Debug, Clone)]
pub struct Negotiation {
    pub phase: NegotiationPhase,
    pub chosen_neighbor: PeerRef,
    /// The item proposed for transfer. Stays in the sender's ledger
    /// until a `transfer_confirm` arrives.
    pub candidate_item: Option<Item>,
    /// Correlation id of the in-flight transfer, if one was proposed.
    pub transfer_id: Option<Uuid>,
    pub started_at: Instant,
    /// A liveness probe was sent and has not been answered yet.
    pub probe_pending: bool,
}

impl Negotiation {
    /// Start a round against the chosen neighbor. The record is created
    /// together with the load query, so it starts in
    /// [`NegotiationPhase::AwaitingLoadReply`].
    pub fn new(chosen_neighbor: PeerRef) -> Self {
        Self {
            phase: NegotiationPhase::AwaitingLoadReply,
            chosen_neighbor,
            candidate_item: None,
            transfer_id: None,
            started_at: Instant::now(),
            probe_pending: false,
        }
    }

    /// Whether the round has waited longer than the reply timeout.
    pub fn is_expired(&self, reply_timeout: Duration) -> bool {
        self.started_at.elapsed() > reply_timeout
    }
}

/// Outcome of comparing the two loads of a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadDecision {
    /// Within the balance threshold; no transfer this round.
    Balanced,
    /// The peer carries more; the lighter side never initiates, it
    /// waits for the peer's own next round.
    PeerHeavier,
    /// This agent is heavier; shed `amount` toward the pairwise average.
    Shed { amount: f64 },
}

/// The decision procedure of a round: compare own and peer load against
/// the relative balance threshold.
///
/// `threshold = balance_threshold * (my_load + peer_load) / 2`. The shed
/// amount is `my_load - avg`, never biased past the average, so a single
/// transfer cannot invert the imbalance.
pub fn compare_loads(my_load: f64, peer_load: f64, balance_threshold: f64) -> LoadDecision {
    let avg = (my_load + peer_load) / 2.0;
    let diff = (my_load - peer_load).abs();
    let threshold = balance_threshold * avg;

    if diff <= threshold {
        LoadDecision::Balanced
    } else if my_load > peer_load + threshold {
        LoadDecision::Shed {
            amount: my_load - avg,
        }
    } else {
        LoadDecision::PeerHeavier
    }
}
