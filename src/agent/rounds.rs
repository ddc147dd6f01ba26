//! Round scheduler: periodically starts a new negotiation when the
//! agent is idle.
//!
//! A tick while a round is in flight is a no-op (single-flight), except
//! that an expired round is aborted on the tick; the fresh round then
//! starts on a later tick. Neighbor choice prefers a peer that could
//! actually take one of the constrained local items, falling back to a
//! uniform pick among all peers.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::directory::{AgentId, PeerRef};
use crate::ledger::ItemLedger;
use crate::negotiation::Negotiation;
use crate::protocol::Message;

use super::WorkerAgent;

impl WorkerAgent {
    /// One scheduler tick: abort an expired round or start a new one.
    pub(crate) async fn scheduler_tick(&self) {
        if let Some((to, message)) = self.begin_round() {
            self.send_or_abort(&to, message).await;
        }
    }

    /// The locked half of a tick. Returns the load query to emit, if a
    /// round was started.
    fn begin_round(&self) -> Option<(AgentId, Message)> {
        let mut inner = self.inner().lock();

        if let Some(negotiation) = &inner.negotiation {
            if negotiation.is_expired(self.config().reply_timeout) {
                log::warn!(
                    "[{}] round with {} timed out in {:?}; resetting to idle",
                    self.id(),
                    negotiation.chosen_neighbor.address,
                    negotiation.phase
                );
                inner.negotiation = None;
            }
            // Single-flight: even after an expiry abort, the next round
            // waits for a later tick.
            return None;
        }

        if self.directory().is_empty() {
            log::debug!("[{}] no peers to balance with", self.id());
            return None;
        }

        let neighbor = self.choose_neighbor(&inner.ledger)?;
        let my_load = inner.ledger.total_load();

        inner.negotiation = Some(Negotiation::new(neighbor.clone()));

        log::info!(
            "[{}] starting round with {} (my load {:.2})",
            self.id(),
            neighbor.address,
            my_load
        );
        Some((
            neighbor.address,
            Message::LoadRequest {
                sender_load: my_load,
            },
        ))
    }

    /// Pick the round's neighbor: a random peer advertising a randomly
    /// chosen capability that some local item requires, else a uniform
    /// pick among all peers.
    fn choose_neighbor(&self, ledger: &ItemLedger) -> Option<PeerRef> {
        let mut rng = rand::thread_rng();

        let required_tags: Vec<&String> = ledger
            .items()
            .iter()
            .flat_map(|item| item.requires.iter())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if let Some(tag) = required_tags.choose(&mut rng) {
            let compatible = self.directory().find_compatible_peers(tag);
            if let Some(peer) = compatible.choose(&mut rng) {
                return Some((*peer).clone());
            }
        }

        self.directory().list_peers().choose(&mut rng).cloned()
    }
}
