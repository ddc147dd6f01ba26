//! Inbound message dispatch and the per-kind handlers.
//!
//! Dispatch is an exhaustive match on the message enum. Reply kinds
//! (`load_reply`, `*_error`, `transfer_confirm`, `liveness_reply`) are
//! only state input when they come from the current round's chosen
//! neighbor in the matching phase; anything else is stale and silently
//! discarded. Query kinds (`load_request`, `transfer_request`,
//! `liveness_probe`) are stateless per call and always answered.

use std::collections::HashSet;

use uuid::Uuid;

use crate::directory::AgentId;
use crate::ledger::Item;
use crate::negotiation::{compare_loads, LoadDecision, NegotiationPhase};
use crate::protocol::{Envelope, Message};
use crate::selection::select_item_to_shed;

use super::WorkerAgent;

impl WorkerAgent {
    /// Route one inbound envelope to its handler and send back whatever
    /// reply the handler produced.
    pub(crate) async fn handle_envelope(&self, envelope: Envelope) {
        let Envelope { from, message, .. } = envelope;
        log::debug!("[{}] received {} from {}", self.id(), message.kind(), from);

        let reply = match message {
            Message::LoadRequest { sender_load } => self.on_load_request(&from, sender_load),
            Message::LoadReply {
                load, capabilities, ..
            } => self.on_load_reply(&from, load, capabilities),
            Message::LoadReplyError { error } => {
                self.on_reply_error(&from, NegotiationPhase::AwaitingLoadReply, &error);
                None
            }
            Message::TransferRequest {
                transfer_id, item, ..
            } => self.on_transfer_request(&from, transfer_id, item).await,
            Message::TransferConfirm {
                transfer_id,
                accepted,
                ..
            } => {
                self.on_transfer_confirm(&from, transfer_id, accepted);
                None
            }
            Message::TransferConfirmError { error, .. } => {
                self.on_reply_error(&from, NegotiationPhase::AwaitingTransferConfirm, &error);
                None
            }
            Message::LivenessProbe {} => Some(Message::LivenessReply {}),
            Message::LivenessReply {} => {
                self.on_liveness_reply(&from);
                None
            }
        };

        if let Some(message) = reply {
            self.send_to(&from, message).await;
        }
    }

    /// Receiving side of a load query: always answered, never dropped.
    fn on_load_request(&self, from: &AgentId, sender_load: f64) -> Option<Message> {
        let (load, item_count) = {
            let inner = self.inner().lock();
            (inner.ledger.total_load(), inner.ledger.item_count())
        };
        log::debug!(
            "[{}] load query from {} (their load {:.2}); reporting {:.2}",
            self.id(),
            from,
            sender_load,
            load
        );
        Some(Message::LoadReply {
            load,
            item_count,
            capabilities: self.capabilities().clone(),
        })
    }

    /// The decision step of a round: compare loads, maybe propose a
    /// transfer.
    fn on_load_reply(
        &self,
        from: &AgentId,
        peer_load: f64,
        peer_capabilities: HashSet<String>,
    ) -> Option<Message> {
        let mut inner = self.inner().lock();

        match &inner.negotiation {
            Some(negotiation)
                if negotiation.phase == NegotiationPhase::AwaitingLoadReply
                    && negotiation.chosen_neighbor.address == *from => {}
            _ => {
                log::debug!("[{}] discarding stale load_reply from {}", self.id(), from);
                return None;
            }
        }

        let my_load = inner.ledger.total_load();
        match compare_loads(my_load, peer_load, self.config().balance_threshold) {
            LoadDecision::Balanced => {
                log::info!(
                    "[{}] balanced with {} ({:.2} vs {:.2}); round ends",
                    self.id(),
                    from,
                    my_load,
                    peer_load
                );
                inner.negotiation = None;
                None
            }
            LoadDecision::PeerHeavier => {
                // The lighter side never initiates; wait for the peer's
                // own next round.
                log::debug!(
                    "[{}] {} is heavier ({:.2} vs {:.2}); staying passive",
                    self.id(),
                    from,
                    peer_load,
                    my_load
                );
                inner.negotiation = None;
                None
            }
            LoadDecision::Shed { amount } => {
                let candidate =
                    select_item_to_shed(inner.ledger.items(), amount, &peer_capabilities).cloned();
                let Some(item) = candidate else {
                    log::info!(
                        "[{}] nothing transferable to {} (target {:.2}); round ends",
                        self.id(),
                        from,
                        amount
                    );
                    inner.negotiation = None;
                    return None;
                };

                let transfer_id = Uuid::new_v4();
                if let Some(negotiation) = inner.negotiation.as_mut() {
                    negotiation.phase = NegotiationPhase::AwaitingTransferConfirm;
                    negotiation.candidate_item = Some(item.clone());
                    negotiation.transfer_id = Some(transfer_id);
                }
                log::info!(
                    "[{}] proposing transfer of {:.2} to {} (target {:.2})",
                    self.id(),
                    item.magnitude,
                    from,
                    amount
                );
                Some(Message::TransferRequest {
                    transfer_id,
                    expected_new_sender_load: my_load - item.magnitude,
                    item,
                })
            }
        }
    }

    /// Receiving side of a transfer: admission check, ledger add,
    /// persistence attempt, confirmation.
    async fn on_transfer_request(
        &self,
        from: &AgentId,
        transfer_id: Uuid,
        item: Item,
    ) -> Option<Message> {
        let new_load = {
            let mut inner = self.inner().lock();

            // A retried request is answered with the recorded outcome;
            // the ledger is never touched twice for one transfer.
            if let Some(previous) = inner.recent_transfers.get(&transfer_id) {
                log::info!(
                    "[{}] duplicate transfer_request {} from {}; replaying outcome",
                    self.id(),
                    transfer_id,
                    from
                );
                return Some(previous.clone());
            }

            if !item.compatible_with(self.capabilities()) {
                let missing: Vec<&str> = item
                    .requires
                    .difference(self.capabilities())
                    .map(String::as_str)
                    .collect();
                log::warn!(
                    "[{}] rejecting item from {}: missing capabilities {:?}",
                    self.id(),
                    from,
                    missing
                );
                let reply = Message::TransferConfirmError {
                    transfer_id,
                    error: format!("missing required capabilities: {}", missing.join(", ")),
                };
                inner.recent_transfers.record(transfer_id, reply.clone());
                return Some(reply);
            }

            inner.ledger.add(item);
            inner.ledger.total_load()
        };

        // Persistence failure does not roll back the acceptance; the
        // save is retried by the backup timer.
        let persisted = self.persist("save after accepting transfer");
        let reply = Message::TransferConfirm {
            transfer_id,
            accepted: true,
            new_receiver_load: new_load,
            persisted,
        };
        self.inner()
            .lock()
            .recent_transfers
            .record(transfer_id, reply.clone());
        log::info!(
            "[{}] accepted transfer from {}; new load {:.2} (persisted: {})",
            self.id(),
            from,
            new_load,
            persisted
        );
        Some(reply)
    }

    /// Completion of a round: the peer took the item, remove it here.
    fn on_transfer_confirm(&self, from: &AgentId, transfer_id: Uuid, accepted: bool) {
        let completed = {
            let mut inner = self.inner().lock();

            let matches = matches!(
                &inner.negotiation,
                Some(negotiation)
                    if negotiation.phase == NegotiationPhase::AwaitingTransferConfirm
                        && negotiation.chosen_neighbor.address == *from
                        && negotiation.transfer_id == Some(transfer_id)
            );
            if !matches {
                log::debug!(
                    "[{}] discarding stale transfer_confirm from {}",
                    self.id(),
                    from
                );
                return;
            }

            if !accepted {
                log::info!(
                    "[{}] {} declined the transfer; item stays here",
                    self.id(),
                    from
                );
                inner.negotiation = None;
                return;
            }

            let candidate_id = inner
                .negotiation
                .as_ref()
                .and_then(|negotiation| negotiation.candidate_item.as_ref())
                .map(|item| item.id);
            inner.negotiation = None;

            match candidate_id {
                Some(item_id) => match inner.ledger.remove(&item_id) {
                    Ok(item) => {
                        log::info!(
                            "[{}] transferred {:.2} to {}; new load {:.2}",
                            self.id(),
                            item.magnitude,
                            from,
                            inner.ledger.total_load()
                        );
                        true
                    }
                    Err(error) => {
                        log::error!("[{}] transfer completion failed: {}", self.id(), error);
                        false
                    }
                },
                None => {
                    log::error!(
                        "[{}] transfer_confirm matched a round without a candidate item",
                        self.id()
                    );
                    false
                }
            }
        };

        if completed {
            self.persist("save after completed transfer");
        }
    }

    /// Error reply for the current round: abort it. Anything not
    /// matching the round is stale and ignored.
    fn on_reply_error(&self, from: &AgentId, expected_phase: NegotiationPhase, error: &str) {
        let mut inner = self.inner().lock();
        let matches = matches!(
            &inner.negotiation,
            Some(negotiation)
                if negotiation.phase == expected_phase
                    && negotiation.chosen_neighbor.address == *from
        );
        if matches {
            log::info!(
                "[{}] {} reported an error, aborting round: {}",
                self.id(),
                from,
                error
            );
            inner.negotiation = None;
        } else {
            log::debug!("[{}] discarding stale error reply from {}", self.id(), from);
        }
    }

    /// Heartbeat answer from the chosen neighbor clears the pending
    /// probe; anything else leaves it pending for the monitor to act on.
    fn on_liveness_reply(&self, from: &AgentId) {
        let mut inner = self.inner().lock();
        if let Some(negotiation) = inner.negotiation.as_mut() {
            if negotiation.chosen_neighbor.address == *from {
                negotiation.probe_pending = false;
            }
        }
    }
}
