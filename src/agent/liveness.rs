//! Liveness monitor: heartbeats to the chosen neighbor while a round is
//! in flight.
//!
//! A probe left unanswered by the next monitor tick means the neighbor
//! has disappeared mid-round; the round is aborted so the agent can
//! never be stuck waiting on a dead peer.

use crate::directory::AgentId;
use crate::protocol::Message;

use super::WorkerAgent;

enum ProbeAction {
    Idle,
    Abort(AgentId),
    Probe(AgentId),
}

impl WorkerAgent {
    /// One monitor tick: probe the chosen neighbor, or abort the round
    /// when the previous probe went unanswered.
    pub(crate) async fn liveness_tick(&self) {
        let action = {
            let mut inner = self.inner().lock();
            let action = match inner.negotiation.as_mut() {
                None => ProbeAction::Idle,
                Some(negotiation) if negotiation.probe_pending => {
                    ProbeAction::Abort(negotiation.chosen_neighbor.address.clone())
                }
                Some(negotiation) => {
                    negotiation.probe_pending = true;
                    ProbeAction::Probe(negotiation.chosen_neighbor.address.clone())
                }
            };
            if let ProbeAction::Abort(_) = &action {
                inner.negotiation = None;
            }
            action
        };

        match action {
            ProbeAction::Idle => {}
            ProbeAction::Abort(neighbor) => {
                log::warn!(
                    "[{}] {} did not answer the liveness probe; aborting round",
                    self.id(),
                    neighbor
                );
            }
            ProbeAction::Probe(neighbor) => {
                log::debug!("[{}] probing {}", self.id(), neighbor);
                self.send_or_abort(&neighbor, Message::LivenessProbe {}).await;
            }
        }
    }
}
