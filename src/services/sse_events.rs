use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        match_state::MatchSummary,
        sse::{MatchAdoptedEvent, ServerEvent, SystemStatus},
    },
    state::{SharedState, session::MatchState},
};

pub(crate) const EVENT_MATCH_STATE: &str = "match.state";
const EVENT_MATCH_ADOPTED: &str = "match.adopted";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the full summary of the active match.
pub fn broadcast_match_state(state: &SharedState, current: &MatchState) {
    let summary = MatchSummary::build(current, state.players());
    send_public_event(state, EVENT_MATCH_STATE, &summary);
}

/// Broadcast that a remote copy replaced the local match.
pub fn broadcast_match_adopted(state: &SharedState, match_id: Uuid, previous_match_id: Uuid) {
    let payload = MatchAdoptedEvent {
        match_id,
        previous_match_id,
    };
    send_public_event(state, EVENT_MATCH_ADOPTED, &payload);
}

/// Broadcast the degraded flag.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Forward every degraded-mode transition to the public stream.
pub fn spawn_status_forwarder(state: SharedState) -> JoinHandle<()> {
    let mut watcher = state.degraded_watcher();
    tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let degraded = *watcher.borrow_and_update();
            info!(degraded, "storage status changed");
            broadcast_system_status(&state, degraded);
        }
    })
}

/// Encode a public event, logging payloads that fail to serialize.
pub(crate) fn encode_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize public SSE payload");
            None
        }
    }
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    if let Some(event) = encode_event(event, payload) {
        state.public_sse().broadcast(event);
    }
}
