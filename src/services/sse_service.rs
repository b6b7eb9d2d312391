use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::{
        match_state::MatchSummary,
        sse::{Handshake, ServerEvent},
    },
    services::sse_events::{EVENT_MATCH_STATE, encode_event},
    state::SharedState,
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe to the shared public SSE stream.
pub fn subscribe_public(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.public_sse().subscribe()
}

/// Events a new client receives before any broadcast: the handshake, then the
/// current match so it does not have to wait for the next change.
pub async fn initial_events(state: &SharedState) -> Vec<ServerEvent> {
    let handshake = Handshake {
        stream: "public".into(),
        message: "public stream connected".into(),
        degraded: state.is_degraded(),
    };
    let summary = state
        .read_session(|session| MatchSummary::build(session.state(), state.players()))
        .await;

    [
        encode_event(EVENT_HANDSHAKE, &handshake),
        encode_event(EVENT_MATCH_STATE, &summary),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Convert a broadcast receiver into an SSE response, sending `initial` first
/// and forwarding events until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Vec<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Every match.state carries the full summary, the next one catches up.
                            debug!(skipped, "public SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!("Public SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
