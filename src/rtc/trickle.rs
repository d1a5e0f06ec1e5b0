//! Trickle ICE completion policy.
//!
//! Decides whether an offer/answer attempt may complete as soon as its local
//! description is committed, or must wait for exhaustive candidate gathering.
//! Trickle-capable peers receive later candidates incrementally over
//! signaling; vanilla peers need the description to already contain them all.

use tokio::sync::broadcast;

use super::transport::{ConnectionState, GatheringState, TransportEvent};

/// Trickle mode in effect for one negotiation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrickleMode {
    /// We declared full trickle (offerer side).
    Full,
    /// The remote signaled trickle support (answerer side).
    Half,
    /// Vanilla ICE.
    None,
}

/// Completion decision taken at local-description commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Immediate,
    AwaitGathering,
}

/// Decide when the attempt may signal completion.
pub fn evaluate(
    gathering: GatheringState,
    connection: ConnectionState,
    mode: TrickleMode,
) -> Completion {
    if gathering == GatheringState::Complete && connection == ConnectionState::Connected {
        return Completion::Immediate;
    }
    match mode {
        TrickleMode::Full | TrickleMode::Half => Completion::Immediate,
        TrickleMode::None => Completion::AwaitGathering,
    }
}

/// Wait for the engine's gathering-exhausted notification.
///
/// Completes on the first `GatheringComplete` event and drops the
/// registration with the returned receiver; other events on the stream are
/// ignored. A lagged or closed stream ends the wait rather than stalling the
/// attempt forever.
pub async fn wait_for_gathering(events: &mut broadcast::Receiver<TransportEvent>) {
    loop {
        match events.recv().await {
            Ok(TransportEvent::GatheringComplete) => return,
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // the completion may have been among the skipped events
                tracing::warn!("transport event stream lagged by {}, ending wait", skipped);
                return;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
