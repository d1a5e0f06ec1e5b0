//! Remote candidate ingestion — parse inline info-message bodies and apply
//! the advertised ICE candidate to the transport engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::signaling::InfoRequest;
use super::transport::{CandidateInit, MediaTransport};
use super::{Cause, Originator, SessionEvent};

/// Extract a candidate descriptor from a newline-separated attribute block.
///
/// Relevant lines have the shape `a=<key>:<value>`. Keys: `mid` and
/// `m-line-id` locate the media section (last occurrence wins), `candidate`
/// carries the attribute — the engine wants the entire original line, so the
/// whole line is kept (first occurrence wins). Lines of any other shape are
/// skipped, not errors; bodies with no candidate yield `None`.
pub fn parse_candidate_block(body: &str) -> Option<CandidateInit> {
    let mut sdp_mid = None;
    let mut sdp_mline_index = None;
    let mut candidate: Option<&str> = None;

    for raw in body.lines() {
        let Some((attr, value)) = raw.split_once(':') else {
            continue;
        };
        let Some(name) = attr.strip_prefix("a=") else {
            continue;
        };
        match name {
            // IPv6-style values embed further colons; those lines are not ours.
            "mid" if !value.contains(':') => sdp_mid = Some(value.to_string()),
            "m-line-id" if !value.contains(':') => {
                if let Ok(index) = value.parse() {
                    sdp_mline_index = Some(index);
                }
            }
            "candidate" => {
                candidate.get_or_insert(raw);
            }
            _ => {}
        }
    }

    candidate.map(|line| CandidateInit {
        sdp_mid,
        sdp_mline_index,
        candidate: line.to_string(),
    })
}

/// Applies candidates trickled by the remote party and reports the outcome
/// as session events.
pub struct IceCandidateHandler<T> {
    transport: Arc<T>,
    call_id: Uuid,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<T: MediaTransport> IceCandidateHandler<T> {
    pub fn new(
        transport: Arc<T>,
        call_id: Uuid,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            transport,
            call_id,
            events,
        }
    }

    /// Handle one inbound info message.
    ///
    /// The 200 acknowledgment goes out before the candidate is applied, so
    /// the remote dialog layer never retransmits while local application is
    /// pending or after it failed. Bodies without a candidate line are
    /// acknowledged and ignored; session-level housekeeping arrives on the
    /// same path.
    pub async fn handle_incoming(&self, request: InfoRequest) {
        let parsed = request.body.as_deref().and_then(parse_candidate_block);
        request.reply(200);

        let Some(init) = parsed else {
            return;
        };

        tracing::debug!("[{}] applying remote candidate: {}", self.call_id, init.candidate);
        match self.transport.add_remote_candidate(init).await {
            Ok(()) => {
                let _ = self.events.send(SessionEvent::CandidateSucceeded {
                    originator: Originator::Remote,
                });
            }
            Err(e) => {
                tracing::warn!("[{}] unable to apply remote candidate: {}", self.call_id, e);
                let _ = self.events.send(SessionEvent::CandidateFailed {
                    originator: Originator::Remote,
                    cause: Cause::BadMediaDescription,
                });
            }
        }
    }
}
