//! Transport engine contract — the narrow surface the negotiation core drives.
//!
//! The actual ICE/media engine (candidate gathering, connectivity checks,
//! packet transport) lives behind [`MediaTransport`]. The core only creates
//! and commits descriptions, applies remote candidates, reads two state
//! values, and listens on the engine's event stream.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Kind tag of a session description in the offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionKind {
    Offer,
    Answer,
    ProvisionalAnswer,
}

impl DescriptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionKind::Offer => "offer",
            DescriptionKind::Answer => "answer",
            DescriptionKind::ProvisionalAnswer => "pranswer",
        }
    }
}

impl fmt::Display for DescriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session description as exchanged with the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: DescriptionKind,
    pub sdp: String,
}

/// Candidate descriptor handed to or surfaced by the engine.
///
/// `candidate` holds the full `a=candidate:` attribute line as it appeared on
/// the wire; `sdp_mid`/`sdp_mline_index` locate the media section it belongs
/// to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInit {
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u32>,
    pub candidate: String,
}

/// Constraints forwarded opaquely to the engine's offer/answer calls.
///
/// Engines accept free-form constraint structures; anything beyond the two
/// common flags rides along in `extra` untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConstraints {
    #[serde(default)]
    pub audio: bool,
    #[serde(default)]
    pub video: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// ICE candidate gathering state, owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatheringState {
    New,
    Gathering,
    Complete,
}

/// ICE connection state, owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// Events published by the engine on its broadcast stream.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A local candidate was gathered and should be signaled to the remote.
    CandidateDiscovered(CandidateInit),
    /// Candidate gathering is exhaustive; the local description is final.
    GatheringComplete,
    ConnectionStateChanged(ConnectionState),
}

/// Opaque failure reported by the engine.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Operations the negotiation core needs from the engine.
///
/// All calls are non-blocking requests completing through the returned
/// future; events arrive on a separate broadcast stream so several observers
/// (completion wait, candidate forwarding, health monitoring) can subscribe
/// independently.
#[allow(async_fn_in_trait)]
pub trait MediaTransport {
    async fn create_offer(
        &self,
        constraints: Option<&MediaConstraints>,
    ) -> Result<SessionDescription, TransportError>;

    async fn create_answer(
        &self,
        constraints: Option<&MediaConstraints>,
    ) -> Result<SessionDescription, TransportError>;

    /// Commit a description as the local end of the exchange.
    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError>;

    /// Apply a description received from the remote end.
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), TransportError>;

    /// Apply a candidate discovered by the remote party.
    async fn add_remote_candidate(&self, candidate: CandidateInit) -> Result<(), TransportError>;

    /// The committed local description, if any. May differ from what was
    /// committed: engines fold late-gathered candidates into it.
    fn local_description(&self) -> Option<SessionDescription>;

    fn gathering_state(&self) -> GatheringState;

    fn connection_state(&self) -> ConnectionState;

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}
