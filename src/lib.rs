//! Media negotiation core for call legs inside a signaling session.
//!
//! Drives an external transport engine through the SDP offer/answer
//! lifecycle, decides when negotiation is complete (trickle vs. vanilla ICE),
//! applies ICE candidates trickled by the remote party, and ends the call on
//! sustained connectivity loss. The engine itself (candidate gathering,
//! packet transport, codecs) and the signaling dialog layer stay behind
//! narrow seams: a trait for engine operations, channels for everything else.

pub mod config;
pub mod rtc;

pub use config::CallConfig;
pub use rtc::candidate::{parse_candidate_block, IceCandidateHandler};
pub use rtc::events::run_event_loop;
pub use rtc::health::HealthMonitor;
pub use rtc::negotiation::{AttemptState, MediaNegotiator, NegotiationError};
pub use rtc::signaling::{InfoRequest, OutboundCandidateTx};
pub use rtc::trickle::TrickleMode;
pub use rtc::transport::{
    CandidateInit, ConnectionState, DescriptionKind, GatheringState, MediaConstraints,
    MediaTransport, SessionDescription, TransportError, TransportEvent,
};
pub use rtc::{Cause, Direction, Originator, SessionCommand, SessionEvent, TerminateRequest};
