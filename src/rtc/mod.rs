//! Per-call RTC session plumbing — negotiation, candidate exchange, health.

pub mod candidate;
pub mod events;
pub mod health;
pub mod interop;
pub mod negotiation;
pub mod signaling;
pub mod transport;
pub mod trickle;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side placed the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Canonical cause strings carried in events and terminate requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    MediaTimeout,
    BadMediaDescription,
}

impl Cause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cause::MediaTimeout => "Media Timeout",
            Cause::BadMediaDescription => "Bad Media Description",
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a candidate originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Originator {
    Local,
    Remote,
}

/// Events surfaced to the owning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A candidate was applied to the transport engine.
    CandidateSucceeded { originator: Originator },
    /// The transport engine rejected a candidate.
    CandidateFailed { originator: Originator, cause: Cause },
}

/// Requests the owning session end the call.
///
/// Termination on media loss is cooperative shutdown, so the status code is a
/// success-style 200, not a protocol rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminateRequest {
    pub cause: Cause,
    pub status_code: u16,
    pub reason: String,
}

/// Commands issued to the owning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Terminate(TerminateRequest),
}
