//! Connection health monitoring — end the call on sustained media loss.

use super::transport::ConnectionState;
use super::{Cause, TerminateRequest};

/// Watches connectivity-state transitions and produces at most one terminate
/// request for the lifetime of the call.
///
/// Termination is requested immediately on the first transition into a loss
/// state and latched: oscillation between loss and recovery can never fire a
/// second request, and the monitor never attempts reconnection itself.
#[derive(Debug, Default)]
pub struct HealthMonitor {
    terminated: bool,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one observed connectivity-state transition.
    pub fn observe(&mut self, state: ConnectionState) -> Option<TerminateRequest> {
        match state {
            ConnectionState::Disconnected | ConnectionState::Failed if !self.terminated => {
                self.terminated = true;
                Some(TerminateRequest {
                    cause: Cause::MediaTimeout,
                    status_code: 200,
                    reason: Cause::MediaTimeout.as_str().to_string(),
                })
            }
            _ => None,
        }
    }
}
