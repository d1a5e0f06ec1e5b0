//! Transport event loop — fans engine events out to the session.
//!
//! One task per call leg. Locally discovered candidates go to the signaling
//! collaborator for transmission, connectivity transitions are logged and fed
//! to the health monitor, and its terminate decision is forwarded to the
//! owning session as a command.

use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use super::health::HealthMonitor;
use super::signaling::OutboundCandidateTx;
use super::transport::TransportEvent;
use super::SessionCommand;

/// Drain the engine's event stream until it closes.
pub async fn run_event_loop(
    call_id: Uuid,
    mut events: broadcast::Receiver<TransportEvent>,
    outbound: OutboundCandidateTx,
    commands: mpsc::UnboundedSender<SessionCommand>,
) {
    let mut monitor = HealthMonitor::new();
    loop {
        match events.recv().await {
            Ok(TransportEvent::CandidateDiscovered(candidate)) => {
                tracing::debug!("[{}] ICE candidate gathered: {}", call_id, candidate.candidate);
                if outbound.send(candidate).is_err() {
                    tracing::debug!("[{}] signaling side gone, dropping local candidate", call_id);
                }
            }
            Ok(TransportEvent::ConnectionStateChanged(state)) => {
                tracing::info!("[{}] ICE connection state changed to {:?}", call_id, state);
                if let Some(request) = monitor.observe(state) {
                    let _ = commands.send(SessionCommand::Terminate(request));
                }
            }
            Ok(TransportEvent::GatheringComplete) => {
                tracing::debug!("[{}] ICE gathering finished", call_id);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("[{}] transport event stream lagged by {}", call_id, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::transport::{CandidateInit, ConnectionState};
    use super::super::{Cause, TerminateRequest};
    use super::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("callrtc=debug")
            .with_test_writer()
            .try_init();
    }

    fn candidate(line: &str) -> CandidateInit {
        CandidateInit {
            sdp_mid: Some("audio".to_string()),
            sdp_mline_index: Some(0),
            candidate: line.to_string(),
        }
    }

    #[tokio::test]
    async fn test_local_candidates_forwarded_in_order() {
        init_tracing();
        let (tx, events) = broadcast::channel(8);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_event_loop(Uuid::new_v4(), events, out_tx, cmd_tx));

        tx.send(TransportEvent::CandidateDiscovered(candidate("a=candidate:1")))
            .unwrap();
        tx.send(TransportEvent::CandidateDiscovered(candidate("a=candidate:2")))
            .unwrap();

        assert_eq!(out_rx.recv().await.unwrap().candidate, "a=candidate:1");
        assert_eq!(out_rx.recv().await.unwrap().candidate, "a=candidate:2");

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sustained_loss_terminates_once() {
        init_tracing();
        let (tx, events) = broadcast::channel(8);
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_event_loop(Uuid::new_v4(), events, out_tx, cmd_tx));

        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
        ] {
            tx.send(TransportEvent::ConnectionStateChanged(state)).unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(
            cmd_rx.recv().await.unwrap(),
            SessionCommand::Terminate(TerminateRequest {
                cause: Cause::MediaTimeout,
                status_code: 200,
                reason: "Media Timeout".to_string(),
            })
        );
        assert!(cmd_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_loop_survives_closed_signaling_side() {
        let (tx, events) = broadcast::channel(8);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        drop(out_rx);
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_event_loop(Uuid::new_v4(), events, out_tx, cmd_tx));

        tx.send(TransportEvent::CandidateDiscovered(candidate("a=candidate:1")))
            .unwrap();
        tx.send(TransportEvent::ConnectionStateChanged(ConnectionState::Failed))
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        // the health monitor still saw the loss
        assert!(matches!(
            cmd_rx.recv().await,
            Some(SessionCommand::Terminate(_))
        ));
    }
}
