//! Offer/answer negotiation for a single call leg.
//!
//! `MediaNegotiator` drives the transport engine through description creation
//! and commit, and signals completion per the trickle policy. Each
//! `create_offer`/`create_answer` call is one negotiation attempt; its state
//! is explicit and queryable, and every failure returns the attempt to
//! `Idle` with the underlying cause.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::config::CallConfig;

use super::interop;
use super::transport::{
    DescriptionKind, MediaConstraints, MediaTransport, SessionDescription, TransportError,
};
use super::trickle::{self, Completion, TrickleMode};
use super::Direction;

/// Failure of one negotiation attempt. Local to the attempt; the negotiator
/// is `Idle` again and may be reused.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("unable to create local description: {0}")]
    Describe(#[source] TransportError),
    #[error("unable to commit local description: {0}")]
    Commit(#[source] TransportError),
    #[error("unable to apply remote description: {0}")]
    RemoteDescription(#[source] TransportError),
    #[error("local description missing after commit")]
    DescriptionLost,
}

/// State of the in-flight negotiation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Describing,
    Committing,
    AwaitingCompletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Offerer,
    Answerer,
}

impl Role {
    fn description_kind(self) -> &'static str {
        match self {
            Role::Offerer => "offer",
            Role::Answerer => "answer",
        }
    }
}

/// Negotiates local and remote descriptions for one call leg.
pub struct MediaNegotiator<T> {
    transport: Arc<T>,
    call_id: Uuid,
    direction: Direction,
    /// Session-wide declaration that we do full trickle as offerer.
    full_trickle: bool,
    /// Asterisk answer-body workaround enabled for this session.
    asterisk_compat: bool,
    /// Whether the remote party advertised trickle support.
    remote_trickle: bool,
    state: AttemptState,
}

impl<T: MediaTransport> MediaNegotiator<T> {
    pub fn new(
        transport: Arc<T>,
        call_id: Uuid,
        direction: Direction,
        config: &CallConfig,
    ) -> Self {
        Self {
            transport,
            call_id,
            direction,
            full_trickle: config.ice_full_trickle,
            asterisk_compat: config.asterisk_compat,
            remote_trickle: false,
            state: AttemptState::Idle,
        }
    }

    /// Current attempt state.
    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Whether a new offer/answer attempt may be started.
    pub fn is_ready(&self) -> bool {
        self.state == AttemptState::Idle
    }

    /// Record the remote trickle-support signal discovered by the owning
    /// session; consulted by later `create_answer` attempts.
    pub fn note_remote_trickle_support(&mut self, supported: bool) {
        self.remote_trickle = supported;
    }

    /// Create an offer, commit it locally, and return its text once the
    /// trickle policy allows completion.
    pub async fn create_offer(
        &mut self,
        constraints: Option<&MediaConstraints>,
    ) -> Result<String, NegotiationError> {
        self.negotiate(Role::Offerer, constraints).await
    }

    /// Create an answer, commit it locally, and return its text once the
    /// trickle policy allows completion.
    pub async fn create_answer(
        &mut self,
        constraints: Option<&MediaConstraints>,
    ) -> Result<String, NegotiationError> {
        self.negotiate(Role::Answerer, constraints).await
    }

    async fn negotiate(
        &mut self,
        role: Role,
        constraints: Option<&MediaConstraints>,
    ) -> Result<String, NegotiationError> {
        // One attempt at a time per leg; overlapping attempts are a caller bug.
        debug_assert!(self.is_ready(), "negotiation attempt already in progress");

        self.state = AttemptState::Describing;
        let created = match role {
            Role::Offerer => self.transport.create_offer(constraints).await,
            Role::Answerer => self.transport.create_answer(constraints).await,
        };
        let desc = match created {
            Ok(desc) => desc,
            Err(e) => {
                self.state = AttemptState::Idle;
                tracing::error!(
                    "[{}] unable to create {}: {}",
                    self.call_id,
                    role.description_kind(),
                    e
                );
                return Err(NegotiationError::Describe(e));
            }
        };

        // Subscribe before sampling gathering/connection state so a
        // completion landing between the two is not missed.
        let mut events = self.transport.subscribe();

        self.state = AttemptState::Committing;
        if let Err(e) = self.transport.set_local_description(desc).await {
            self.state = AttemptState::Idle;
            tracing::error!("[{}] unable to set local description: {}", self.call_id, e);
            return Err(NegotiationError::Commit(e));
        }

        let mode = self.trickle_mode(role);
        let decision = trickle::evaluate(
            self.transport.gathering_state(),
            self.transport.connection_state(),
            mode,
        );
        if decision == Completion::AwaitGathering {
            tracing::debug!(
                "[{}] waiting for ICE gathering before completing {}",
                self.call_id,
                role.description_kind()
            );
            self.state = AttemptState::AwaitingCompletion;
            trickle::wait_for_gathering(&mut events).await;
        }

        self.state = AttemptState::Idle;
        // Re-read the committed description: during a vanilla-mode wait the
        // engine folds gathered candidates into it.
        self.transport
            .local_description()
            .map(|desc| desc.sdp)
            .ok_or(NegotiationError::DescriptionLost)
    }

    fn trickle_mode(&self, role: Role) -> TrickleMode {
        match role {
            Role::Offerer if self.full_trickle => TrickleMode::Full,
            Role::Answerer if self.remote_trickle => TrickleMode::Half,
            _ => TrickleMode::None,
        }
    }

    /// Apply a description received from the signaling layer as the remote
    /// end of the exchange.
    pub async fn apply_remote_description(
        &self,
        kind: DescriptionKind,
        body: &str,
    ) -> Result<(), NegotiationError> {
        let interop_active = self.asterisk_compat && self.direction == Direction::Outgoing;

        let corrected;
        let mut body = body;
        if interop_active {
            if let Some(local) = self.transport.local_description() {
                if let Some(fixed) = interop::correct_audio_proto(body, &local.sdp) {
                    corrected = fixed;
                    body = &corrected;
                }
            }
            // Engines commonly reject pranswer as a remote description;
            // Asterisk sends one anyway. Drop it on the floor.
            if kind == DescriptionKind::ProvisionalAnswer {
                tracing::debug!("[{}] discarding provisional answer", self.call_id);
                return Ok(());
            }
        }

        self.transport
            .set_remote_description(SessionDescription {
                kind,
                sdp: body.to_string(),
            })
            .await
            .map_err(|e| {
                tracing::error!("[{}] unable to set remote description: {}", self.call_id, e);
                NegotiationError::RemoteDescription(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, task};

    use super::super::transport::testing::MockTransport;
    use super::super::transport::{ConnectionState, GatheringState, TransportEvent};
    use super::*;

    fn negotiator(
        transport: Arc<MockTransport>,
        direction: Direction,
        config: &CallConfig,
    ) -> MediaNegotiator<MockTransport> {
        MediaNegotiator::new(transport, Uuid::new_v4(), direction, config)
    }

    fn trickle_config() -> CallConfig {
        CallConfig {
            ice_full_trickle: true,
            ..CallConfig::default()
        }
    }

    fn compat_config() -> CallConfig {
        CallConfig {
            asterisk_compat: true,
            ..CallConfig::default()
        }
    }

    #[tokio::test]
    async fn test_full_trickle_offer_completes_at_commit() {
        let transport = Arc::new(MockTransport::with_sdp("v=0\r\nm=audio 9 RTP/SAVPF 0\r\n"));
        let mut neg = negotiator(transport, Direction::Outgoing, &trickle_config());

        let sdp = neg.create_offer(None).await.unwrap();
        assert_eq!(sdp, "v=0\r\nm=audio 9 RTP/SAVPF 0\r\n");
        assert!(neg.is_ready());
    }

    #[tokio::test]
    async fn test_exhaustive_and_connected_completes_without_trickle() {
        let transport = Arc::new(MockTransport::new());
        transport.set_states(GatheringState::Complete, ConnectionState::Connected);
        let mut neg = negotiator(transport, Direction::Outgoing, &CallConfig::default());

        neg.create_offer(None).await.unwrap();
        assert!(neg.is_ready());
    }

    #[test]
    fn test_vanilla_offer_waits_for_gathering() {
        let transport = Arc::new(MockTransport::new());
        let mut neg = negotiator(transport.clone(), Direction::Outgoing, &CallConfig::default());

        let mut attempt = task::spawn(neg.create_offer(None));
        assert_pending!(attempt.poll());

        // candidates gathered while waiting end up in the returned text
        transport.amend_local_sdp("v=0\r\nm=audio 54400 RTP/SAVPF 0\r\na=candidate:1 1 UDP 1 192.0.2.1 54400 typ host\r\n");
        transport.fire_gathering_complete();
        assert!(attempt.is_woken());

        let sdp = assert_ready!(attempt.poll()).unwrap();
        assert!(sdp.contains("a=candidate:1"));
        drop(attempt);
        assert!(neg.is_ready());
    }

    #[test]
    fn test_duplicate_gathering_notification_completes_once() {
        let transport = Arc::new(MockTransport::new());
        let mut neg = negotiator(transport.clone(), Direction::Incoming, &CallConfig::default());

        let mut attempt = task::spawn(neg.create_answer(None));
        assert_pending!(attempt.poll());

        transport.fire_gathering_complete();
        transport.fire(TransportEvent::GatheringComplete);

        assert_ready!(attempt.poll()).unwrap();
        drop(attempt);
        assert!(neg.is_ready());
    }

    #[tokio::test]
    async fn test_answer_with_remote_trickle_support_completes_at_commit() {
        let transport = Arc::new(MockTransport::new());
        let mut neg = negotiator(transport, Direction::Incoming, &CallConfig::default());
        neg.note_remote_trickle_support(true);

        neg.create_answer(None).await.unwrap();
        assert!(neg.is_ready());
    }

    #[tokio::test]
    async fn test_create_failure_returns_idle() {
        let transport = Arc::new(MockTransport::failing_create());
        let mut neg = negotiator(transport, Direction::Outgoing, &trickle_config());

        let err = neg.create_offer(None).await.unwrap_err();
        assert!(matches!(err, NegotiationError::Describe(_)));
        assert!(neg.is_ready());
    }

    #[tokio::test]
    async fn test_commit_failure_returns_idle() {
        let transport = Arc::new(MockTransport::failing_commit());
        let mut neg = negotiator(transport, Direction::Outgoing, &trickle_config());

        let err = neg.create_offer(None).await.unwrap_err();
        assert!(matches!(err, NegotiationError::Commit(_)));
        assert!(neg.is_ready());
    }

    #[tokio::test]
    async fn test_remote_answer_applied() {
        let transport = Arc::new(MockTransport::new());
        let neg = negotiator(transport.clone(), Direction::Outgoing, &CallConfig::default());

        neg.apply_remote_description(DescriptionKind::Answer, "v=0\r\n")
            .await
            .unwrap();
        let remote = transport.remote.lock().unwrap().clone().unwrap();
        assert_eq!(remote.kind, DescriptionKind::Answer);
        assert_eq!(remote.sdp, "v=0\r\n");
    }

    #[tokio::test]
    async fn test_remote_apply_failure_surfaces() {
        let transport = Arc::new(MockTransport::failing_remote());
        let neg = negotiator(transport, Direction::Outgoing, &CallConfig::default());

        let err = neg
            .apply_remote_description(DescriptionKind::Answer, "v=0\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::RemoteDescription(_)));
    }

    #[tokio::test]
    async fn test_interop_rewrites_downgraded_answer() {
        let transport = Arc::new(MockTransport::with_sdp(
            "v=0\r\nm=audio 54400 UDP/TLS/RTP/SAVPF 0\r\n",
        ));
        let mut neg = negotiator(
            transport.clone(),
            Direction::Outgoing,
            &CallConfig {
                ice_full_trickle: true,
                asterisk_compat: true,
                ..CallConfig::default()
            },
        );

        neg.create_offer(None).await.unwrap();
        neg.apply_remote_description(
            DescriptionKind::Answer,
            "v=0\r\nm=audio 31000 RTP/AVP 0\r\na=fingerprint:sha-256 CC:DD\r\n",
        )
        .await
        .unwrap();

        let remote = transport.remote.lock().unwrap().clone().unwrap();
        assert!(remote.sdp.contains("m=audio 31000 UDP/TLS/RTP/SAVPF 0"));
    }

    #[tokio::test]
    async fn test_provisional_answer_discarded_under_interop() {
        let transport = Arc::new(MockTransport::new());
        let neg = negotiator(transport.clone(), Direction::Outgoing, &compat_config());

        neg.apply_remote_description(DescriptionKind::ProvisionalAnswer, "v=0\r\n")
            .await
            .unwrap();
        assert!(transport.remote.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provisional_answer_applied_without_interop() {
        let transport = Arc::new(MockTransport::new());
        let neg = negotiator(transport.clone(), Direction::Outgoing, &CallConfig::default());

        neg.apply_remote_description(DescriptionKind::ProvisionalAnswer, "v=0\r\n")
            .await
            .unwrap();
        assert!(transport.remote.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_provisional_answer_applied_for_incoming_call() {
        let transport = Arc::new(MockTransport::new());
        let neg = negotiator(transport.clone(), Direction::Incoming, &compat_config());

        neg.apply_remote_description(DescriptionKind::ProvisionalAnswer, "v=0\r\n")
            .await
            .unwrap();
        assert!(transport.remote.lock().unwrap().is_some());
    }
}
