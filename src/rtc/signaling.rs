//! Signaling collaborator seam.
//!
//! The dialog layer delivers inbound info messages as [`InfoRequest`] values
//! and receives locally discovered candidates on an outbound channel. How
//! either travels on the wire is the dialog layer's business.

use tokio::sync::{mpsc, oneshot};

use super::transport::CandidateInit;

/// Channel handing locally discovered candidates to the signaling layer for
/// transmission.
pub type OutboundCandidateTx = mpsc::UnboundedSender<CandidateInit>;

/// An inbound protocol message with a one-shot reply capability.
#[derive(Debug)]
pub struct InfoRequest {
    pub body: Option<String>,
    reply_tx: oneshot::Sender<u16>,
}

impl InfoRequest {
    /// Pair a request with the receiver on which the dialog layer observes
    /// the status reply.
    pub fn new(body: Option<String>) -> (Self, oneshot::Receiver<u16>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        (Self { body, reply_tx }, reply_rx)
    }

    /// Send the protocol status reply. The dialog layer may already be gone
    /// during teardown; the reply is then dropped.
    pub fn reply(self, status_code: u16) {
        let _ = self.reply_tx.send(status_code);
    }
}
