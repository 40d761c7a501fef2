/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Outbound transport seam.

use bytes::Bytes;
use fixgate_core::SessionId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors reported by a [`MessageSender`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// No transport is attached to the session.
    #[error("transport disconnected")]
    Disconnected,

    /// The transport failed to accept the message.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Delivers encoded messages to the counterparty.
///
/// Sending must not block; implementations hand the bytes to a writer task.
/// A failed send does not undo the store write that preceded it.
pub trait MessageSender: Send + Sync {
    /// Queues one encoded message for delivery.
    ///
    /// # Errors
    /// Returns `SendError` if the transport cannot take the message.
    fn send(&self, session_id: &SessionId, message: Bytes) -> Result<(), SendError>;
}

/// Sender backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSender {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelSender {
    /// Wraps the sending half of a channel.
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self { tx }
    }

    /// Creates a sender together with its receiving half.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl MessageSender for ChannelSender {
    fn send(&self, _session_id: &SessionId, message: Bytes) -> Result<(), SendError> {
        self.tx.send(message).map_err(|_| SendError::Disconnected)
    }
}
