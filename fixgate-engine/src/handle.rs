/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Cloneable front end of a running session.

use crate::error::EngineError;
use crate::runner::{Reply, SessionEvent};
use bytes::Bytes;
use fixgate_core::{Message, SessionId};
use fixgate_session::SessionState;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc, oneshot, watch};

/// Posts events to a [`SessionRunner`](crate::SessionRunner).
///
/// Every method only enqueues work; the runner handles events in the order
/// they were posted across all clones.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    events: mpsc::Sender<SessionEvent>,
    state: watch::Receiver<SessionState>,
    closed: Arc<Notify>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: SessionId,
        events: mpsc::Sender<SessionEvent>,
        state: watch::Receiver<SessionState>,
        closed: Arc<Notify>,
    ) -> Self {
        Self {
            session_id,
            events,
            state,
            closed,
        }
    }

    /// Returns the session identity.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the state after the last handled event.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns true once the runner has stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.events.is_closed()
    }

    async fn post(&self, event: SessionEvent) -> Result<(), EngineError> {
        self.events
            .send(event)
            .await
            .map_err(|_| EngineError::Stopped)
    }

    async fn request<T>(
        &self,
        event: impl FnOnce(Reply<T>) -> SessionEvent,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.post(event(tx)).await?;
        Ok(rx.await.map_err(|_| EngineError::Stopped)??)
    }

    /// Hands one raw frame read from the transport to the session.
    ///
    /// # Errors
    /// Returns `EngineError::Stopped` if the runner is gone.
    pub async fn inbound(&self, frame: Bytes) -> Result<(), EngineError> {
        self.post(SessionEvent::Inbound(frame)).await
    }

    /// Starts waiting for the counterparty's Logon.
    ///
    /// # Errors
    /// Returns the session error if the session is not `Latent`.
    pub async fn accept(&self) -> Result<(), EngineError> {
        self.request(SessionEvent::Accept).await
    }

    /// Sends our Logon.
    ///
    /// # Errors
    /// Returns the session error if the session is not `Latent` or the Logon
    /// could not be stored.
    pub async fn logon(&self) -> Result<(), EngineError> {
        self.request(SessionEvent::Logon).await
    }

    /// Sends Logout.
    ///
    /// # Errors
    /// Returns the session error if the session is not logged on.
    pub async fn logout(&self, text: Option<&str>) -> Result<(), EngineError> {
        let text = text.map(str::to_string);
        self.request(|reply| SessionEvent::Logout { text, reply })
            .await
    }

    /// Sends a message and returns the sequence number it was given.
    ///
    /// # Errors
    /// Returns the session error if the message cannot be sent in the current
    /// state or could not be stored.
    pub async fn send(&self, message: Message) -> Result<u64, EngineError> {
        self.request(|reply| SessionEvent::Send { message, reply })
            .await
    }

    /// Reports loss of the transport.
    ///
    /// # Errors
    /// Returns `EngineError::Stopped` if the runner is gone.
    pub async fn disconnect(&self) -> Result<(), EngineError> {
        self.post(SessionEvent::Disconnect).await
    }

    /// Stops the runner after the events already queued.
    ///
    /// # Errors
    /// Returns `EngineError::Stopped` if the runner is already gone.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.post(SessionEvent::Shutdown).await
    }

    /// Completes when the session asks for the transport to be closed.
    pub async fn closed(&self) {
        self.closed.notified().await;
    }

    /// Waits until the state satisfies `predicate` and returns it.
    ///
    /// # Errors
    /// Returns `EngineError::Stopped` if the runner stops first.
    pub async fn wait_for_state(
        &self,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> Result<SessionState, EngineError> {
        let mut state = self.state.clone();
        let current = state
            .wait_for(predicate)
            .await
            .map_err(|_| EngineError::Stopped)?;
        Ok(*current)
    }
}
