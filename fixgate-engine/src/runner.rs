/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-session event loop.
//!
//! A [`SessionRunner`] is the only owner of a session's [`StateMachine`].
//! Inbound frames, timer expiries and local commands all arrive on one mpsc
//! channel and are handled strictly one at a time.

use crate::handle::SessionHandle;
use crate::timers::TimerManager;
use bytes::Bytes;
use fixgate_core::Message;
use fixgate_core::error::FixError;
use fixgate_session::{SessionState, StateMachine, Timeout};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Reply channel for commands that report a result.
pub type Reply<T> = oneshot::Sender<Result<T, FixError>>;

/// One unit of work for a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// A raw frame read from the transport.
    Inbound(Bytes),
    /// A timer expired.
    Timeout {
        /// Which timer.
        timeout: Timeout,
        /// Arm the expiry belongs to; stale arms are dropped.
        generation: u64,
    },
    /// Wait for the counterparty's Logon.
    Accept(Reply<()>),
    /// Send our Logon.
    Logon(Reply<()>),
    /// Send Logout with optional text.
    Logout {
        /// Text(58) for the Logout.
        text: Option<String>,
        /// Result of sending.
        reply: Reply<()>,
    },
    /// Send a message through the session.
    Send {
        /// Message to send; the header is stamped by the session.
        message: Message,
        /// Sequence number used, or the error.
        reply: Reply<u64>,
    },
    /// The transport was lost.
    Disconnect,
    /// Stop the runner.
    Shutdown,
}

/// Drives one session's state machine from its event channel.
#[derive(Debug)]
pub struct SessionRunner {
    machine: StateMachine,
    events: mpsc::Receiver<SessionEvent>,
    timers: TimerManager,
    state_tx: watch::Sender<SessionState>,
    closed: Arc<Notify>,
}

impl SessionRunner {
    /// Creates a runner and the handle that feeds it.
    ///
    /// `capacity` bounds the event channel; it is raised to at least 1.
    #[must_use]
    pub fn new(machine: StateMachine, capacity: usize) -> (Self, SessionHandle) {
        let (events_tx, events) = mpsc::channel(capacity.max(1));
        let (state_tx, state_rx) = watch::channel(machine.state());
        let closed = Arc::new(Notify::new());
        let handle = SessionHandle::new(
            machine.session().session_id().clone(),
            events_tx.clone(),
            state_rx,
            Arc::clone(&closed),
        );
        let runner = Self {
            machine,
            events,
            timers: TimerManager::new(events_tx.downgrade()),
            state_tx,
            closed,
        };
        (runner, handle)
    }

    /// Returns the state machine.
    #[must_use]
    pub const fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Processes events until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        let session_id = self.machine.session().session_id().clone();
        info!(session = %session_id, "session runner started");

        while let Some(event) = self.events.recv().await {
            let stop = matches!(event, SessionEvent::Shutdown);
            self.dispatch(event).await;
            self.after_event();
            if stop {
                break;
            }
        }

        self.timers.cancel_all();
        if let Err(err) = self.machine.session().store().close().await {
            warn!(session = %session_id, error = %err, "failed to close store");
        }
        info!(session = %session_id, "session runner stopped");
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Inbound(frame) => {
                self.machine.handle_bytes(&frame).await;
            }
            SessionEvent::Timeout {
                timeout,
                generation,
            } => {
                if self.timers.take_expired(timeout, generation) {
                    debug!(session = %self.machine.session().session_id(), %timeout, "timeout");
                    self.machine.handle_timeout(timeout).await;
                }
            }
            SessionEvent::Accept(reply) => {
                let result = self.machine.accept().map_err(FixError::from);
                self.respond(reply, result);
            }
            SessionEvent::Logon(reply) => {
                let result = self.machine.initiate_logon().await;
                self.respond(reply, result);
            }
            SessionEvent::Logout { text, reply } => {
                let result = self.machine.initiate_logout(text.as_deref()).await;
                self.respond(reply, result);
            }
            SessionEvent::Send { message, reply } => {
                let result = self.machine.send(message).await;
                self.respond(reply, result);
            }
            SessionEvent::Disconnect => self.disconnect().await,
            SessionEvent::Shutdown => {
                if self.machine.state() != SessionState::Latent {
                    self.disconnect().await;
                }
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Err(err) = self.machine.disconnect().await {
            warn!(session = %self.machine.session().session_id(), error = %err, "disconnect failed");
        }
    }

    /// Publishes the new state before the caller sees the result.
    fn respond<T>(&mut self, reply: Reply<T>, result: Result<T, FixError>) {
        self.after_event();
        let _ = reply.send(result);
    }

    fn after_event(&mut self) {
        let session = self.machine.session_mut();
        for command in session.take_timer_commands() {
            self.timers.apply(command);
        }
        if session.take_disconnect_request() {
            debug!(session = %session.session_id(), "transport close requested");
            self.closed.notify_one();
        }
        self.state_tx.send_replace(self.machine.state());
    }
}
