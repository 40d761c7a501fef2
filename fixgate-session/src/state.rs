/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session state machine.
//!
//! [`SessionState`] is a closed set of variants. Each transition takes the
//! current state by value together with the session context and yields the
//! next state; every state accepts every message type and every timeout.
//!
//! ```text
//! Latent ──accept/logon──► LogonPending ──Logon──► InSession ◄──► ResendPending
//!   ▲                          │                      │
//!   └──────── timeout, violation, Logout ◄── LogoutPending ◄──┘
//! ```

use crate::builders;
use crate::session::Session;
use crate::states::{in_session, latent, logon};
use crate::timer::Timeout;
use fixgate_core::error::{FixError, SessionError};
use fixgate_core::Message;
use fixgate_tagvalue::Decoder;
use std::fmt;
use tracing::{info, warn};

/// Current variant of a session's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session traffic expected.
    Latent,
    /// Waiting for the counterparty's Logon.
    LogonPending {
        /// True if this side sent the first Logon.
        initiator: bool,
    },
    /// Handshake complete, normal message flow.
    InSession,
    /// A gap was detected and a ResendRequest is outstanding.
    ResendPending {
        /// First missing sequence number.
        begin: u64,
        /// Last missing sequence number.
        end: u64,
    },
    /// Our Logout was sent, waiting for the counterparty's.
    LogoutPending,
}

impl SessionState {
    /// Returns the name of the state.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Latent => "Latent",
            Self::LogonPending { .. } => "LogonPending",
            Self::InSession => "InSession",
            Self::ResendPending { .. } => "ResendPending",
            Self::LogoutPending => "LogoutPending",
        }
    }

    /// Returns true between a completed logon and the end of the session.
    #[must_use]
    pub const fn is_logged_on(&self) -> bool {
        matches!(
            self,
            Self::InSession | Self::ResendPending { .. } | Self::LogoutPending
        )
    }

    /// Returns true if application messages may be sent.
    #[must_use]
    pub const fn accepts_app_messages(&self) -> bool {
        matches!(self, Self::InSession | Self::ResendPending { .. })
    }

    /// Handles one inbound message and returns the next state.
    pub async fn handle_message(self, session: &mut Session, message: &Message) -> Self {
        match self {
            Self::Latent => latent::on_message(session, message).await,
            Self::LogonPending { initiator } => logon::on_message(session, message, initiator).await,
            Self::InSession | Self::ResendPending { .. } | Self::LogoutPending => {
                in_session::on_message(session, message, self).await
            }
        }
    }

    /// Handles one timer expiry and returns the next state.
    pub async fn handle_timeout(self, session: &mut Session, timeout: Timeout) -> Self {
        match self {
            Self::Latent => latent::on_timeout(session, timeout),
            Self::LogonPending { initiator } => logon::on_timeout(session, timeout, initiator),
            Self::InSession | Self::ResendPending { .. } | Self::LogoutPending => {
                in_session::on_timeout(session, timeout, self).await
            }
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResendPending { begin, end } => write!(f, "ResendPending({begin}..={end})"),
            other => f.write_str(other.name()),
        }
    }
}

/// A session together with its current state.
///
/// All inbound messages, timer expiries and local commands for one session
/// go through a single `StateMachine`, one at a time.
#[derive(Debug)]
pub struct StateMachine {
    state: SessionState,
    session: Session,
}

impl StateMachine {
    /// Creates a state machine in `Latent`.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self {
            state: SessionState::Latent,
            session,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the session context.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the session context mutably.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn transition(&mut self, next: SessionState) -> SessionState {
        if next != self.state {
            info!(
                session = %self.session.session_id(),
                from = %self.state,
                to = %next,
                "state transition"
            );
        }
        self.state = next;
        next
    }

    fn require(&self, expected: &str, ok: bool) -> Result<(), SessionError> {
        if ok {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                expected: expected.to_string(),
                current: self.state.name().to_string(),
            })
        }
    }

    /// Handles one decoded inbound message.
    pub async fn handle_message(&mut self, message: &Message) -> SessionState {
        let next = self.state.handle_message(&mut self.session, message).await;
        self.transition(next)
    }

    /// Logs, decodes and handles one raw inbound frame.
    ///
    /// Frames that fail to decode are logged and dropped without touching
    /// sequence numbers.
    pub async fn handle_bytes(&mut self, raw: &[u8]) -> SessionState {
        self.session.log_incoming(raw);
        let config = self.session.config();
        let decoded = Decoder::new(raw)
            .with_checksum_validation(config.validate_checksum)
            .with_max_message_size(config.max_message_size)
            .decode();
        match decoded {
            Ok(message) => self.handle_message(&message).await,
            Err(err) => {
                warn!(session = %self.session.session_id(), error = %err, "dropping undecodable message");
                self.session
                    .log_event(&format!("Dropping undecodable message: {err}"));
                self.state
            }
        }
    }

    /// Handles one timer expiry.
    pub async fn handle_timeout(&mut self, timeout: Timeout) -> SessionState {
        let next = self.state.handle_timeout(&mut self.session, timeout).await;
        self.transition(next)
    }

    /// Waits for the counterparty to log on.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless the session is `Latent`.
    pub fn accept(&mut self) -> Result<(), SessionError> {
        self.require("Latent", self.state == SessionState::Latent)?;
        let timeout = self.session.config().logon_timeout;
        self.session.arm_timer(Timeout::LogonTimeout, timeout);
        self.transition(SessionState::LogonPending { initiator: false });
        Ok(())
    }

    /// Sends our Logon and waits for the response.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless the session is `Latent`,
    /// or the store error if the Logon could not be committed.
    pub async fn initiate_logon(&mut self) -> Result<(), FixError> {
        self.require("Latent", self.state == SessionState::Latent)?;
        let config = self.session.config();
        let reset = config.reset_on_logon;
        let timeout = config.logon_timeout;
        let logon = builders::logon(
            &config.session_id,
            config.heartbeat_interval_secs(),
            reset,
            config.default_appl_ver_id.as_deref(),
        );
        if reset {
            self.session.reset_store().await?;
        }
        self.session.log_event("Initiated logon request");
        self.session.send(logon).await?;
        self.session.arm_timer(Timeout::LogonTimeout, timeout);
        self.transition(SessionState::LogonPending { initiator: true });
        Ok(())
    }

    /// Sends Logout and waits for the counterparty to confirm.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless the session is in session,
    /// or the store error if the Logout could not be committed.
    pub async fn initiate_logout(&mut self, text: Option<&str>) -> Result<(), FixError> {
        self.require("InSession", self.state.accepts_app_messages())?;
        let logout = builders::logout(self.session.session_id(), text);
        self.session.send(logout).await?;
        self.session.log_event("Initiated logout request");
        let timeout = self.session.config().logout_timeout;
        self.session.arm_timer(Timeout::LogoutTimeout, timeout);
        self.transition(SessionState::LogoutPending);
        Ok(())
    }

    /// Sends a message through the session.
    ///
    /// # Errors
    /// Application messages are refused with `SessionError::InvalidState`
    /// unless the session is logged on; store failures are returned as is.
    pub async fn send(&mut self, message: Message) -> Result<u64, FixError> {
        let msg_type = message.msg_type()?;
        if !msg_type.is_admin() {
            self.require("InSession", self.state.accepts_app_messages())?;
        }
        self.session.send(message).await
    }

    /// Handles loss of the transport.
    ///
    /// # Errors
    /// Returns the store error if `reset_on_disconnect` is set and the reset fails.
    pub async fn disconnect(&mut self) -> Result<(), FixError> {
        if self.state.is_logged_on() {
            let id = self.session.session_id().clone();
            self.session.application().on_logout(&id).await;
        }
        self.session.end_session();
        self.session.log_event("Disconnected");
        self.transition(SessionState::Latent);
        if self.session.config().reset_on_disconnect {
            self.session.reset_store().await?;
        }
        Ok(())
    }
}
