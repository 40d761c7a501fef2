/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application callback interface.
//!
//! The session layer reports lifecycle events and hands every message to the
//! application before it is sent or after it is accepted.

use async_trait::async_trait;
use fixgate_core::{Message, SessionId};

/// Reason for rejecting an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectReason {
    /// SessionRejectReason (373) code.
    pub code: u32,
    /// Human-readable rejection text.
    pub text: String,
    /// Tag that caused the rejection.
    pub ref_tag: Option<u32>,
}

impl RejectReason {
    /// Invalid tag number.
    pub const INVALID_TAG_NUMBER: u32 = 0;
    /// Required tag missing.
    pub const REQUIRED_TAG_MISSING: u32 = 1;
    /// Value is incorrect (out of range) for this tag.
    pub const VALUE_IS_INCORRECT: u32 = 5;
    /// CompID problem.
    pub const COMP_ID_PROBLEM: u32 = 9;
    /// SendingTime accuracy problem.
    pub const SENDING_TIME_ACCURACY_PROBLEM: u32 = 10;
    /// Invalid MsgType.
    pub const INVALID_MSG_TYPE: u32 = 11;
    /// Other.
    pub const OTHER: u32 = 99;

    /// Creates a new rejection reason.
    #[must_use]
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
            ref_tag: None,
        }
    }

    /// Sets the reference tag.
    #[must_use]
    pub const fn with_ref_tag(mut self, tag: u32) -> Self {
        self.ref_tag = Some(tag);
        self
    }
}

/// Application callback interface for handling FIX messages.
///
/// Callbacks run on the session's own task, so a slow callback delays the
/// session. `from_*` callbacks may refuse a message, which produces a
/// session-level Reject.
#[async_trait]
pub trait Application: Send + Sync {
    /// Called once when a session is created.
    async fn on_create(&self, session_id: &SessionId);

    /// Called when the logon handshake completes.
    async fn on_logon(&self, session_id: &SessionId);

    /// Called when a logged-on session ends.
    async fn on_logout(&self, session_id: &SessionId);

    /// Called before an admin message is sent. The message may be modified.
    async fn to_admin(&self, message: &mut Message, session_id: &SessionId);

    /// Called when an admin message is accepted.
    ///
    /// # Errors
    /// Returning `Err` causes a session-level Reject.
    #[allow(clippy::wrong_self_convention)]
    async fn from_admin(&self, message: &Message, session_id: &SessionId)
    -> Result<(), RejectReason>;

    /// Called before an application message is sent. The message may be modified.
    async fn to_app(&self, message: &mut Message, session_id: &SessionId);

    /// Called when an application message is accepted.
    ///
    /// # Errors
    /// Returning `Err` causes a session-level Reject.
    #[allow(clippy::wrong_self_convention)]
    async fn from_app(&self, message: &Message, session_id: &SessionId)
    -> Result<(), RejectReason>;
}

/// Application that accepts everything and does nothing.
#[derive(Debug, Default)]
pub struct NoOpApplication;

#[async_trait]
impl Application for NoOpApplication {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_logon(&self, _session_id: &SessionId) {}

    async fn on_logout(&self, _session_id: &SessionId) {}

    async fn to_admin(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_admin(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), RejectReason> {
        Ok(())
    }

    async fn to_app(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_app(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), RejectReason> {
        Ok(())
    }
}
