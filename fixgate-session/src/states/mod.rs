/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-state transition handlers.

pub(crate) mod in_session;
pub(crate) mod latent;
pub(crate) mod logon;

use crate::session::Session;
use fixgate_core::Message;
use fixgate_core::error::SessionError;
use fixgate_core::tags;
use tracing::warn;

/// Logs a message the current state does not accept.
pub(crate) fn log_violation(session: &Session, message: &Message, state: &str) {
    let violation = SessionError::ProtocolViolation {
        msg_type: message
            .header
            .get_str(tags::MSG_TYPE)
            .unwrap_or_default()
            .to_string(),
        state: state.to_string(),
    };
    warn!(session = %session.session_id(), error = %violation, "unexpected message");
    session.log_event(&violation.to_string());
}
