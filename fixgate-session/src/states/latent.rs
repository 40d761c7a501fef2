/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

use super::{log_violation, logon};
use crate::session::Session;
use crate::state::SessionState;
use crate::timer::Timeout;
use fixgate_core::{Message, MsgType};
use tracing::debug;

/// A Logon opens an acceptor session; anything else is a violation.
pub(crate) async fn on_message(session: &mut Session, message: &Message) -> SessionState {
    if message.is(&MsgType::Logon) {
        return logon::on_logon(session, message, false).await;
    }
    log_violation(session, message, "in Latent state");
    SessionState::Latent
}

pub(crate) fn on_timeout(session: &Session, timeout: Timeout) -> SessionState {
    debug!(session = %session.session_id(), %timeout, "ignoring timeout while latent");
    SessionState::Latent
}
