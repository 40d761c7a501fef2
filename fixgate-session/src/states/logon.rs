/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Logon handshake.
//!
//! Header and too-low checks run before the acknowledgment and fail closed.
//! A too-high MsgSeqNum is only acted on after the acknowledgment and
//! `on_logon`, so the session still reaches `InSession` and recovers from
//! there.

use super::log_violation;
use crate::builders;
use crate::sequence::SeqNumCheck;
use crate::session::{Session, Stashed};
use crate::state::SessionState;
use crate::timer::Timeout;
use fixgate_core::error::SessionError;
use fixgate_core::tags;
use fixgate_core::{Message, MsgType};
use std::time::Duration;
use tracing::{debug, warn};

pub(crate) async fn on_message(
    session: &mut Session,
    message: &Message,
    initiator: bool,
) -> SessionState {
    if !message.is(&MsgType::Logon) {
        log_violation(session, message, "waiting for Logon");
        return session.end_session();
    }
    on_logon(session, message, initiator).await
}

pub(crate) fn on_timeout(session: &mut Session, timeout: Timeout, initiator: bool) -> SessionState {
    match timeout {
        Timeout::LogonTimeout => {
            let err = SessionError::LogonTimeout;
            warn!(session = %session.session_id(), "{err}");
            session.log_event(&err.to_string());
            session.end_session()
        }
        other => {
            debug!(session = %session.session_id(), timeout = %other, "ignoring timeout before logon");
            SessionState::LogonPending { initiator }
        }
    }
}

/// Processes a counterparty Logon, as acceptor or as initiator awaiting the response.
pub(crate) async fn on_logon(
    session: &mut Session,
    message: &Message,
    initiator: bool,
) -> SessionState {
    let id = session.session_id().clone();
    let reset_requested = message.body.flag(tags::RESET_SEQ_NUM_FLAG);

    if initiator {
        if reset_requested
            && session.next_target_seq() != 1
            && let Err(err) = session.set_target(1).await
        {
            return session.abort(&err);
        }
    } else if (reset_requested || session.config().reset_on_logon)
        && let Err(err) = session.reset_store().await
    {
        return session.abort(&err);
    }

    let seq = match session.check_header(message) {
        Ok(seq) => seq,
        Err(err) => return session.logout_and_end(&err).await,
    };
    let check = SeqNumCheck::classify(seq, session.next_target_seq());
    if let SeqNumCheck::TooLow { expected, received } = check {
        let err = SessionError::SequenceTooLow { expected, received };
        warn!(session = %id, expected, received, "logon sequence number too low");
        return session.logout_and_end(&err).await;
    }

    let application = session.application();
    if let Err(reason) = application.from_admin(message, &id).await {
        let text = format!("Logon rejected: {}", reason.text);
        return session.logout_and_end(&text).await;
    }

    let heart_bt_int = message.body.get_uint(tags::HEART_BT_INT).ok();
    if let Some(secs) = heart_bt_int.filter(|secs| *secs > 0) {
        session.set_heartbeat_interval(Duration::from_secs(secs));
    }

    if initiator {
        session.log_event("Received logon response");
    } else {
        session.log_event("Received logon request");
        let ack = builders::logon_ack(
            &id,
            heart_bt_int,
            reset_requested,
            session.config().default_appl_ver_id.as_deref(),
        );
        if let Err(err) = session.send(ack).await {
            return session.abort(&err);
        }
        session.log_event("Responding to logon request");
    }

    session.cancel_timer(Timeout::LogonTimeout);
    session.heartbeat_mut().reset();
    session.arm_heartbeat_timers();
    application.on_logon(&id).await;

    match check {
        SeqNumCheck::TooHigh { expected, received } => {
            let err = SessionError::SequenceTooHigh { expected, received };
            warn!(session = %id, expected, received, "logon sequence number too high");
            session.log_event(&err.to_string());
            session.stash(received, Stashed::Consumed);
            if let Err(err) = session.request_resend(expected, received).await {
                return session.abort(&err);
            }
        }
        _ => {
            if let Err(err) = session.incr_target().await {
                return session.abort(&err);
            }
        }
    }
    SessionState::InSession
}
