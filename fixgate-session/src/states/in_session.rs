/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message flow after logon: `InSession`, `ResendPending` and `LogoutPending`.
//!
//! The three states share one handler. `ResendPending` differs only by the
//! outstanding resend range kept on the session, and `LogoutPending` keeps
//! its variant until the counterparty's Logout arrives.

use crate::application::RejectReason;
use crate::builders;
use crate::sequence::SeqNumCheck;
use crate::session::{Session, Stashed};
use crate::state::SessionState;
use crate::timer::Timeout;
use fixgate_core::error::{FixError, SessionError};
use fixgate_core::tags;
use fixgate_core::{Message, MsgType};
use tracing::{debug, warn};

enum Flow {
    Continue,
    Done(SessionState),
}

pub(crate) async fn on_message(
    session: &mut Session,
    message: &Message,
    current: SessionState,
) -> SessionState {
    let msg_type = match message.msg_type() {
        Ok(msg_type) => msg_type,
        Err(err) => {
            session.log_event(&err.to_string());
            return current;
        }
    };

    let seq = match session.check_header(message) {
        Ok(seq) => seq,
        Err(err @ SessionError::MissingField { .. }) => {
            let reason = RejectReason::new(RejectReason::REQUIRED_TAG_MISSING, err.to_string())
                .with_ref_tag(tags::MSG_SEQ_NUM);
            session
                .send_reject(0, &reason, Some(msg_type.as_str()))
                .await;
            return current;
        }
        Err(err) => return session.logout_and_end(&err).await,
    };

    let echoed = message.body.get_str(tags::TEST_REQ_ID).ok();
    session.on_traffic(matches!(msg_type, MsgType::Heartbeat).then_some(echoed));

    let is_reset_mode =
        msg_type == MsgType::SequenceReset && !message.body.flag(tags::GAP_FILL_FLAG);
    if !is_reset_mode {
        let expected = session.next_target_seq();
        match SeqNumCheck::classify(seq, expected).with_poss_dup(message.poss_dup()) {
            SeqNumCheck::Ok => {}
            SeqNumCheck::TooHigh { expected, received } => {
                return on_too_high(session, message, &msg_type, expected, received, current)
                    .await;
            }
            SeqNumCheck::Duplicate { expected, received } => {
                debug!(session = %session.session_id(), expected, received, "ignoring possible duplicate");
                session.log_event(&format!(
                    "MsgSeqNum too low, expecting {expected} but received {received}, PossDupFlag set; ignoring msg type {msg_type}"
                ));
                return current;
            }
            SeqNumCheck::TooLow { expected, received } => {
                warn!(session = %session.session_id(), expected, received, %msg_type, "sequence number too low");
                return session
                    .logout_and_end(&SessionError::SequenceTooLow { expected, received })
                    .await;
            }
        }
    }

    match process(session, message, &msg_type, seq, current).await {
        Ok(Flow::Continue) => settle(session, current).await,
        Ok(Flow::Done(state)) => state,
        Err(err) => session.abort(&err),
    }
}

/// Handles a message beyond the expected sequence number.
async fn on_too_high(
    session: &mut Session,
    message: &Message,
    msg_type: &MsgType,
    expected: u64,
    received: u64,
    current: SessionState,
) -> SessionState {
    let err = SessionError::SequenceTooHigh { expected, received };
    warn!(session = %session.session_id(), expected, received, %msg_type, "sequence gap");
    session.log_event(&format!("{err} (msg type {msg_type})"));

    match msg_type {
        MsgType::Logout => return on_logout(session, current).await,
        MsgType::ResendRequest => {
            if let Err(err) = serve_resend_request(session, message, received).await {
                return session.abort(&err);
            }
            session.stash(received, Stashed::Consumed);
        }
        _ => session.stash(received, Stashed::Pending(message.clone())),
    }

    let result = if session.resend_range().is_some() {
        session.extend_resend(received - 1);
        Ok(())
    } else {
        session.request_resend(expected, received).await
    };
    match result {
        Ok(()) => next_state(session, current),
        Err(err) => session.abort(&err),
    }
}

/// Processes one in-order message, advancing the target sequence number.
async fn process(
    session: &mut Session,
    message: &Message,
    msg_type: &MsgType,
    seq: u64,
    current: SessionState,
) -> Result<Flow, FixError> {
    let id = session.session_id().clone();
    let application = session.application();

    let verdict = if msg_type.is_admin() {
        application.from_admin(message, &id).await
    } else {
        application.from_app(message, &id).await
    };
    if let Err(reason) = verdict
        && *msg_type != MsgType::Logout
    {
        session
            .send_reject(seq, &reason, Some(msg_type.as_str()))
            .await;
        if *msg_type != MsgType::SequenceReset || message.body.flag(tags::GAP_FILL_FLAG) {
            session.incr_target().await?;
        }
        return Ok(Flow::Continue);
    }

    match msg_type {
        MsgType::Heartbeat | MsgType::Reject | MsgType::App(_) => {
            if *msg_type == MsgType::Reject {
                let text = message.body.get_str(tags::TEXT).unwrap_or_default();
                let ref_seq = message.body.get_uint(tags::REF_SEQ_NUM).unwrap_or_default();
                session.log_event(&format!("Received Reject for message {ref_seq}: {text}"));
            }
            session.incr_target().await?;
        }
        MsgType::TestRequest => {
            match message.body.get_str(tags::TEST_REQ_ID) {
                Ok(test_req_id) => {
                    let reply = builders::heartbeat(&id, Some(test_req_id));
                    session.send(reply).await?;
                }
                Err(_) => {
                    let reason = RejectReason::new(
                        RejectReason::REQUIRED_TAG_MISSING,
                        "Required tag missing",
                    )
                    .with_ref_tag(tags::TEST_REQ_ID);
                    session.send_reject(seq, &reason, Some(msg_type.as_str())).await;
                }
            }
            session.incr_target().await?;
        }
        MsgType::ResendRequest => {
            serve_resend_request(session, message, seq).await?;
            session.incr_target().await?;
        }
        MsgType::SequenceReset => on_sequence_reset(session, message, seq).await?,
        MsgType::Logon => {
            session.log_event("Received Logon while already logged on; ignoring");
            session.incr_target().await?;
        }
        MsgType::Logout => {
            session.incr_target().await?;
            return Ok(Flow::Done(on_logout(session, current).await));
        }
    }
    Ok(Flow::Continue)
}

async fn serve_resend_request(
    session: &mut Session,
    message: &Message,
    seq: u64,
) -> Result<(), FixError> {
    let range = message
        .body
        .get_uint(tags::BEGIN_SEQ_NO)
        .map_err(|_| tags::BEGIN_SEQ_NO)
        .and_then(|begin| {
            message
                .body
                .get_uint(tags::END_SEQ_NO)
                .map(|end| (begin, end))
                .map_err(|_| tags::END_SEQ_NO)
        });
    match range {
        Ok((begin, end)) => {
            session.log_event(&format!("Received ResendRequest FROM: {begin} TO: {end}"));
            session.serve_resend(begin, end).await
        }
        Err(tag) => {
            let reason =
                RejectReason::new(RejectReason::REQUIRED_TAG_MISSING, "Required tag missing")
                    .with_ref_tag(tag);
            session
                .send_reject(seq, &reason, Some(MsgType::ResendRequest.as_str()))
                .await;
            Ok(())
        }
    }
}

/// Applies a SequenceReset. NewSeqNo may only move the expectation forward.
async fn on_sequence_reset(
    session: &mut Session,
    message: &Message,
    seq: u64,
) -> Result<(), FixError> {
    let gap_fill = message.body.flag(tags::GAP_FILL_FLAG);
    let expected = session.next_target_seq();
    let Ok(new_seq_no) = message.body.get_uint(tags::NEW_SEQ_NO) else {
        let reason = RejectReason::new(RejectReason::REQUIRED_TAG_MISSING, "Required tag missing")
            .with_ref_tag(tags::NEW_SEQ_NO);
        session
            .send_reject(seq, &reason, Some(MsgType::SequenceReset.as_str()))
            .await;
        if gap_fill {
            session.incr_target().await?;
        }
        return Ok(());
    };

    session.log_event(&format!(
        "Received SequenceReset FROM: {seq} TO: {new_seq_no}"
    ));
    if new_seq_no > expected {
        session.set_target(new_seq_no).await?;
    } else if new_seq_no < expected {
        let reason = RejectReason::new(
            RejectReason::VALUE_IS_INCORRECT,
            format!("Attempt to lower sequence number, invalid value NewSeqNo={new_seq_no}"),
        )
        .with_ref_tag(tags::NEW_SEQ_NO);
        session
            .send_reject(seq, &reason, Some(MsgType::SequenceReset.as_str()))
            .await;
    }
    Ok(())
}

/// Completes a logout initiated by either side.
async fn on_logout(session: &mut Session, current: SessionState) -> SessionState {
    if current == SessionState::LogoutPending {
        session.log_event("Received logout response");
    } else {
        session.log_event("Received logout request");
        session.send_logout(None).await;
        session.log_event("Sending logout response");
    }

    let id = session.session_id().clone();
    session.application().on_logout(&id).await;

    if session.config().reset_on_logout
        && let Err(err) = session.reset_store().await
    {
        warn!(session = %id, error = %err, "failed to reset store on logout");
        session.log_event(&err.to_string());
    }
    session.end_session()
}

/// Replays stashed messages that became in order, then settles the state.
async fn settle(session: &mut Session, current: SessionState) -> SessionState {
    while let Some(entry) = session.take_stashed() {
        let result = match entry {
            Stashed::Consumed => session
                .incr_target()
                .await
                .map(|()| Flow::Continue)
                .map_err(FixError::from),
            Stashed::Pending(message) => match (message.msg_type(), message.seq_num()) {
                (Ok(msg_type), Ok(seq)) => {
                    process(session, &message, &msg_type, seq, current).await
                }
                _ => Ok(Flow::Continue),
            },
        };
        match result {
            Ok(Flow::Continue) => {}
            Ok(Flow::Done(state)) => return state,
            Err(err) => return session.abort(&err),
        }
    }
    if let Err(err) = session.continue_resend().await {
        return session.abort(&err);
    }
    next_state(session, current)
}

fn next_state(session: &Session, current: SessionState) -> SessionState {
    if current == SessionState::LogoutPending {
        return current;
    }
    match session.resend_range() {
        Some(range) => SessionState::ResendPending {
            begin: range.begin,
            end: range.end,
        },
        None => SessionState::InSession,
    }
}

pub(crate) async fn on_timeout(
    session: &mut Session,
    timeout: Timeout,
    current: SessionState,
) -> SessionState {
    let id = session.session_id().clone();
    match timeout {
        Timeout::HeartbeatDue => {
            if let Err(err) = session.send(builders::heartbeat(&id, None)).await {
                return session.abort(&err);
            }
            current
        }
        Timeout::PeerIdle => {
            if session.heartbeat().pending_test_request().is_some() {
                return current;
            }
            let test_req_id = session.heartbeat_mut().next_test_req_id();
            if let Err(err) = session
                .send(builders::test_request(&id, &test_req_id))
                .await
            {
                return session.abort(&err);
            }
            debug!(session = %id, %test_req_id, "sent test request");
            session.heartbeat_mut().on_test_request_sent(test_req_id);
            let interval = session.heartbeat().interval();
            session.arm_timer(Timeout::TestRequestTimeout, interval);
            current
        }
        Timeout::TestRequestTimeout => {
            let Some(elapsed) = session.heartbeat().test_request_elapsed() else {
                return current;
            };
            let err = SessionError::HeartbeatTimeout {
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            };
            warn!(session = %id, "{err}");
            session.log_event(&err.to_string());
            session.application().on_logout(&id).await;
            session.end_session()
        }
        Timeout::LogoutTimeout if current == SessionState::LogoutPending => {
            warn!(session = %id, "timed out waiting for logout response");
            session.log_event("Timed out waiting for logout response");
            session.application().on_logout(&id).await;
            if session.config().reset_on_logout
                && let Err(err) = session.reset_store().await
            {
                session.log_event(&err.to_string());
            }
            session.end_session()
        }
        Timeout::LogonTimeout | Timeout::LogoutTimeout => current,
    }
}
