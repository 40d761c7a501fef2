/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Constructors for session-level messages.
//!
//! Builders set the identity header and the body. MsgSeqNum and SendingTime
//! are stamped by the session when the message goes out.

use crate::application::RejectReason;
use fixgate_core::tags;
use fixgate_core::{FieldMap, Message, MsgType, SessionId};

/// Writes BeginString and the routing fields of `session_id` into a header.
pub fn stamp_identity(header: &mut FieldMap, session_id: &SessionId) {
    header.set_str(tags::BEGIN_STRING, &session_id.begin_string);
    header.set_str(tags::SENDER_COMP_ID, &session_id.sender_comp_id);
    header.set_str(tags::TARGET_COMP_ID, &session_id.target_comp_id);
    if let Some(sub) = &session_id.sender_sub_id {
        header.set_str(tags::SENDER_SUB_ID, sub);
    }
    if let Some(loc) = &session_id.sender_location_id {
        header.set_str(tags::SENDER_LOCATION_ID, loc);
    }
    if let Some(sub) = &session_id.target_sub_id {
        header.set_str(tags::TARGET_SUB_ID, sub);
    }
    if let Some(loc) = &session_id.target_location_id {
        header.set_str(tags::TARGET_LOCATION_ID, loc);
    }
}

/// Returns true for FIX.4.2 and later, including FIXT transports.
#[must_use]
pub fn at_least_fix42(begin_string: &str) -> bool {
    begin_string.starts_with("FIXT") || begin_string >= "FIX.4.2"
}

fn admin(session_id: &SessionId, msg_type: MsgType) -> Message {
    let mut msg = Message::new(msg_type);
    stamp_identity(&mut msg.header, session_id);
    msg
}

fn set_logon_fields(
    msg: &mut Message,
    session_id: &SessionId,
    heart_bt_int: Option<u64>,
    reset: bool,
    default_appl_ver_id: Option<&str>,
) {
    msg.body.set_uint(tags::ENCRYPT_METHOD, 0);
    if let Some(interval) = heart_bt_int {
        msg.body.set_uint(tags::HEART_BT_INT, interval);
    }
    if reset {
        msg.body.set_bool(tags::RESET_SEQ_NUM_FLAG, true);
    }
    if session_id.is_fixt()
        && let Some(id) = default_appl_ver_id
    {
        msg.body.set_str(tags::DEFAULT_APPL_VER_ID, id);
    }
}

/// Builds the Logon an initiator opens with.
#[must_use]
pub fn logon(
    session_id: &SessionId,
    heart_bt_int: u64,
    reset: bool,
    default_appl_ver_id: Option<&str>,
) -> Message {
    let mut msg = admin(session_id, MsgType::Logon);
    set_logon_fields(&mut msg, session_id, Some(heart_bt_int), reset, default_appl_ver_id);
    msg
}

/// Builds the Logon an acceptor answers with, echoing HeartBtInt.
#[must_use]
pub fn logon_ack(
    session_id: &SessionId,
    heart_bt_int: Option<u64>,
    reset: bool,
    default_appl_ver_id: Option<&str>,
) -> Message {
    let mut msg = admin(session_id, MsgType::Logon);
    set_logon_fields(&mut msg, session_id, heart_bt_int, reset, default_appl_ver_id);
    msg
}

/// Builds a Heartbeat, optionally answering a TestRequest.
#[must_use]
pub fn heartbeat(session_id: &SessionId, test_req_id: Option<&str>) -> Message {
    let mut msg = admin(session_id, MsgType::Heartbeat);
    if let Some(id) = test_req_id {
        msg.body.set_str(tags::TEST_REQ_ID, id);
    }
    msg
}

/// Builds a TestRequest.
#[must_use]
pub fn test_request(session_id: &SessionId, test_req_id: &str) -> Message {
    let mut msg = admin(session_id, MsgType::TestRequest);
    msg.body.set_str(tags::TEST_REQ_ID, test_req_id);
    msg
}

/// Builds a ResendRequest for `begin..=end`; `end` 0 means "to infinity".
#[must_use]
pub fn resend_request(session_id: &SessionId, begin: u64, end: u64) -> Message {
    let mut msg = admin(session_id, MsgType::ResendRequest);
    msg.body.set_uint(tags::BEGIN_SEQ_NO, begin);
    msg.body.set_uint(tags::END_SEQ_NO, end);
    msg
}

/// Builds a SequenceReset, in gap-fill mode when `gap_fill` is set.
#[must_use]
pub fn sequence_reset(session_id: &SessionId, new_seq_no: u64, gap_fill: bool) -> Message {
    let mut msg = admin(session_id, MsgType::SequenceReset);
    if gap_fill {
        msg.body.set_bool(tags::GAP_FILL_FLAG, true);
    }
    msg.body.set_uint(tags::NEW_SEQ_NO, new_seq_no);
    msg
}

/// Builds a session-level Reject of the message at `ref_seq_num`.
#[must_use]
pub fn reject(
    session_id: &SessionId,
    ref_seq_num: u64,
    reason: &RejectReason,
    ref_msg_type: Option<&str>,
) -> Message {
    let mut msg = admin(session_id, MsgType::Reject);
    msg.body.set_uint(tags::REF_SEQ_NUM, ref_seq_num);
    if at_least_fix42(&session_id.begin_string) {
        if let Some(tag) = reason.ref_tag {
            msg.body.set_uint(tags::REF_TAG_ID, u64::from(tag));
        }
        if let Some(msg_type) = ref_msg_type {
            msg.body.set_str(tags::REF_MSG_TYPE, msg_type);
        }
        msg.body
            .set_uint(tags::SESSION_REJECT_REASON, u64::from(reason.code));
    }
    if !reason.text.is_empty() {
        msg.body.set_str(tags::TEXT, &reason.text);
    }
    msg
}

/// Builds a Logout with optional Text.
#[must_use]
pub fn logout(session_id: &SessionId, text: Option<&str>) -> Message {
    let mut msg = admin(session_id, MsgType::Logout);
    if let Some(text) = text {
        msg.body.set_str(tags::TEXT, text);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> SessionId {
        SessionId::new("FIX.4.4", "SENDER", "TARGET").with_sender_sub_id("DESK")
    }

    #[test]
    fn test_logon_fields() {
        let msg = logon(&id(), 30, true, None);
        assert!(msg.is(&MsgType::Logon));
        assert_eq!(msg.sender_comp_id(), Some("SENDER"));
        assert_eq!(msg.header.get_str(tags::SENDER_SUB_ID).unwrap(), "DESK");
        assert_eq!(msg.body.get_uint(tags::HEART_BT_INT).unwrap(), 30);
        assert!(msg.body.flag(tags::RESET_SEQ_NUM_FLAG));
        assert!(!msg.body.has(tags::DEFAULT_APPL_VER_ID));
    }

    #[test]
    fn test_logon_default_appl_ver_id_only_for_fixt() {
        let fixt = SessionId::new("FIXT.1.1", "S", "T");
        let msg = logon_ack(&fixt, Some(30), false, Some("9"));
        assert_eq!(msg.body.get_str(tags::DEFAULT_APPL_VER_ID).unwrap(), "9");

        let msg = logon_ack(&id(), None, false, Some("9"));
        assert!(!msg.body.has(tags::DEFAULT_APPL_VER_ID));
        assert!(!msg.body.has(tags::HEART_BT_INT));
    }

    #[test]
    fn test_reject_fields_by_version() {
        let reason = RejectReason::new(RejectReason::VALUE_IS_INCORRECT, "bad").with_ref_tag(36);
        let msg = reject(&id(), 7, &reason, Some("4"));
        assert_eq!(msg.body.get_uint(tags::REF_SEQ_NUM).unwrap(), 7);
        assert_eq!(msg.body.get_uint(tags::SESSION_REJECT_REASON).unwrap(), 5);
        assert_eq!(msg.body.get_uint(tags::REF_TAG_ID).unwrap(), 36);
        assert_eq!(msg.body.get_str(tags::REF_MSG_TYPE).unwrap(), "4");

        let old = SessionId::new("FIX.4.1", "S", "T");
        let msg = reject(&old, 7, &reason, Some("4"));
        assert!(!msg.body.has(tags::SESSION_REJECT_REASON));
        assert_eq!(msg.body.get_str(tags::TEXT).unwrap(), "bad");
    }

    #[test]
    fn test_sequence_reset() {
        let msg = sequence_reset(&id(), 10, true);
        assert!(msg.body.flag(tags::GAP_FILL_FLAG));
        assert_eq!(msg.body.get_uint(tags::NEW_SEQ_NO).unwrap(), 10);

        let msg = sequence_reset(&id(), 10, false);
        assert!(!msg.body.has(tags::GAP_FILL_FLAG));
    }

    #[test]
    fn test_at_least_fix42() {
        assert!(at_least_fix42("FIX.4.2"));
        assert!(at_least_fix42("FIX.5.0"));
        assert!(at_least_fix42("FIXT.1.1"));
        assert!(!at_least_fix42("FIX.4.0"));
    }
}
