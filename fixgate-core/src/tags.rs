/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tag numbers used by the session layer.

/// BeginString (8).
pub const BEGIN_STRING: u32 = 8;
/// BodyLength (9).
pub const BODY_LENGTH: u32 = 9;
/// CheckSum (10).
pub const CHECK_SUM: u32 = 10;
/// MsgSeqNum (34).
pub const MSG_SEQ_NUM: u32 = 34;
/// MsgType (35).
pub const MSG_TYPE: u32 = 35;
/// NewSeqNo (36).
pub const NEW_SEQ_NO: u32 = 36;
/// BeginSeqNo (7).
pub const BEGIN_SEQ_NO: u32 = 7;
/// EndSeqNo (16).
pub const END_SEQ_NO: u32 = 16;
/// PossDupFlag (43).
pub const POSS_DUP_FLAG: u32 = 43;
/// RefSeqNum (45).
pub const REF_SEQ_NUM: u32 = 45;
/// SenderCompID (49).
pub const SENDER_COMP_ID: u32 = 49;
/// SenderSubID (50).
pub const SENDER_SUB_ID: u32 = 50;
/// SendingTime (52).
pub const SENDING_TIME: u32 = 52;
/// TargetCompID (56).
pub const TARGET_COMP_ID: u32 = 56;
/// TargetSubID (57).
pub const TARGET_SUB_ID: u32 = 57;
/// Text (58).
pub const TEXT: u32 = 58;
/// Signature (89).
pub const SIGNATURE: u32 = 89;
/// SignatureLength (93).
pub const SIGNATURE_LENGTH: u32 = 93;
/// PossResend (97).
pub const POSS_RESEND: u32 = 97;
/// EncryptMethod (98).
pub const ENCRYPT_METHOD: u32 = 98;
/// HeartBtInt (108).
pub const HEART_BT_INT: u32 = 108;
/// TestReqID (112).
pub const TEST_REQ_ID: u32 = 112;
/// OnBehalfOfCompID (115).
pub const ON_BEHALF_OF_COMP_ID: u32 = 115;
/// OrigSendingTime (122).
pub const ORIG_SENDING_TIME: u32 = 122;
/// GapFillFlag (123).
pub const GAP_FILL_FLAG: u32 = 123;
/// DeliverToCompID (128).
pub const DELIVER_TO_COMP_ID: u32 = 128;
/// ResetSeqNumFlag (141).
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
/// SenderLocationID (142).
pub const SENDER_LOCATION_ID: u32 = 142;
/// TargetLocationID (143).
pub const TARGET_LOCATION_ID: u32 = 143;
/// RefTagID (371).
pub const REF_TAG_ID: u32 = 371;
/// RefMsgType (372).
pub const REF_MSG_TYPE: u32 = 372;
/// SessionRejectReason (373).
pub const SESSION_REJECT_REASON: u32 = 373;
/// LastMsgSeqNumProcessed (369).
pub const LAST_MSG_SEQ_NUM_PROCESSED: u32 = 369;
/// ApplVerID (1128).
pub const APPL_VER_ID: u32 = 1128;
/// DefaultApplVerID (1137).
pub const DEFAULT_APPL_VER_ID: u32 = 1137;

/// Standard header tags.
const HEADER_TAGS: &[u32] = &[
    BEGIN_STRING,
    BODY_LENGTH,
    MSG_TYPE,
    SENDER_COMP_ID,
    TARGET_COMP_ID,
    ON_BEHALF_OF_COMP_ID,
    DELIVER_TO_COMP_ID,
    MSG_SEQ_NUM,
    SENDER_SUB_ID,
    SENDER_LOCATION_ID,
    TARGET_SUB_ID,
    TARGET_LOCATION_ID,
    POSS_DUP_FLAG,
    POSS_RESEND,
    SENDING_TIME,
    ORIG_SENDING_TIME,
    LAST_MSG_SEQ_NUM_PROCESSED,
    APPL_VER_ID,
];

/// Returns true if `tag` belongs to the standard header.
#[inline]
#[must_use]
pub fn is_header(tag: u32) -> bool {
    HEADER_TAGS.contains(&tag)
}

/// Returns true if `tag` belongs to the standard trailer.
#[inline]
#[must_use]
pub const fn is_trailer(tag: u32) -> bool {
    matches!(tag, SIGNATURE_LENGTH | SIGNATURE | CHECK_SUM)
}
