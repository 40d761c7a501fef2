/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Generic FIX message structure.
//!
//! This module provides:
//! - [`MsgType`]: the administrative message types plus an application catch-all
//! - [`Message`]: a header/body/trailer field-value message

use crate::error::DecodeError;
use crate::field::FieldMap;
use crate::tags;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FIX message type (tag 35).
///
/// Session-level types are enumerated; every other value is an application
/// message carried as `App`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgType {
    /// Heartbeat (0).
    Heartbeat,
    /// Test Request (1).
    TestRequest,
    /// Resend Request (2).
    ResendRequest,
    /// Reject (3).
    Reject,
    /// Sequence Reset (4).
    SequenceReset,
    /// Logout (5).
    Logout,
    /// Logon (A).
    Logon,
    /// Any application-level message type.
    App(String),
}

impl FromStr for MsgType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "A" => Self::Logon,
            "" => return Err(DecodeError::MissingMsgType),
            other => Self::App(other.to_string()),
        })
    }
}

impl MsgType {
    /// Returns the wire value of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::Logon => "A",
            Self::App(s) => s.as_str(),
        }
    }

    /// Returns true if this is a session-level message type.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        !matches!(self, Self::App(_))
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A FIX message split into header, body and trailer sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Standard header fields.
    pub header: FieldMap,
    /// Body fields.
    pub body: FieldMap,
    /// Standard trailer fields.
    pub trailer: FieldMap,
}

impl Message {
    /// Creates an empty message of the given type.
    #[must_use]
    pub fn new(msg_type: MsgType) -> Self {
        let mut msg = Self::default();
        msg.header.set_str(tags::MSG_TYPE, msg_type.as_str());
        msg
    }

    /// Returns the message type.
    ///
    /// # Errors
    /// Returns `MissingMsgType` if tag 35 is absent.
    pub fn msg_type(&self) -> Result<MsgType, DecodeError> {
        self.header
            .get_str(tags::MSG_TYPE)
            .map_err(|_| DecodeError::MissingMsgType)?
            .parse()
    }

    /// Returns true if the message is of the given type.
    #[must_use]
    pub fn is(&self, msg_type: &MsgType) -> bool {
        self.header.get_str(tags::MSG_TYPE).ok() == Some(msg_type.as_str())
    }

    /// Returns MsgSeqNum (34).
    ///
    /// # Errors
    /// Returns an error if the field is absent or not an integer.
    pub fn seq_num(&self) -> Result<u64, DecodeError> {
        self.header.get_uint(tags::MSG_SEQ_NUM)
    }

    /// Returns BeginString (8), if present.
    #[must_use]
    pub fn begin_string(&self) -> Option<&str> {
        self.header.get_str(tags::BEGIN_STRING).ok()
    }

    /// Returns SenderCompID (49), if present.
    #[must_use]
    pub fn sender_comp_id(&self) -> Option<&str> {
        self.header.get_str(tags::SENDER_COMP_ID).ok()
    }

    /// Returns TargetCompID (56), if present.
    #[must_use]
    pub fn target_comp_id(&self) -> Option<&str> {
        self.header.get_str(tags::TARGET_COMP_ID).ok()
    }

    /// Returns PossDupFlag (43), defaulting to `false`.
    #[must_use]
    pub fn poss_dup(&self) -> bool {
        self.header.flag(tags::POSS_DUP_FLAG)
    }

    /// Returns SendingTime (52), if present and well formed.
    #[must_use]
    pub fn sending_time(&self) -> Option<Timestamp> {
        self.header
            .get_str(tags::SENDING_TIME)
            .ok()
            .and_then(Timestamp::parse_fix)
    }
}
