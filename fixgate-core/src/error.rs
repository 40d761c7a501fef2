/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the fixgate session layer.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across codec, session, and store operations.
//!
//! Session-level anomalies (`ProtocolViolation`, `SequenceTooHigh`, ...) are
//! normally handled inside a state transition and surface only as log events.
//! Store errors (`Persistence`, `RangeNotAvailable`) propagate to the caller.

use std::ops::Range;
use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all fixgate operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error during message decoding.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error during message encoding.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error from underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur during FIX message decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Message buffer is incomplete, need more data.
    #[error("incomplete message, need more data")]
    Incomplete,

    /// Invalid BeginString field (tag 8).
    #[error("invalid begin string: expected 8=FIX.x.y")]
    InvalidBeginString,

    /// Missing BodyLength field (tag 9).
    #[error("missing body length field (tag 9)")]
    MissingBodyLength,

    /// Invalid BodyLength value.
    #[error("invalid body length value")]
    InvalidBodyLength,

    /// Declared BodyLength does not match the bytes between tag 9 and tag 10.
    #[error("body length mismatch: declared {declared}, actual {actual}")]
    BodyLengthMismatch {
        /// Declared body length.
        declared: usize,
        /// Measured body length.
        actual: usize,
    },

    /// Missing MsgType field (tag 35).
    #[error("missing msg type field (tag 35)")]
    MissingMsgType,

    /// Checksum mismatch between calculated and declared values.
    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Calculated checksum value.
        calculated: u8,
        /// Declared checksum value in message.
        declared: u8,
    },

    /// Invalid tag format (not a valid integer).
    #[error("invalid tag format: {0}")]
    InvalidTag(String),

    /// Missing required field.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// Invalid field value for the expected type.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Actual message size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max_size: usize,
    },
}

/// Errors that occur during FIX message encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Missing required field during encoding.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },
}

/// Errors in FIX session layer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session is not in the correct state for the operation.
    #[error("invalid session state: expected {expected}, current {current}")]
    InvalidState {
        /// Expected state for the operation.
        expected: String,
        /// Current session state.
        current: String,
    },

    /// A message arrived that the current state does not accept.
    #[error("protocol violation: received msg type {msg_type} while {state}")]
    ProtocolViolation {
        /// Message type of the offending message.
        msg_type: String,
        /// State the session was in.
        state: String,
    },

    /// Counterparty never completed the logon handshake.
    #[error("timed out waiting for logon response")]
    LogonTimeout,

    /// Heartbeat timeout - no response to TestRequest.
    #[error("heartbeat timeout after {elapsed_ms} milliseconds")]
    HeartbeatTimeout {
        /// Elapsed time in milliseconds since last message.
        elapsed_ms: u64,
    },

    /// Sequence number gap detected.
    #[error("MsgSeqNum too high, expecting {expected} but received {received}")]
    SequenceTooHigh {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// Sequence number too low (possible duplicate or replay).
    #[error("MsgSeqNum too low, expecting {expected} but received {received}")]
    SequenceTooLow {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// BeginString of an inbound message does not match the session.
    #[error("incorrect BeginString: expected {expected}, received {received}")]
    IncorrectBeginString {
        /// BeginString configured for the session.
        expected: String,
        /// BeginString carried by the message.
        received: String,
    },

    /// CompIDs of an inbound message do not match the session.
    #[error("CompID problem: expected {expected}, received {received}")]
    IncorrectCompId {
        /// Expected `sender->target` pair, seen from the counterparty.
        expected: String,
        /// Pair carried by the message.
        received: String,
    },

    /// A field the session layer requires is absent.
    #[error("required tag missing: {tag}")]
    MissingField {
        /// The missing tag.
        tag: u32,
    },

    /// Message rejected by counterparty.
    #[error("message rejected: ref_seq={ref_seq_num}, reason={reason}")]
    MessageRejected {
        /// Reference sequence number of rejected message.
        ref_seq_num: u64,
        /// Rejection reason.
        reason: String,
    },

    /// Transport refused an outbound message.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Session configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Errors in message store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The durable backend rejected or could not complete a write or read.
    ///
    /// The in-memory mirror is left untouched when this is returned.
    #[error("persistence error during {operation}: {reason}")]
    Persistence {
        /// Store operation that failed.
        operation: &'static str,
        /// Backend error description.
        reason: String,
    },

    /// Range of messages not fully available.
    #[error("messages not available for range {range:?}: seq={missing} missing")]
    RangeNotAvailable {
        /// The requested range of sequence numbers.
        range: Range<u64>,
        /// First sequence number that could not be found.
        missing: u64,
    },

    /// No store settings exist for the session and dynamic sessions are disabled.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Store configuration is invalid.
    #[error("store configuration error: {0}")]
    Configuration(String),

    /// Store content is inconsistent.
    #[error("store corrupted: {reason}")]
    Corrupted {
        /// Description of the corruption.
        reason: String,
    },
}

impl StoreError {
    /// Creates a persistence error for the given operation.
    #[must_use]
    pub fn persistence(operation: &'static str, reason: impl ToString) -> Self {
        Self::Persistence {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error came from the durable backend.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
