/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Inbound sequence number classification.
//!
//! Counters live in the message store only; this module compares a received
//! MsgSeqNum against the store's expectation and names the outcome.

use fixgate_core::error::SessionError;

/// Outcome of comparing a received MsgSeqNum with the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqNumCheck {
    /// Exactly the expected number.
    Ok,
    /// Ahead of the expected number; messages were missed.
    TooHigh {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
    /// Behind the expected number without PossDupFlag.
    TooLow {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
    /// Behind the expected number with PossDupFlag set.
    Duplicate {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
}

impl SeqNumCheck {
    /// Classifies `received` against `expected`.
    #[must_use]
    pub const fn classify(received: u64, expected: u64) -> Self {
        if received == expected {
            Self::Ok
        } else if received > expected {
            Self::TooHigh { expected, received }
        } else {
            Self::TooLow { expected, received }
        }
    }

    /// Refines `TooLow` to `Duplicate` when PossDupFlag is set.
    #[must_use]
    pub const fn with_poss_dup(self, poss_dup: bool) -> Self {
        match self {
            Self::TooLow { expected, received } if poss_dup => {
                Self::Duplicate { expected, received }
            }
            other => other,
        }
    }

    /// Returns the session error describing a mismatch, if any.
    #[must_use]
    pub const fn to_error(self) -> Option<SessionError> {
        match self {
            Self::Ok => None,
            Self::TooHigh { expected, received } => {
                Some(SessionError::SequenceTooHigh { expected, received })
            }
            Self::TooLow { expected, received } | Self::Duplicate { expected, received } => {
                Some(SessionError::SequenceTooLow { expected, received })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(SeqNumCheck::classify(5, 5), SeqNumCheck::Ok);
        assert_eq!(
            SeqNumCheck::classify(9, 5),
            SeqNumCheck::TooHigh {
                expected: 5,
                received: 9
            }
        );
        assert_eq!(
            SeqNumCheck::classify(3, 5),
            SeqNumCheck::TooLow {
                expected: 5,
                received: 3
            }
        );
        assert_eq!(
            SeqNumCheck::classify(3, 5).with_poss_dup(true),
            SeqNumCheck::Duplicate {
                expected: 5,
                received: 3
            }
        );
    }

    #[test]
    fn test_poss_dup_leaves_other_outcomes() {
        assert_eq!(SeqNumCheck::Ok.with_poss_dup(true), SeqNumCheck::Ok);
        assert!(matches!(
            SeqNumCheck::classify(9, 5).with_poss_dup(true),
            SeqNumCheck::TooHigh { .. }
        ));
    }

    #[test]
    fn test_to_error() {
        assert!(SeqNumCheck::Ok.to_error().is_none());
        let err = SeqNumCheck::classify(3, 5).to_error().unwrap();
        assert_eq!(err.to_string(), "MsgSeqNum too low, expecting 5 but received 3");
    }
}
