/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-session sequence state.

use fixgate_core::Timestamp;

/// Counters and epoch of one session.
///
/// Both counters start at 1 and only move forward by one per message, except
/// on an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceState {
    /// Session epoch, renewed on reset.
    pub creation_time: Timestamp,
    /// Next sequence number this side will send.
    pub next_sender_seq: u64,
    /// Next sequence number expected from the counterparty.
    pub next_target_seq: u64,
}

impl SequenceState {
    /// Returns a fresh state with both counters at 1 and the epoch set to now.
    #[must_use]
    pub fn fresh() -> Self {
        Self {
            creation_time: Timestamp::now(),
            next_sender_seq: 1,
            next_target_seq: 1,
        }
    }
}

impl Default for SequenceState {
    fn default() -> Self {
        Self::fresh()
    }
}
