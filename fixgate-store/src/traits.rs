/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message store trait definitions.
//!
//! A [`MessageStore`] is scoped to one session and owned by that session's
//! state machine. Reads come from the in-memory view and never block;
//! mutations are async because durable backends wait for their commit.

use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use fixgate_core::{SessionId, Timestamp};

/// Store of sequence numbers and sent messages for one session.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Returns the next sequence number this side will send.
    fn next_sender_seq(&self) -> u64;

    /// Returns the next sequence number expected from the counterparty.
    fn next_target_seq(&self) -> u64;

    /// Returns the session epoch.
    fn creation_time(&self) -> Timestamp;

    /// Sets the next sender sequence number.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the backend write fails; the
    /// visible counter is unchanged in that case.
    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError>;

    /// Sets the next expected target sequence number.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the backend write fails.
    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError>;

    /// Advances the next sender sequence number by one.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the backend write fails.
    async fn incr_next_sender_seq(&self) -> Result<(), StoreError> {
        self.set_next_sender_seq(self.next_sender_seq() + 1).await
    }

    /// Advances the next expected target sequence number by one.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the backend write fails.
    async fn incr_next_target_seq(&self) -> Result<(), StoreError> {
        self.set_next_target_seq(self.next_target_seq() + 1).await
    }

    /// Saves a sent message, replacing any message stored at `seq`.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the backend write fails.
    async fn save_message(&self, seq: u64, message: &[u8]) -> Result<(), StoreError>;

    /// Saves a sent message and advances the next sender sequence number.
    ///
    /// Both effects commit together or not at all.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the backend write fails; neither
    /// the message nor the counter change is visible afterwards.
    async fn save_message_and_incr_next_sender_seq(
        &self,
        seq: u64,
        message: &[u8],
    ) -> Result<(), StoreError>;

    /// Returns the messages stored at `begin..=end`, in ascending order.
    ///
    /// An empty range (`begin > end`) yields an empty vector.
    ///
    /// # Errors
    /// Returns `StoreError::RangeNotAvailable` naming the first missing
    /// sequence number if the range is not fully stored.
    async fn get_messages(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError>;

    /// Clears the message log, sets both counters to 1 and renews the epoch.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the backend write fails; nothing
    /// is changed in that case.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Reloads the in-memory view from the backend.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the backend cannot be read.
    async fn refresh(&self) -> Result<(), StoreError>;

    /// Releases backend resources.
    ///
    /// # Errors
    /// Returns `StoreError` if the backend fails to close cleanly.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Creates one [`MessageStore`] per session.
#[async_trait]
pub trait MessageStoreFactory: Send + Sync {
    /// Creates the store for `session_id`, loading or creating its record.
    ///
    /// # Errors
    /// Returns `StoreError::UnknownSession` if the factory has no settings for
    /// the session, or a backend error if the record cannot be loaded.
    async fn create(&self, session_id: &SessionId) -> Result<Box<dyn MessageStore>, StoreError>;
}

/// Checks that `messages` covers `begin..=end` exactly.
///
/// `messages` must be sorted by sequence number.
pub(crate) fn ensure_complete(
    begin: u64,
    end: u64,
    messages: Vec<(u64, Bytes)>,
) -> Result<Vec<Bytes>, StoreError> {
    let mut expected = begin;
    let mut out = Vec::with_capacity(messages.len());
    for (seq, bytes) in messages {
        if seq != expected {
            break;
        }
        out.push(bytes);
        expected += 1;
    }
    if expected <= end {
        return Err(StoreError::RangeNotAvailable {
            range: begin..end.saturating_add(1),
            missing: expected,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_complete() {
        let full = vec![(2, Bytes::from_static(b"b")), (3, Bytes::from_static(b"c"))];
        assert_eq!(ensure_complete(2, 3, full).unwrap().len(), 2);

        let gap = vec![(2, Bytes::from_static(b"b")), (4, Bytes::from_static(b"d"))];
        assert_eq!(
            ensure_complete(2, 4, gap),
            Err(StoreError::RangeNotAvailable {
                range: 2..5,
                missing: 3
            })
        );

        assert!(ensure_complete(5, 4, Vec::new()).unwrap().is_empty());
    }
}
