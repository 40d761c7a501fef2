/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-memory message store implementation.
//!
//! This module provides a memory-only store suitable for testing and for
//! sessions that do not need to survive a restart.

use crate::state::SequenceState;
use crate::traits::{MessageStore, MessageStoreFactory, ensure_complete};
use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use fixgate_core::{SessionId, Timestamp};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory message store.
///
/// Stores messages in a `BTreeMap` for efficient range queries.
/// Not persistent - all data is lost when the process exits.
#[derive(Debug)]
pub struct MemoryStore {
    /// Stored messages indexed by sequence number.
    messages: RwLock<BTreeMap<u64, Bytes>>,
    /// Next sender sequence number.
    next_sender_seq: AtomicU64,
    /// Next expected target sequence number.
    next_target_seq: AtomicU64,
    /// Session epoch.
    creation_time: RwLock<Timestamp>,
}

impl MemoryStore {
    /// Creates a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::from_state(SequenceState::fresh())
    }

    /// Creates a memory store seeded from `state`.
    #[must_use]
    pub fn from_state(state: SequenceState) -> Self {
        Self {
            messages: RwLock::new(BTreeMap::new()),
            next_sender_seq: AtomicU64::new(state.next_sender_seq),
            next_target_seq: AtomicU64::new(state.next_target_seq),
            creation_time: RwLock::new(state.creation_time),
        }
    }

    /// Returns the counters and epoch as one value.
    #[must_use]
    pub fn state(&self) -> SequenceState {
        SequenceState {
            creation_time: *self.creation_time.read(),
            next_sender_seq: self.next_sender_seq.load(Ordering::SeqCst),
            next_target_seq: self.next_target_seq.load(Ordering::SeqCst),
        }
    }

    /// Returns the number of stored messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.read().len()
    }

    /// Checks if a message with the given sequence number exists.
    #[must_use]
    pub fn contains(&self, seq_num: u64) -> bool {
        self.messages.read().contains_key(&seq_num)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    fn next_sender_seq(&self) -> u64 {
        self.next_sender_seq.load(Ordering::SeqCst)
    }

    fn next_target_seq(&self) -> u64 {
        self.next_target_seq.load(Ordering::SeqCst)
    }

    fn creation_time(&self) -> Timestamp {
        *self.creation_time.read()
    }

    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        self.next_sender_seq.store(seq, Ordering::SeqCst);
        Ok(())
    }

    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        self.next_target_seq.store(seq, Ordering::SeqCst);
        Ok(())
    }

    async fn save_message(&self, seq: u64, message: &[u8]) -> Result<(), StoreError> {
        self.messages
            .write()
            .insert(seq, Bytes::copy_from_slice(message));
        Ok(())
    }

    async fn save_message_and_incr_next_sender_seq(
        &self,
        seq: u64,
        message: &[u8],
    ) -> Result<(), StoreError> {
        let mut messages = self.messages.write();
        messages.insert(seq, Bytes::copy_from_slice(message));
        self.next_sender_seq.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_messages(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError> {
        if begin > end {
            return Ok(Vec::new());
        }
        let found = self
            .messages
            .read()
            .range(begin..=end)
            .map(|(seq, bytes)| (*seq, bytes.clone()))
            .collect();
        ensure_complete(begin, end, found)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut messages = self.messages.write();
        messages.clear();
        self.next_sender_seq.store(1, Ordering::SeqCst);
        self.next_target_seq.store(1, Ordering::SeqCst);
        *self.creation_time.write() = Timestamp::now();
        Ok(())
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Factory creating an independent [`MemoryStore`] for every session.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryStoreFactory;

impl MemoryStoreFactory {
    /// Creates a new memory store factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageStoreFactory for MemoryStoreFactory {
    async fn create(&self, _session_id: &SessionId) -> Result<Box<dyn MessageStore>, StoreError> {
        Ok(Box::new(MemoryStore::new()))
    }
}
