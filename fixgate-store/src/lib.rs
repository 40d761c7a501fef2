/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixgate Store
//!
//! Sequence-number and message persistence for the fixgate session layer.
//!
//! This crate provides:
//! - **MessageStore trait**: the per-session store contract
//! - **MemoryStore**: memory-only store for tests and non-durable sessions
//! - **SqlStore**: SQLite-backed store with an in-memory mirror of the counters
//! - **Factories**: [`MessageStoreFactory`] implementations creating one store per session
//!
//! Durable stores follow one consistency rule: the backend write commits
//! first and the mirror is updated only after the commit succeeded.

pub mod config;
pub mod memory;
pub mod sql;
pub mod state;
pub mod traits;

pub use config::{PlaceholderStyle, SqlStoreConfig, StoreSettings};
pub use memory::{MemoryStore, MemoryStoreFactory};
pub use sql::{SqlPool, SqlStore, SqlStoreFactory};
pub use state::SequenceState;
pub use traits::{MessageStore, MessageStoreFactory};
