/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixgate Session
//!
//! FIX session layer protocol implementation.
//!
//! This crate provides:
//! - **State machine**: [`SessionState`] variants driven by inbound messages and timer events
//! - **Session context**: [`Session`], owning the store, callbacks and transport for one identity
//! - **Sequence classification**: [`SeqNumCheck`] for gap and duplicate detection
//! - **Heartbeat handling**: Heartbeat/TestRequest bookkeeping
//! - **Recovery**: ResendRequest service, gap fill and inbound gap recovery
//! - **Builders**: Logon, Heartbeat, TestRequest, ResendRequest, SequenceReset, Reject, Logout
//! - **Configuration**: Session configuration options

pub mod application;
pub mod builders;
pub mod config;
pub mod heartbeat;
pub mod log;
pub mod sender;
pub mod sequence;
pub mod session;
pub mod state;
mod states;
pub mod timer;

pub use application::{Application, NoOpApplication, RejectReason};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use heartbeat::HeartbeatManager;
pub use log::{MemoryLog, NullLog, SessionLog, TracingLog};
pub use sender::{ChannelSender, MessageSender, SendError};
pub use sequence::SeqNumCheck;
pub use session::{ResendRange, Session};
pub use state::{SessionState, StateMachine};
pub use timer::{Timeout, TimerCommand};
