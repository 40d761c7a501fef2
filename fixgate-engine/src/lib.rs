/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixgate engine
//!
//! Tokio runtime glue for fixgate sessions.
//!
//! This crate provides:
//! - **Runner**: one task per session that owns its state machine and handles
//!   inbound frames, timer expiries and local commands in order
//! - **Timers**: tokio tasks that post timeouts back into the runner
//! - **Handle**: cloneable front end used by transports and applications
//! - **Builder API**: fluent configuration of application, stores and sessions
//!
//! The transport is left to the caller: read frames with
//! [`fixgate_tagvalue::frame_length`], pass them to
//! [`SessionHandle::inbound`], and write whatever the session's
//! [`MessageSender`] receives.

pub mod builder;
pub mod error;
pub mod handle;
pub mod runner;
pub mod timers;

pub use builder::{Engine, EngineBuilder};
pub use error::EngineError;
pub use handle::SessionHandle;
pub use runner::{SessionEvent, SessionRunner};
pub use timers::TimerManager;

pub use fixgate_session::{
    Application, ChannelSender, MessageSender, NoOpApplication, RejectReason, SessionConfig,
    SessionState,
};
