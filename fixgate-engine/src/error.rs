/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Engine error type.

use fixgate_core::error::{FixError, SessionError, StoreError};
use thiserror::Error;

/// Errors returned by the engine and by [`SessionHandle`](crate::SessionHandle).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The session reported an error.
    #[error(transparent)]
    Fix(#[from] FixError),

    /// No configuration was registered for the session.
    #[error("no configuration for session {0}")]
    UnknownSession(String),

    /// The session already has a running task.
    #[error("session {0} is already running")]
    AlreadyRunning(String),

    /// The session task has stopped and no longer accepts events.
    #[error("session task has stopped")]
    Stopped,
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        Self::Fix(err.into())
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::Fix(err.into())
    }
}
