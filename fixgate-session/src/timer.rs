/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session timers.
//!
//! State transitions never sleep. They queue [`TimerCommand`]s on the session
//! and the runtime driving the session arms real timers, delivering each
//! expiry back as a [`Timeout`] event.

use std::fmt;
use std::time::Duration;

/// Timer kinds a session can arm. At most one of each kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// The counterparty did not complete the logon handshake in time.
    LogonTimeout,
    /// The counterparty did not answer our Logout in time.
    LogoutTimeout,
    /// Nothing was sent for a heartbeat interval.
    HeartbeatDue,
    /// Nothing was received for a heartbeat interval plus grace.
    PeerIdle,
    /// A TestRequest went unanswered.
    TestRequestTimeout,
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LogonTimeout => "logon timeout",
            Self::LogoutTimeout => "logout timeout",
            Self::HeartbeatDue => "heartbeat due",
            Self::PeerIdle => "peer idle",
            Self::TestRequestTimeout => "test request timeout",
        };
        f.write_str(name)
    }
}

/// Request from the state machine to the timer runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Arm (or re-arm) a timer.
    Arm(Timeout, Duration),
    /// Cancel a timer if it is armed.
    Cancel(Timeout),
    /// Cancel every timer of the session.
    CancelAll,
}
