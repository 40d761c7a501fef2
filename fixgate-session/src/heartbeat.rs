/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Heartbeat and TestRequest bookkeeping.
//!
//! The manager does not own timers. It records traffic in both directions,
//! tracks the outstanding TestRequest and tells the state machine how long
//! each heartbeat timer should run.

use std::time::{Duration, Instant};

/// Slack granted to the counterparty before it is considered idle.
const PEER_GRACE: Duration = Duration::from_secs(1);

/// Tracks heartbeat timing for a FIX session.
#[derive(Debug)]
pub struct HeartbeatManager {
    interval: Duration,
    last_sent: Instant,
    last_received: Instant,
    test_request_pending: Option<String>,
    test_request_sent_at: Option<Instant>,
    test_request_counter: u64,
}

impl HeartbeatManager {
    /// Creates a new heartbeat manager with the specified interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            last_sent: now,
            last_received: now,
            test_request_pending: None,
            test_request_sent_at: None,
            test_request_counter: 0,
        }
    }

    /// Replaces the interval, typically with the HeartBtInt of a Logon.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Records that a message was sent.
    #[inline]
    pub fn on_message_sent(&mut self) {
        self.last_sent = Instant::now();
    }

    /// Records that a message was received.
    ///
    /// A Heartbeat echoing the pending TestReqID clears the pending request.
    /// Returns true if it did.
    pub fn on_message_received(&mut self, is_heartbeat: bool, test_req_id: Option<&str>) -> bool {
        self.last_received = Instant::now();

        if is_heartbeat
            && let (Some(pending), Some(received)) = (&self.test_request_pending, test_req_id)
            && pending == received
        {
            self.test_request_pending = None;
            self.test_request_sent_at = None;
            return true;
        }
        false
    }

    /// Returns a fresh TestReqID.
    pub fn next_test_req_id(&mut self) -> String {
        self.test_request_counter += 1;
        format!("TEST{}", self.test_request_counter)
    }

    /// Records that a TestRequest was sent.
    pub fn on_test_request_sent(&mut self, test_req_id: String) {
        self.test_request_pending = Some(test_req_id);
        self.test_request_sent_at = Some(Instant::now());
        self.last_sent = Instant::now();
    }

    /// Returns the pending TestRequest ID, if any.
    #[must_use]
    pub fn pending_test_request(&self) -> Option<&str> {
        self.test_request_pending.as_deref()
    }

    /// Returns how long the outstanding TestRequest has been waiting.
    #[must_use]
    pub fn test_request_elapsed(&self) -> Option<Duration> {
        self.test_request_sent_at.map(|at| at.elapsed())
    }

    /// Silence after which the counterparty is probed with a TestRequest.
    #[must_use]
    pub fn peer_idle_after(&self) -> Duration {
        self.interval + PEER_GRACE
    }

    /// Returns the time since the last message was received.
    #[must_use]
    pub fn time_since_last_received(&self) -> Duration {
        self.last_received.elapsed()
    }

    /// Returns the time since the last message was sent.
    #[must_use]
    pub fn time_since_last_sent(&self) -> Duration {
        self.last_sent.elapsed()
    }

    /// Returns the heartbeat interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Resets the manager state, keeping the interval.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_sent = now;
        self.last_received = now;
        self.test_request_pending = None;
        self.test_request_sent_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_manager_new() {
        let manager = HeartbeatManager::new(Duration::from_secs(30));
        assert_eq!(manager.interval(), Duration::from_secs(30));
        assert_eq!(manager.peer_idle_after(), Duration::from_secs(31));
        assert!(manager.pending_test_request().is_none());
    }

    #[test]
    fn test_heartbeat_manager_test_request_cycle() {
        let mut manager = HeartbeatManager::new(Duration::from_secs(30));
        let id = manager.next_test_req_id();
        assert_eq!(id, "TEST1");

        manager.on_test_request_sent(id.clone());
        assert_eq!(manager.pending_test_request(), Some("TEST1"));
        assert!(manager.test_request_elapsed().is_some());

        assert!(!manager.on_message_received(true, Some("OTHER")));
        assert!(manager.pending_test_request().is_some());

        assert!(manager.on_message_received(true, Some(&id)));
        assert!(manager.pending_test_request().is_none());
        assert_eq!(manager.next_test_req_id(), "TEST2");
    }

    #[test]
    fn test_heartbeat_manager_set_interval() {
        let mut manager = HeartbeatManager::new(Duration::from_secs(30));
        manager.set_interval(Duration::from_secs(5));
        assert_eq!(manager.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_heartbeat_manager_reset() {
        let mut manager = HeartbeatManager::new(Duration::from_secs(30));
        manager.on_test_request_sent("TEST1".to_string());
        manager.reset();
        assert!(manager.pending_test_request().is_none());
        assert!(manager.test_request_elapsed().is_none());
    }
}
