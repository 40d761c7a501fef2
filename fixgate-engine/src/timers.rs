/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio-backed session timers.
//!
//! Each armed [`Timeout`] is a task that sleeps for its duration and then
//! posts [`SessionEvent::Timeout`] to the session's event channel. The state
//! machine never sees the tasks; it only queues [`TimerCommand`]s.
//!
//! Every arm gets a fresh generation. An expiry that was already queued when
//! its timer was cancelled or re-armed carries an old generation and is
//! dropped by [`TimerManager::take_expired`].

use crate::runner::SessionEvent;
use fixgate_session::{Timeout, TimerCommand};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Debug)]
struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Runs the timers of one session.
///
/// The manager holds a weak sender so that pending timers do not keep the
/// session's event channel open.
#[derive(Debug)]
pub struct TimerManager {
    timers: HashMap<Timeout, ArmedTimer>,
    event_tx: mpsc::WeakSender<SessionEvent>,
    next_generation: u64,
}

impl TimerManager {
    /// Creates a timer manager posting into `event_tx`.
    #[must_use]
    pub fn new(event_tx: mpsc::WeakSender<SessionEvent>) -> Self {
        Self {
            timers: HashMap::new(),
            event_tx,
            next_generation: 0,
        }
    }

    /// Arms `timeout` to fire after `duration`.
    ///
    /// An armed timer with the same kind is cancelled first.
    pub fn set_timer(&mut self, timeout: Timeout, duration: Duration) {
        self.cancel_timer(timeout);

        self.next_generation += 1;
        let generation = self.next_generation;
        let event_tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            trace!(%timeout, generation, "timer fired");
            if let Some(tx) = event_tx.upgrade() {
                let _ = tx
                    .send(SessionEvent::Timeout {
                        timeout,
                        generation,
                    })
                    .await;
            }
        });

        self.timers.insert(timeout, ArmedTimer { generation, handle });
        debug!(%timeout, ?duration, generation, "timer set");
    }

    /// Accepts an expiry posted by a timer task.
    ///
    /// Returns true and disarms `timeout` when `generation` is the current
    /// arm. Returns false for an expiry whose timer was cancelled or re-armed
    /// after it fired.
    pub fn take_expired(&mut self, timeout: Timeout, generation: u64) -> bool {
        match self.timers.get(&timeout) {
            Some(armed) if armed.generation == generation => {
                self.timers.remove(&timeout);
                true
            }
            _ => {
                debug!(%timeout, generation, "dropping stale timer expiry");
                false
            }
        }
    }

    /// Cancels `timeout`. A timer that is not armed is ignored.
    pub fn cancel_timer(&mut self, timeout: Timeout) {
        if let Some(armed) = self.timers.remove(&timeout) {
            armed.handle.abort();
            debug!(%timeout, "timer cancelled");
        }
    }

    /// Cancels every armed timer.
    pub fn cancel_all(&mut self) {
        for (timeout, armed) in self.timers.drain() {
            armed.handle.abort();
            trace!(%timeout, "timer cancelled (all)");
        }
    }

    /// Executes one command queued by the state machine.
    pub fn apply(&mut self, command: TimerCommand) {
        match command {
            TimerCommand::Arm(timeout, duration) => self.set_timer(timeout, duration),
            TimerCommand::Cancel(timeout) => self.cancel_timer(timeout),
            TimerCommand::CancelAll => self.cancel_all(),
        }
    }

    /// Returns the number of armed timers whose expiry has not been taken.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Returns true if `timeout` is armed.
    #[must_use]
    pub fn is_armed(&self, timeout: Timeout) -> bool {
        self.timers
            .get(&timeout)
            .is_some_and(|armed| !armed.handle.is_finished())
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (
        TimerManager,
        mpsc::Sender<SessionEvent>,
        mpsc::Receiver<SessionEvent>,
    ) {
        let (tx, rx) = mpsc::channel(10);
        (TimerManager::new(tx.downgrade()), tx, rx)
    }

    #[tokio::test]
    async fn test_timer_fires() {
        let (mut timers, _tx, mut rx) = manager();
        timers.set_timer(Timeout::HeartbeatDue, Duration::from_millis(10));

        let event = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert!(matches!(
            event,
            SessionEvent::Timeout {
                timeout: Timeout::HeartbeatDue,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_timer_cancel() {
        let (mut timers, _tx, mut rx) = manager();
        timers.set_timer(Timeout::LogonTimeout, Duration::from_millis(50));
        assert!(timers.is_armed(Timeout::LogonTimeout));
        timers.cancel_timer(Timeout::LogonTimeout);
        assert!(!timers.is_armed(Timeout::LogonTimeout));

        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "timer should have been cancelled");
    }

    #[tokio::test]
    async fn test_timer_replace() {
        let (mut timers, _tx, mut rx) = manager();
        timers.set_timer(Timeout::PeerIdle, Duration::from_secs(5));
        timers.set_timer(Timeout::PeerIdle, Duration::from_millis(10));
        assert_eq!(timers.active_count(), 1);

        let event = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout - replaced timer didn't fire")
            .expect("channel closed");
        let SessionEvent::Timeout {
            timeout,
            generation,
        } = event
        else {
            panic!("expected a timeout");
        };
        assert_eq!(timeout, Timeout::PeerIdle);
        assert_eq!(generation, 2);
        assert!(timers.take_expired(timeout, generation));
        assert_eq!(timers.active_count(), 0);
    }

    #[tokio::test]
    async fn test_expiry_from_previous_arm_is_dropped() {
        let (mut timers, _tx, mut rx) = manager();
        timers.set_timer(Timeout::PeerIdle, Duration::from_millis(5));
        let event = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        let SessionEvent::Timeout {
            timeout,
            generation,
        } = event
        else {
            panic!("expected a timeout");
        };

        // Traffic re-arms the timer before the queued expiry is handled.
        timers.set_timer(Timeout::PeerIdle, Duration::from_secs(5));
        assert!(!timers.take_expired(timeout, generation));
        assert!(timers.is_armed(Timeout::PeerIdle));

        timers.cancel_timer(Timeout::PeerIdle);
        assert!(!timers.take_expired(timeout, generation + 1));
    }

    #[tokio::test]
    async fn test_apply_commands() {
        let (mut timers, _tx, mut rx) = manager();
        timers.apply(TimerCommand::Arm(
            Timeout::HeartbeatDue,
            Duration::from_millis(50),
        ));
        timers.apply(TimerCommand::Arm(Timeout::PeerIdle, Duration::from_millis(50)));
        assert_eq!(timers.active_count(), 2);

        timers.apply(TimerCommand::Cancel(Timeout::PeerIdle));
        assert_eq!(timers.active_count(), 1);

        timers.apply(TimerCommand::CancelAll);
        assert_eq!(timers.active_count(), 0);

        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "no timers should have fired");
    }

    #[tokio::test]
    async fn test_drop_aborts_timers() {
        let (mut timers, _tx, mut rx) = manager();
        timers.set_timer(Timeout::LogoutTimeout, Duration::from_millis(20));
        drop(timers);

        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "dropped manager should not fire");
    }

    #[tokio::test]
    async fn test_timer_does_not_keep_channel_open() {
        let (mut timers, tx, mut rx) = manager();
        timers.set_timer(Timeout::HeartbeatDue, Duration::from_millis(10));
        drop(tx);

        let event = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("receiver should observe closed channel");
        assert!(event.is_none());
    }
}
