/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-session message and event log.

use fixgate_core::SessionId;
use parking_lot::Mutex;
use tracing::{debug, info};

/// Sink for raw traffic and session events.
pub trait SessionLog: Send + Sync {
    /// Records a raw inbound message.
    fn on_incoming(&self, session_id: &SessionId, raw: &[u8]);

    /// Records a raw outbound message.
    fn on_outgoing(&self, session_id: &SessionId, raw: &[u8]);

    /// Records a session event.
    fn on_event(&self, session_id: &SessionId, text: &str);
}

/// Renders a raw FIX message with `|` in place of SOH.
#[must_use]
pub fn printable(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace('\x01', "|")
}

/// Log that forwards to `tracing`.
///
/// Traffic goes out at `debug`, events at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl SessionLog for TracingLog {
    fn on_incoming(&self, session_id: &SessionId, raw: &[u8]) {
        debug!(session = %session_id, message = %printable(raw), "incoming");
    }

    fn on_outgoing(&self, session_id: &SessionId, raw: &[u8]) {
        debug!(session = %session_id, message = %printable(raw), "outgoing");
    }

    fn on_event(&self, session_id: &SessionId, text: &str) {
        info!(session = %session_id, "{text}");
    }
}

/// Log that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl SessionLog for NullLog {
    fn on_incoming(&self, _session_id: &SessionId, _raw: &[u8]) {}

    fn on_outgoing(&self, _session_id: &SessionId, _raw: &[u8]) {}

    fn on_event(&self, _session_id: &SessionId, _text: &str) {}
}

/// Log that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    incoming: Mutex<Vec<Vec<u8>>>,
    outgoing: Mutex<Vec<Vec<u8>>>,
    events: Mutex<Vec<String>>,
}

impl MemoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Returns the recorded inbound messages.
    #[must_use]
    pub fn incoming(&self) -> Vec<Vec<u8>> {
        self.incoming.lock().clone()
    }

    /// Returns the recorded outbound messages.
    #[must_use]
    pub fn outgoing(&self) -> Vec<Vec<u8>> {
        self.outgoing.lock().clone()
    }

    /// Returns true if any event contains `needle`.
    #[must_use]
    pub fn has_event(&self, needle: &str) -> bool {
        self.events.lock().iter().any(|e| e.contains(needle))
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.incoming.lock().clear();
        self.outgoing.lock().clear();
        self.events.lock().clear();
    }
}

impl SessionLog for MemoryLog {
    fn on_incoming(&self, _session_id: &SessionId, raw: &[u8]) {
        self.incoming.lock().push(raw.to_vec());
    }

    fn on_outgoing(&self, _session_id: &SessionId, raw: &[u8]) {
        self.outgoing.lock().push(raw.to_vec());
    }

    fn on_event(&self, _session_id: &SessionId, text: &str) {
        self.events.lock().push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable() {
        assert_eq!(printable(b"8=FIX.4.4\x0135=0\x01"), "8=FIX.4.4|35=0|");
    }

    #[test]
    fn test_memory_log_records() {
        let log = MemoryLog::new();
        let id = SessionId::new("FIX.4.4", "A", "B");
        log.on_event(&id, "Created session");
        log.on_outgoing(&id, b"out");
        log.on_incoming(&id, b"in");

        assert!(log.has_event("Created"));
        assert_eq!(log.outgoing(), vec![b"out".to_vec()]);
        assert_eq!(log.incoming().len(), 1);

        log.clear();
        assert!(log.events().is_empty());
    }
}
