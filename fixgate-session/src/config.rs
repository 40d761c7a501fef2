/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session configuration.
//!
//! This module provides configuration options for FIX sessions.

use fixgate_core::SessionId;
use fixgate_core::error::SessionError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(30)
}

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_max_message_size() -> usize {
    1024 * 1024
}

const fn default_true() -> bool {
    true
}

/// Configuration for a FIX session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Identity of the session, seen from this side.
    pub session_id: SessionId,
    /// Heartbeat interval proposed on logon.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: Duration,
    /// Time allowed for the counterparty to complete the logon handshake.
    #[serde(default = "default_timeout")]
    pub logon_timeout: Duration,
    /// Time allowed for the counterparty to answer our Logout.
    #[serde(default = "default_timeout")]
    pub logout_timeout: Duration,
    /// Reset sequence numbers on every acceptor-side logon.
    ///
    /// Off by default, so numbering carries over between logons and a stale
    /// counterparty Logon is caught as too low. A Logon carrying
    /// ResetSeqNumFlag(141)=Y resets either way. Turn this on for
    /// counterparties that restart at 1 on every connection.
    #[serde(default)]
    pub reset_on_logon: bool,
    /// Reset sequence numbers when a logout completes.
    #[serde(default)]
    pub reset_on_logout: bool,
    /// Reset sequence numbers when the transport disconnects.
    #[serde(default)]
    pub reset_on_disconnect: bool,
    /// DefaultApplVerID (1137) sent on logon for FIXT sessions.
    #[serde(default)]
    pub default_appl_ver_id: Option<String>,
    /// Check SenderCompID/TargetCompID on every inbound message.
    #[serde(default = "default_true")]
    pub validate_comp_ids: bool,
    /// Validate inbound checksums.
    #[serde(default = "default_true")]
    pub validate_checksum: bool,
    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Largest range requested by one ResendRequest; 0 requests the whole gap.
    #[serde(default)]
    pub resend_request_chunk_size: u64,
}

impl SessionConfig {
    /// Creates a configuration with default timers for the given session.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            heartbeat_interval: default_heartbeat_interval(),
            logon_timeout: default_timeout(),
            logout_timeout: default_timeout(),
            reset_on_logon: false,
            reset_on_logout: false,
            reset_on_disconnect: false,
            default_appl_ver_id: None,
            validate_comp_ids: true,
            validate_checksum: true,
            max_message_size: default_max_message_size(),
            resend_request_chunk_size: 0,
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the logon timeout.
    #[must_use]
    pub fn with_logon_timeout(mut self, timeout: Duration) -> Self {
        self.logon_timeout = timeout;
        self
    }

    /// Sets the logout timeout.
    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Sets whether to reset sequence numbers on logon.
    #[must_use]
    pub const fn with_reset_on_logon(mut self, reset: bool) -> Self {
        self.reset_on_logon = reset;
        self
    }

    /// Sets whether to reset sequence numbers on logout.
    #[must_use]
    pub const fn with_reset_on_logout(mut self, reset: bool) -> Self {
        self.reset_on_logout = reset;
        self
    }

    /// Sets whether to reset sequence numbers on disconnect.
    #[must_use]
    pub const fn with_reset_on_disconnect(mut self, reset: bool) -> Self {
        self.reset_on_disconnect = reset;
        self
    }

    /// Sets the DefaultApplVerID sent on logon.
    #[must_use]
    pub fn with_default_appl_ver_id(mut self, id: impl Into<String>) -> Self {
        self.default_appl_ver_id = Some(id.into());
        self
    }

    /// Sets whether CompIDs are validated.
    #[must_use]
    pub const fn with_validate_comp_ids(mut self, validate: bool) -> Self {
        self.validate_comp_ids = validate;
        self
    }

    /// Sets the maximum inbound message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Sets the ResendRequest chunk size.
    #[must_use]
    pub const fn with_resend_request_chunk_size(mut self, size: u64) -> Self {
        self.resend_request_chunk_size = size;
        self
    }

    /// Returns the heartbeat interval in seconds.
    #[must_use]
    pub fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval.as_secs()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a required value is empty or zero.
    pub fn validate(&self) -> Result<(), SessionError> {
        let id = &self.session_id;
        if id.begin_string.is_empty() || id.sender_comp_id.is_empty() || id.target_comp_id.is_empty() {
            return Err(SessionError::Configuration(
                "begin string, sender and target comp ids are required".to_string(),
            ));
        }
        if self.heartbeat_interval.as_secs() == 0 {
            return Err(SessionError::Configuration(
                "heartbeat interval must be at least one second".to_string(),
            ));
        }
        if self.logon_timeout.is_zero() || self.logout_timeout.is_zero() {
            return Err(SessionError::Configuration(
                "logon and logout timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for session configuration.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    begin_string: Option<String>,
    sender_comp_id: Option<String>,
    target_comp_id: Option<String>,
    qualifier: Option<String>,
    heartbeat_interval: Option<Duration>,
    reset_on_logon: bool,
    max_message_size: Option<usize>,
}

impl SessionConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender CompID.
    #[must_use]
    pub fn sender_comp_id(mut self, id: impl Into<String>) -> Self {
        self.sender_comp_id = Some(id.into());
        self
    }

    /// Sets the target CompID.
    #[must_use]
    pub fn target_comp_id(mut self, id: impl Into<String>) -> Self {
        self.target_comp_id = Some(id.into());
        self
    }

    /// Sets the FIX version.
    #[must_use]
    pub fn begin_string(mut self, version: impl Into<String>) -> Self {
        self.begin_string = Some(version.into());
        self
    }

    /// Sets the session qualifier.
    #[must_use]
    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Sets whether to reset on logon.
    #[must_use]
    pub const fn reset_on_logon(mut self, reset: bool) -> Self {
        self.reset_on_logon = reset;
        self
    }

    /// Sets the maximum inbound message size.
    #[must_use]
    pub const fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a CompID is missing or the
    /// resulting configuration is invalid.
    pub fn build(self) -> Result<SessionConfig, SessionError> {
        let sender = self
            .sender_comp_id
            .ok_or_else(|| SessionError::Configuration("sender_comp_id is required".to_string()))?;
        let target = self
            .target_comp_id
            .ok_or_else(|| SessionError::Configuration("target_comp_id is required".to_string()))?;
        let begin_string = self.begin_string.unwrap_or_else(|| "FIX.4.4".to_string());

        let mut session_id = SessionId::new(begin_string, sender, target);
        session_id.qualifier = self.qualifier;

        let mut config = SessionConfig::new(session_id);
        if let Some(interval) = self.heartbeat_interval {
            config.heartbeat_interval = interval;
        }
        config.reset_on_logon = self.reset_on_logon;
        if let Some(size) = self.max_message_size {
            config.max_message_size = size;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_new() {
        let config = SessionConfig::new(SessionId::new("FIX.4.4", "SENDER", "TARGET"));

        assert_eq!(config.session_id.sender_comp_id, "SENDER");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert!(config.validate_comp_ids);
        assert!(!config.reset_on_logon);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfigBuilder::new()
            .sender_comp_id("SENDER")
            .target_comp_id("TARGET")
            .begin_string("FIX.4.2")
            .heartbeat_interval(Duration::from_secs(60))
            .reset_on_logon(true)
            .build()
            .unwrap();

        assert_eq!(config.session_id.begin_string, "FIX.4.2");
        assert_eq!(config.heartbeat_interval_secs(), 60);
        assert!(config.reset_on_logon);
    }

    #[test]
    fn test_session_config_builder_missing_target() {
        let result = SessionConfigBuilder::new().sender_comp_id("SENDER").build();
        assert!(matches!(result, Err(SessionError::Configuration(_))));
    }

    #[test]
    fn test_session_config_rejects_zero_interval() {
        let config = SessionConfig::new(SessionId::new("FIX.4.4", "A", "B"))
            .with_heartbeat_interval(Duration::from_millis(500));
        assert!(config.validate().is_err());
    }
}
