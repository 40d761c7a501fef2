/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Store configuration.
//!
//! [`SqlStoreConfig`] describes one durable backend; [`StoreSettings`] maps
//! sessions to backends and decides what happens for sessions that were not
//! configured explicitly.

use fixgate_core::SessionId;
use fixgate_core::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default name of the messages table.
pub const DEFAULT_MESSAGES_TABLE: &str = "messages";

/// Default name of the sessions table.
pub const DEFAULT_SESSIONS_TABLE: &str = "sessions";

/// Drivers this build can open.
const SUPPORTED_DRIVERS: &[&str] = &["sqlite3", "sqlite"];

/// Bind parameter syntax of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `?` positional parameters.
    #[default]
    Question,
    /// `$1`, `$2`, ... numbered parameters.
    Dollar,
}

impl PlaceholderStyle {
    /// Returns the placeholder style conventionally used by `driver`.
    #[must_use]
    pub fn for_driver(driver: &str) -> Self {
        match driver {
            "postgres" | "pgx" => Self::Dollar,
            _ => Self::Question,
        }
    }
}

fn default_messages_table() -> String {
    DEFAULT_MESSAGES_TABLE.to_string()
}

fn default_sessions_table() -> String {
    DEFAULT_SESSIONS_TABLE.to_string()
}

const fn default_true() -> bool {
    true
}

/// Configuration of one SQL-backed store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlStoreConfig {
    /// Driver identifier (`sqlite3` or `sqlite`).
    pub driver: String,
    /// Data source locator; for SQLite, the database file path.
    pub data_source: String,
    /// Name of the messages table.
    #[serde(default = "default_messages_table")]
    pub messages_table: String,
    /// Name of the sessions table.
    #[serde(default = "default_sessions_table")]
    pub sessions_table: String,
    /// Connections older than this are closed instead of reused.
    #[serde(default)]
    pub conn_max_lifetime: Option<Duration>,
    /// Overrides the placeholder style derived from the driver.
    #[serde(default)]
    pub placeholder: Option<PlaceholderStyle>,
    /// Create the tables on first use if they do not exist.
    #[serde(default = "default_true")]
    pub create_schema: bool,
}

impl SqlStoreConfig {
    /// Creates a configuration with default table names.
    #[must_use]
    pub fn new(driver: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            data_source: data_source.into(),
            messages_table: default_messages_table(),
            sessions_table: default_sessions_table(),
            conn_max_lifetime: None,
            placeholder: None,
            create_schema: true,
        }
    }

    /// Creates a SQLite configuration for the database file at `path`.
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new("sqlite3", path)
    }

    /// Sets the messages table name.
    #[must_use]
    pub fn with_messages_table(mut self, name: impl Into<String>) -> Self {
        self.messages_table = name.into();
        self
    }

    /// Sets the sessions table name.
    #[must_use]
    pub fn with_sessions_table(mut self, name: impl Into<String>) -> Self {
        self.sessions_table = name.into();
        self
    }

    /// Sets the connection max lifetime.
    #[must_use]
    pub fn with_conn_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.conn_max_lifetime = Some(lifetime);
        self
    }

    /// Overrides the placeholder style.
    #[must_use]
    pub fn with_placeholder(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder = Some(style);
        self
    }

    /// Sets whether tables are created on first use.
    #[must_use]
    pub fn with_create_schema(mut self, create: bool) -> Self {
        self.create_schema = create;
        self
    }

    /// Returns the effective placeholder style.
    #[must_use]
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.placeholder
            .unwrap_or_else(|| PlaceholderStyle::for_driver(&self.driver))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `StoreError::Configuration` for an unsupported driver, an empty
    /// data source, or a table name that is not a plain identifier.
    pub fn validate(&self) -> Result<(), StoreError> {
        if !SUPPORTED_DRIVERS.contains(&self.driver.as_str()) {
            return Err(StoreError::Configuration(format!(
                "unsupported sql driver '{}'",
                self.driver
            )));
        }
        if self.data_source.is_empty() {
            return Err(StoreError::Configuration(
                "data source must not be empty".to_string(),
            ));
        }
        for name in [&self.messages_table, &self.sessions_table] {
            if !is_identifier(name) {
                return Err(StoreError::Configuration(format!(
                    "invalid table name '{name}'"
                )));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Store settings for a set of sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Settings applied to unconfigured sessions when `dynamic_sessions` is set.
    pub global: SqlStoreConfig,
    /// Per-session settings.
    #[serde(default)]
    pub sessions: HashMap<SessionId, SqlStoreConfig>,
    /// Let unconfigured sessions use the global settings.
    #[serde(default)]
    pub dynamic_sessions: bool,
}

impl StoreSettings {
    /// Creates settings with only a global backend.
    #[must_use]
    pub fn new(global: SqlStoreConfig) -> Self {
        Self {
            global,
            sessions: HashMap::new(),
            dynamic_sessions: false,
        }
    }

    /// Adds settings for one session.
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId, config: SqlStoreConfig) -> Self {
        self.sessions.insert(session_id, config);
        self
    }

    /// Sets the dynamic-session fallback.
    #[must_use]
    pub fn with_dynamic_sessions(mut self, dynamic: bool) -> Self {
        self.dynamic_sessions = dynamic;
        self
    }

    /// Resolves the settings for `session_id`.
    ///
    /// # Errors
    /// Returns `StoreError::UnknownSession` if the session is not configured
    /// and dynamic sessions are disabled.
    pub fn resolve(&self, session_id: &SessionId) -> Result<&SqlStoreConfig, StoreError> {
        match self.sessions.get(session_id) {
            Some(config) => Ok(config),
            None if self.dynamic_sessions => Ok(&self.global),
            None => Err(StoreError::UnknownSession(session_id.to_string())),
        }
    }
}
