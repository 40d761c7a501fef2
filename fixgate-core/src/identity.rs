/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session identity.
//!
//! A [`SessionId`] names one logical conversation between two counterparties.
//! It is immutable once built and compares structurally, so it can key maps
//! and durable store records directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite key identifying one FIX session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId {
    /// Protocol version (e.g., "FIX.4.4").
    pub begin_string: String,
    /// Our CompID.
    pub sender_comp_id: String,
    /// Our SubID.
    #[serde(default)]
    pub sender_sub_id: Option<String>,
    /// Our location qualifier.
    #[serde(default)]
    pub sender_location_id: Option<String>,
    /// Counterparty CompID.
    pub target_comp_id: String,
    /// Counterparty SubID.
    #[serde(default)]
    pub target_sub_id: Option<String>,
    /// Counterparty location qualifier.
    #[serde(default)]
    pub target_location_id: Option<String>,
    /// Distinguishes several sessions between the same two parties.
    #[serde(default)]
    pub qualifier: Option<String>,
}

impl SessionId {
    /// Creates a session identity with only the mandatory parts set.
    #[must_use]
    pub fn new(
        begin_string: impl Into<String>,
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
    ) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender_comp_id: sender_comp_id.into(),
            sender_sub_id: None,
            sender_location_id: None,
            target_comp_id: target_comp_id.into(),
            target_sub_id: None,
            target_location_id: None,
            qualifier: None,
        }
    }

    /// Sets the sender SubID.
    #[must_use]
    pub fn with_sender_sub_id(mut self, id: impl Into<String>) -> Self {
        self.sender_sub_id = Some(id.into());
        self
    }

    /// Sets the sender location.
    #[must_use]
    pub fn with_sender_location_id(mut self, id: impl Into<String>) -> Self {
        self.sender_location_id = Some(id.into());
        self
    }

    /// Sets the target SubID.
    #[must_use]
    pub fn with_target_sub_id(mut self, id: impl Into<String>) -> Self {
        self.target_sub_id = Some(id.into());
        self
    }

    /// Sets the target location.
    #[must_use]
    pub fn with_target_location_id(mut self, id: impl Into<String>) -> Self {
        self.target_location_id = Some(id.into());
        self
    }

    /// Sets the session qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Returns true for FIXT transport sessions (FIX 5.0 and later).
    #[must_use]
    pub fn is_fixt(&self) -> bool {
        self.begin_string.starts_with("FIXT")
    }

    /// Returns the eight key columns used by durable backends.
    ///
    /// Order: begin string, qualifier, sender comp/sub/location, target
    /// comp/sub/location. Absent parts are empty strings.
    #[must_use]
    pub fn columns(&self) -> [&str; 8] {
        fn opt(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("")
        }
        [
            &self.begin_string,
            opt(&self.qualifier),
            &self.sender_comp_id,
            opt(&self.sender_sub_id),
            opt(&self.sender_location_id),
            &self.target_comp_id,
            opt(&self.target_sub_id),
            opt(&self.target_location_id),
        ]
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, ":{qualifier}")?;
        }
        Ok(())
    }
}
