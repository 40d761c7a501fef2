/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Ordered tag/value storage for one message section.
//!
//! [`FieldMap`] keeps fields in insertion order so that an encoded message
//! reproduces the order fields were set in. Values are raw bytes; typed
//! accessors parse on read.

use crate::error::DecodeError;
use bytes::Bytes;
use smallvec::SmallVec;

/// Ordered collection of `(tag, value)` pairs.
///
/// Setting a tag that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: SmallVec<[(u32, Bytes); 16]>,
}

impl FieldMap {
    /// Creates an empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field from raw bytes.
    pub fn set_bytes(&mut self, tag: u32, value: impl Into<Bytes>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((tag, value)),
        }
    }

    /// Sets a string field.
    pub fn set_str(&mut self, tag: u32, value: &str) {
        self.set_bytes(tag, Bytes::copy_from_slice(value.as_bytes()));
    }

    /// Sets an unsigned integer field.
    pub fn set_uint(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        self.set_str(tag, buf.format(value));
    }

    /// Sets a signed integer field.
    pub fn set_int(&mut self, tag: u32, value: i64) {
        let mut buf = itoa::Buffer::new();
        self.set_str(tag, buf.format(value));
    }

    /// Sets a boolean field (`Y`/`N`).
    pub fn set_bool(&mut self, tag: u32, value: bool) {
        self.set_bytes(tag, Bytes::from_static(if value { b"Y" } else { b"N" }));
    }

    /// Removes a field, returning its previous value.
    pub fn remove(&mut self, tag: u32) -> Option<Bytes> {
        let pos = self.fields.iter().position(|(t, _)| *t == tag)?;
        Some(self.fields.remove(pos).1)
    }

    /// Returns true if the tag is present.
    #[must_use]
    pub fn has(&self, tag: u32) -> bool {
        self.fields.iter().any(|(t, _)| *t == tag)
    }

    /// Returns the raw bytes of a field.
    #[must_use]
    pub fn get_bytes(&self, tag: u32) -> Option<&Bytes> {
        self.fields.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)
    }

    /// Returns a field as a string slice.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` if not UTF-8.
    pub fn get_str(&self, tag: u32) -> Result<&str, DecodeError> {
        let bytes = self
            .get_bytes(tag)
            .ok_or(DecodeError::MissingRequiredField { tag })?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidFieldValue {
            tag,
            reason: "not valid utf-8".to_string(),
        })
    }

    /// Returns a field parsed as an unsigned integer.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` if not an integer.
    pub fn get_uint(&self, tag: u32) -> Result<u64, DecodeError> {
        let s = self.get_str(tag)?;
        s.parse().map_err(|_| DecodeError::InvalidFieldValue {
            tag,
            reason: format!("failed to parse '{s}' as an unsigned integer"),
        })
    }

    /// Returns a field parsed as a boolean (`Y`/`N`).
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` otherwise.
    pub fn get_bool(&self, tag: u32) -> Result<bool, DecodeError> {
        match self.get_bytes(tag).map(|b| b.as_ref()) {
            Some(b"Y") => Ok(true),
            Some(b"N") => Ok(false),
            Some(_) => Err(DecodeError::InvalidFieldValue {
                tag,
                reason: "expected 'Y' or 'N'".to_string(),
            }),
            None => Err(DecodeError::MissingRequiredField { tag }),
        }
    }

    /// Returns a boolean flag, treating an absent or malformed field as `false`.
    #[must_use]
    pub fn flag(&self, tag: u32) -> bool {
        self.get_bool(tag).unwrap_or(false)
    }

    /// Iterates over fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Bytes)> {
        self.fields.iter().map(|(t, v)| (*t, v))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
