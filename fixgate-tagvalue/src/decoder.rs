/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message decoder.
//!
//! The decoder walks tag=value pairs with `memchr`, validates BodyLength and
//! CheckSum, and sorts fields into the header, body and trailer sections of a
//! [`Message`].

use crate::SOH;
use crate::checksum::{calculate_checksum, parse_checksum};
use bytes::Bytes;
use fixgate_core::error::DecodeError;
use fixgate_core::{Message, tags};
use memchr::{memchr, memmem};

/// Equals sign delimiter between tag and value.
pub const EQUALS: u8 = b'=';

/// Length of the trailing `10=nnn<SOH>` field.
const CHECKSUM_FIELD_LEN: usize = 7;

/// FIX message decoder over one input buffer.
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a [u8],
    offset: usize,
    validate_checksum: bool,
    max_message_size: Option<usize>,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder for the given input buffer.
    #[inline]
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            validate_checksum: true,
            max_message_size: None,
        }
    }

    /// Sets whether to validate checksums during decoding.
    #[inline]
    #[must_use]
    pub const fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }

    /// Rejects inputs larger than `max` bytes.
    #[inline]
    #[must_use]
    pub const fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = Some(max);
        self
    }

    /// Decodes one complete FIX message from the start of the buffer.
    ///
    /// # Errors
    /// Returns `DecodeError` if the message is malformed, incomplete, or
    /// fails BodyLength or CheckSum validation.
    pub fn decode(&mut self) -> Result<Message, DecodeError> {
        if let Some(max_size) = self.max_message_size
            && self.input.len() > max_size
        {
            return Err(DecodeError::MessageTooLarge {
                size: self.input.len(),
                max_size,
            });
        }

        let start = self.offset;
        let mut message = Message::default();

        let (tag, begin_string) = self.next_field()?.ok_or(DecodeError::Incomplete)?;
        if tag != tags::BEGIN_STRING || !begin_string.starts_with(b"FIX") {
            return Err(DecodeError::InvalidBeginString);
        }
        message
            .header
            .set_bytes(tags::BEGIN_STRING, Bytes::copy_from_slice(begin_string));

        let (tag, body_length) = self.next_field()?.ok_or(DecodeError::MissingBodyLength)?;
        if tag != tags::BODY_LENGTH {
            return Err(DecodeError::MissingBodyLength);
        }
        let declared: usize = std::str::from_utf8(body_length)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(DecodeError::InvalidBodyLength)?;
        message
            .header
            .set_bytes(tags::BODY_LENGTH, Bytes::copy_from_slice(body_length));
        let body_start = self.offset;

        let (tag, msg_type) = self.next_field()?.ok_or(DecodeError::MissingMsgType)?;
        if tag != tags::MSG_TYPE || msg_type.is_empty() {
            return Err(DecodeError::MissingMsgType);
        }
        message
            .header
            .set_bytes(tags::MSG_TYPE, Bytes::copy_from_slice(msg_type));

        loop {
            let field_start = self.offset;
            let (tag, value) = self.next_field()?.ok_or(DecodeError::Incomplete)?;
            if tag == tags::CHECK_SUM {
                let actual = field_start - body_start;
                if actual != declared {
                    return Err(DecodeError::BodyLengthMismatch { declared, actual });
                }
                if self.validate_checksum {
                    let declared = parse_checksum(value).ok_or_else(|| {
                        DecodeError::InvalidFieldValue {
                            tag: tags::CHECK_SUM,
                            reason: "invalid checksum format".to_string(),
                        }
                    })?;
                    let calculated = calculate_checksum(&self.input[start..field_start]);
                    if calculated != declared {
                        return Err(DecodeError::ChecksumMismatch {
                            calculated,
                            declared,
                        });
                    }
                }
                message
                    .trailer
                    .set_bytes(tags::CHECK_SUM, Bytes::copy_from_slice(value));
                return Ok(message);
            }

            let value = Bytes::copy_from_slice(value);
            if tags::is_header(tag) {
                message.header.set_bytes(tag, value);
            } else if tags::is_trailer(tag) {
                message.trailer.set_bytes(tag, value);
            } else {
                message.body.set_bytes(tag, value);
            }
        }
    }

    /// Parses the next `tag=value` pair.
    ///
    /// # Returns
    /// `Ok(None)` when the buffer is exhausted or ends mid-field.
    ///
    /// # Errors
    /// Returns `InvalidTag` if the tag is not a positive integer.
    #[inline]
    pub fn next_field(&mut self) -> Result<Option<(u32, &'a [u8])>, DecodeError> {
        let remaining = &self.input[self.offset.min(self.input.len())..];
        let Some(eq_pos) = memchr(EQUALS, remaining) else {
            return Ok(None);
        };
        let tag_bytes = &remaining[..eq_pos];
        let tag = parse_tag(tag_bytes).ok_or_else(|| {
            DecodeError::InvalidTag(String::from_utf8_lossy(tag_bytes).into_owned())
        })?;

        let value_start = eq_pos + 1;
        let Some(soh_pos) = memchr(SOH, &remaining[value_start..]) else {
            return Ok(None);
        };
        let value = &remaining[value_start..value_start + soh_pos];
        self.offset += value_start + soh_pos + 1;
        Ok(Some((tag, value)))
    }

    /// Returns the current offset in the buffer.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

/// Decodes one message with checksum validation enabled.
///
/// # Errors
/// See [`Decoder::decode`].
pub fn decode(input: &[u8]) -> Result<Message, DecodeError> {
    Decoder::new(input).decode()
}

/// Finds the length of the first complete frame in a stream buffer.
///
/// Only the BeginString and BodyLength prefix is inspected; the frame is not
/// otherwise validated. A frame whose declared size exceeds `max_frame_size`
/// is rejected before its bytes arrive, so a reader never buffers more than
/// that.
///
/// # Returns
/// `Ok(Some(len))` when `buf[..len]` holds one whole message, `Ok(None)` when
/// more bytes are needed.
///
/// # Errors
/// Returns an error if the buffer does not start with a valid prefix, the
/// BodyLength is not a number or overflows, or the frame is too large.
pub fn frame_length(buf: &[u8], max_frame_size: usize) -> Result<Option<usize>, DecodeError> {
    if buf.len() < 2 {
        return Ok(None);
    }
    if !buf.starts_with(b"8=") {
        return Err(DecodeError::InvalidBeginString);
    }
    let Some(first_soh) = memchr(SOH, buf) else {
        return too_large(buf.len(), max_frame_size).map(|()| None);
    };

    let rest = &buf[first_soh + 1..];
    if rest.len() < 2 {
        return Ok(None);
    }
    if !rest.starts_with(b"9=") {
        return Err(DecodeError::MissingBodyLength);
    }
    let Some(len_end) = memchr(SOH, rest) else {
        return too_large(buf.len(), max_frame_size).map(|()| None);
    };
    let body_length: usize = std::str::from_utf8(&rest[2..len_end])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(DecodeError::InvalidBodyLength)?;

    let body_start = first_soh + 1 + len_end + 1;
    let body_end = body_start
        .checked_add(body_length)
        .ok_or(DecodeError::InvalidBodyLength)?;
    let total = body_end
        .checked_add(CHECKSUM_FIELD_LEN)
        .ok_or(DecodeError::InvalidBodyLength)?;
    too_large(total, max_frame_size)?;
    if buf.len() < total {
        return Ok(None);
    }
    if memmem::find(&buf[body_end..total], b"10=") != Some(0) {
        return Err(DecodeError::InvalidBodyLength);
    }
    Ok(Some(total))
}

fn too_large(size: usize, max_size: usize) -> Result<(), DecodeError> {
    if size > max_size {
        return Err(DecodeError::MessageTooLarge { size, max_size });
    }
    Ok(())
}

/// Parses a tag number from ASCII digits.
#[inline]
fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    bytes.iter().try_fold(0u32, |acc, &b| {
        if b.is_ascii_digit() {
            acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
        } else {
            None
        }
    })
}
