/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message encoder.
//!
//! [`Encoder`] builds a message field by field; [`encode`] serializes a
//! complete [`Message`] in standard order (BeginString, BodyLength, MsgType,
//! remaining header, body, trailer, CheckSum).

use crate::SOH;
use crate::checksum::{calculate_checksum, format_checksum};
use bytes::{BufMut, BytesMut};
use fixgate_core::error::EncodeError;
use fixgate_core::{Message, tags};

/// FIX message encoder.
///
/// Fields are appended in tag=value form. BeginString, BodyLength and
/// CheckSum are written by [`Encoder::finish`].
#[derive(Debug)]
pub struct Encoder {
    /// Bytes between BodyLength and CheckSum.
    body: BytesMut,
    /// The BeginString value (e.g., "FIX.4.4").
    begin_string: String,
}

impl Encoder {
    /// Creates a new encoder with the specified BeginString.
    #[must_use]
    pub fn new(begin_string: impl Into<String>) -> Self {
        Self {
            body: BytesMut::with_capacity(256),
            begin_string: begin_string.into(),
        }
    }

    /// Appends a field with a string value.
    #[inline]
    pub fn put_str(&mut self, tag: u32, value: &str) {
        self.put_raw(tag, value.as_bytes());
    }

    /// Appends a field with an unsigned integer value.
    #[inline]
    pub fn put_uint(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        self.put_raw(tag, buf.format(value).as_bytes());
    }

    /// Appends a field with raw bytes.
    #[inline]
    pub fn put_raw(&mut self, tag: u32, value: &[u8]) {
        let mut tag_buf = itoa::Buffer::new();
        self.body.put_slice(tag_buf.format(tag).as_bytes());
        self.body.put_u8(b'=');
        self.body.put_slice(value);
        self.body.put_u8(SOH);
    }

    /// Returns the current body length.
    #[inline]
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Finalizes the message, prepending BeginString and BodyLength and
    /// appending CheckSum.
    #[must_use]
    pub fn finish(self) -> BytesMut {
        let mut len_buf = itoa::Buffer::new();
        let len_str = len_buf.format(self.body.len());

        let mut message =
            BytesMut::with_capacity(self.begin_string.len() + len_str.len() + self.body.len() + 16);
        message.put_slice(b"8=");
        message.put_slice(self.begin_string.as_bytes());
        message.put_u8(SOH);
        message.put_slice(b"9=");
        message.put_slice(len_str.as_bytes());
        message.put_u8(SOH);
        message.put_slice(&self.body);

        let checksum = format_checksum(calculate_checksum(&message));
        message.put_slice(b"10=");
        message.put_slice(&checksum);
        message.put_u8(SOH);
        message
    }
}

/// Encodes a message into its wire form.
///
/// BodyLength and CheckSum are always recomputed; any values present in the
/// message are ignored.
///
/// # Errors
/// Returns `MissingRequiredField` if BeginString or MsgType is absent.
pub fn encode(message: &Message) -> Result<BytesMut, EncodeError> {
    let begin_string = message
        .header
        .get_str(tags::BEGIN_STRING)
        .map_err(|_| EncodeError::MissingRequiredField {
            tag: tags::BEGIN_STRING,
        })?;
    let msg_type = message
        .header
        .get_bytes(tags::MSG_TYPE)
        .ok_or(EncodeError::MissingRequiredField {
            tag: tags::MSG_TYPE,
        })?;

    let mut encoder = Encoder::new(begin_string);
    encoder.put_raw(tags::MSG_TYPE, msg_type);
    for (tag, value) in message.header.iter() {
        if !matches!(tag, tags::BEGIN_STRING | tags::BODY_LENGTH | tags::MSG_TYPE) {
            encoder.put_raw(tag, value);
        }
    }
    for (tag, value) in message.body.iter() {
        encoder.put_raw(tag, value);
    }
    for (tag, value) in message.trailer.iter() {
        if tag != tags::CHECK_SUM {
            encoder.put_raw(tag, value);
        }
    }
    Ok(encoder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixgate_core::MsgType;

    #[test]
    fn test_encoder_finish() {
        let mut encoder = Encoder::new("FIX.4.4");
        encoder.put_str(35, "0");
        let message = encoder.finish();
        assert_eq!(&message[..], b"8=FIX.4.4\x019=5\x0135=0\x0110=163\x01");
    }

    #[test]
    fn test_encode_orders_header_first() {
        let mut msg = Message::new(MsgType::Heartbeat);
        msg.body.set_str(tags::TEST_REQ_ID, "T1");
        msg.header.set_uint(tags::MSG_SEQ_NUM, 2);
        msg.header.set_str(tags::BEGIN_STRING, "FIX.4.2");
        msg.trailer.set_str(tags::CHECK_SUM, "000");

        let bytes = encode(&msg).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("8=FIX.4.2\x019="));
        let msg_type = text.find("35=0\x01").unwrap();
        let seq = text.find("34=2\x01").unwrap();
        let req = text.find("112=T1\x01").unwrap();
        assert!(msg_type < seq && seq < req);
        assert_eq!(text.matches("10=").count(), 1);
    }

    #[test]
    fn test_encode_requires_begin_string() {
        let msg = Message::new(MsgType::Logon);
        assert_eq!(
            encode(&msg),
            Err(EncodeError::MissingRequiredField {
                tag: tags::BEGIN_STRING
            })
        );
    }
}
