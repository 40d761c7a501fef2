/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixgate Tag-Value
//!
//! FIX tag=value encoding and decoding for the fixgate session layer.
//!
//! Messages are read into and written from the generic
//! [`fixgate_core::Message`] structure, using SOH (0x01) delimiters.
//!
//! ## Features
//!
//! - **Encoding**: BeginString, BodyLength and CheckSum are computed on write
//! - **Decoding**: BodyLength and CheckSum are validated on read
//! - **Framing**: [`frame_length`] finds message boundaries in a stream buffer

pub mod checksum;
pub mod decoder;
pub mod encoder;

pub use checksum::calculate_checksum;
pub use decoder::{Decoder, decode, frame_length};
pub use encoder::{Encoder, encode};

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;
