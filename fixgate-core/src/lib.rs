/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixgate Core
//!
//! Core types and error definitions shared by every fixgate crate.
//!
//! This crate provides:
//! - **Error types**: The session-layer error taxonomy built on `thiserror`
//! - **Session identity**: [`SessionId`], the composite key of one counterparty conversation
//! - **Messages**: [`Message`], a generic header/body/trailer field-value structure
//! - **Timestamps**: [`Timestamp`] in FIX UTCTimestamp form
//! - **Tags**: Named constants for the tags the session layer reads and writes

pub mod error;
pub mod field;
pub mod identity;
pub mod message;
pub mod tags;
pub mod types;

pub use error::{DecodeError, EncodeError, FixError, Result, SessionError, StoreError};
pub use field::FieldMap;
pub use identity::SessionId;
pub use message::{Message, MsgType};
pub use types::Timestamp;
