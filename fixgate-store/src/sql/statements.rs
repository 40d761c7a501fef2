/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! SQL statement text.
//!
//! Statements are written with `?` placeholders and rewritten once, at
//! construction, for backends that number their parameters.

use crate::config::{PlaceholderStyle, SqlStoreConfig};

const ID_COLUMNS: &str = "beginstring, session_qualifier, sendercompid, sendersubid, senderlocid, targetcompid, targetsubid, targetlocid";
const ID_PLACEHOLDERS: &str = "?,?,?,?,?,?,?,?";
const ID_WHERE: &str = "beginstring=? AND session_qualifier=? AND sendercompid=? AND sendersubid=? AND senderlocid=? AND targetcompid=? AND targetsubid=? AND targetlocid=?";

/// Rewrites `?` placeholders into the given style.
#[must_use]
pub fn rewrite_placeholders(raw: &str, style: PlaceholderStyle) -> String {
    match style {
        PlaceholderStyle::Question => raw.to_string(),
        PlaceholderStyle::Dollar => {
            let mut out = String::with_capacity(raw.len() + 16);
            let mut index = 0u32;
            for c in raw.chars() {
                if c == '?' {
                    index += 1;
                    out.push('$');
                    out.push_str(itoa::Buffer::new().format(index));
                } else {
                    out.push(c);
                }
            }
            out
        }
    }
}

/// Statements for one pair of messages/sessions tables.
///
/// Every statement that filters by session binds the eight identity columns
/// in [`fixgate_core::SessionId::columns`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statements {
    /// Params: seq, message, id.
    pub insert_message: String,
    /// Params: message, id, seq.
    pub update_message: String,
    /// Params: id, begin, end. Columns: msgseqnum, message.
    pub get_messages: String,
    /// Params: id.
    pub delete_messages: String,
    /// Params: creation_time, incoming, outgoing, id.
    pub insert_session: String,
    /// Params: id. Columns: creation_time, incoming_seqnum, outgoing_seqnum.
    pub get_seq_nums: String,
    /// Params: creation_time, incoming, outgoing, id.
    pub update_session: String,
    /// Params: outgoing, id.
    pub update_sender_seq: String,
    /// Params: incoming, id.
    pub update_target_seq: String,
    /// Schema bootstrap, no params.
    pub create_tables: String,
}

impl Statements {
    /// Builds the statements for the given tables and placeholder style.
    #[must_use]
    pub fn new(messages: &str, sessions: &str, style: PlaceholderStyle) -> Self {
        let sql = |raw: String| rewrite_placeholders(&raw, style);
        Self {
            insert_message: sql(format!(
                "INSERT INTO {messages} (msgseqnum, message, {ID_COLUMNS}) VALUES (?, ?, {ID_PLACEHOLDERS})"
            )),
            update_message: sql(format!(
                "UPDATE {messages} SET message=? WHERE {ID_WHERE} AND msgseqnum=?"
            )),
            get_messages: sql(format!(
                "SELECT msgseqnum, message FROM {messages} WHERE {ID_WHERE} AND msgseqnum>=? AND msgseqnum<=? ORDER BY msgseqnum"
            )),
            delete_messages: sql(format!("DELETE FROM {messages} WHERE {ID_WHERE}")),
            insert_session: sql(format!(
                "INSERT INTO {sessions} (creation_time, incoming_seqnum, outgoing_seqnum, {ID_COLUMNS}) VALUES (?, ?, ?, {ID_PLACEHOLDERS})"
            )),
            get_seq_nums: sql(format!(
                "SELECT creation_time, incoming_seqnum, outgoing_seqnum FROM {sessions} WHERE {ID_WHERE}"
            )),
            update_session: sql(format!(
                "UPDATE {sessions} SET creation_time=?, incoming_seqnum=?, outgoing_seqnum=? WHERE {ID_WHERE}"
            )),
            update_sender_seq: sql(format!(
                "UPDATE {sessions} SET outgoing_seqnum=? WHERE {ID_WHERE}"
            )),
            update_target_seq: sql(format!(
                "UPDATE {sessions} SET incoming_seqnum=? WHERE {ID_WHERE}"
            )),
            create_tables: format!(
                "CREATE TABLE IF NOT EXISTS {sessions} (
                    beginstring TEXT NOT NULL,
                    session_qualifier TEXT NOT NULL,
                    sendercompid TEXT NOT NULL,
                    sendersubid TEXT NOT NULL,
                    senderlocid TEXT NOT NULL,
                    targetcompid TEXT NOT NULL,
                    targetsubid TEXT NOT NULL,
                    targetlocid TEXT NOT NULL,
                    creation_time INTEGER NOT NULL,
                    incoming_seqnum INTEGER NOT NULL,
                    outgoing_seqnum INTEGER NOT NULL,
                    PRIMARY KEY ({ID_COLUMNS})
                );
                CREATE TABLE IF NOT EXISTS {messages} (
                    beginstring TEXT NOT NULL,
                    session_qualifier TEXT NOT NULL,
                    sendercompid TEXT NOT NULL,
                    sendersubid TEXT NOT NULL,
                    senderlocid TEXT NOT NULL,
                    targetcompid TEXT NOT NULL,
                    targetsubid TEXT NOT NULL,
                    targetlocid TEXT NOT NULL,
                    msgseqnum INTEGER NOT NULL,
                    message BLOB NOT NULL,
                    PRIMARY KEY ({ID_COLUMNS}, msgseqnum)
                );"
            ),
        }
    }

    /// Builds the statements described by `config`.
    #[must_use]
    pub fn from_config(config: &SqlStoreConfig) -> Self {
        Self::new(
            &config.messages_table,
            &config.sessions_table,
            config.placeholder_style(),
        )
    }
}
