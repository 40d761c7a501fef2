/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! SQL-backed message store.
//!
//! Counters are mirrored in memory so reads never touch the database. Every
//! mutation commits to SQLite first and updates the mirror only after the
//! commit succeeded, so a failed write leaves the visible state unchanged.

use crate::config::SqlStoreConfig;
use crate::sql::pool::SqlPool;
use crate::sql::statements::Statements;
use crate::state::SequenceState;
use crate::traits::{MessageStore, ensure_complete};
use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use fixgate_core::{SessionId, Timestamp};
use parking_lot::RwLock;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use std::sync::Arc;
use tracing::{debug, info};

/// Message store persisting to SQLite.
#[derive(Debug)]
pub struct SqlStore {
    session_id: SessionId,
    pool: Arc<SqlPool>,
    statements: Arc<Statements>,
    mirror: RwLock<SequenceState>,
}

impl SqlStore {
    /// Opens the store for `session_id`, loading its record or creating a
    /// fresh one when the session has never been seen.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the record cannot be read or created.
    pub async fn open(
        session_id: SessionId,
        pool: Arc<SqlPool>,
        statements: Arc<Statements>,
    ) -> Result<Self, StoreError> {
        let store = Self {
            session_id,
            pool,
            statements,
            mirror: RwLock::new(SequenceState::fresh()),
        };
        store.refresh().await?;
        Ok(store)
    }

    /// Opens a store with its own pool, creating the schema if configured.
    ///
    /// # Errors
    /// Returns `StoreError::Configuration` for an invalid config, or a
    /// persistence error from the backend.
    pub async fn connect(session_id: SessionId, config: &SqlStoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let pool = Arc::new(SqlPool::new(
            config.data_source.clone(),
            config.conn_max_lifetime,
        ));
        let statements = Arc::new(Statements::from_config(config));
        if config.create_schema {
            pool.create_schema(&statements).await?;
        }
        Self::open(session_id, pool, statements).await
    }

    /// Returns the session this store belongs to.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns a snapshot of the mirrored counters.
    #[must_use]
    pub fn state(&self) -> SequenceState {
        *self.mirror.read()
    }

    fn id_params(&self) -> Vec<Value> {
        self.session_id
            .columns()
            .iter()
            .map(|c| Value::Text((*c).to_string()))
            .collect()
    }

    /// Builds `leading ++ id` parameters.
    fn with_id(&self, leading: &[Value]) -> Vec<Value> {
        let mut params = leading.to_vec();
        params.extend(self.id_params());
        params
    }
}

/// Converts a sequence number to an SQL integer.
fn int(operation: &'static str, value: u64) -> Result<Value, StoreError> {
    i64::try_from(value).map(Value::Integer).map_err(|_| {
        StoreError::persistence(
            operation,
            format!("sequence number {value} exceeds the backend integer range"),
        )
    })
}

fn seq_from(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Runs an update of the session record, which must touch exactly one row.
///
/// A missing record fails the statement so an enclosing transaction rolls
/// back instead of committing writes the counters do not account for.
fn update_session_row(conn: &Connection, sql: &str, params: Vec<Value>) -> rusqlite::Result<()> {
    match conn.execute(sql, params_from_iter(params))? {
        1 => Ok(()),
        changed => Err(rusqlite::Error::StatementChangedRows(changed)),
    }
}

/// Updates the message at `seq`, inserting it when no row exists.
fn upsert_message(
    conn: &Connection,
    statements: &Statements,
    id: &[Value],
    seq: Value,
    message: Vec<u8>,
) -> rusqlite::Result<()> {
    let mut update = Vec::with_capacity(id.len() + 2);
    update.push(Value::Blob(message.clone()));
    update.extend_from_slice(id);
    update.push(seq.clone());
    if conn.execute(&statements.update_message, params_from_iter(update))? > 0 {
        return Ok(());
    }

    let mut insert = Vec::with_capacity(id.len() + 2);
    insert.push(seq);
    insert.push(Value::Blob(message));
    insert.extend_from_slice(id);
    conn.execute(&statements.insert_message, params_from_iter(insert))?;
    Ok(())
}

#[async_trait]
impl MessageStore for SqlStore {
    fn next_sender_seq(&self) -> u64 {
        self.mirror.read().next_sender_seq
    }

    fn next_target_seq(&self) -> u64 {
        self.mirror.read().next_target_seq
    }

    fn creation_time(&self) -> Timestamp {
        self.mirror.read().creation_time
    }

    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        let statements = Arc::clone(&self.statements);
        let params = self.with_id(&[int("set_next_sender_seq", seq)?]);
        self.pool
            .run("set_next_sender_seq", move |conn| {
                update_session_row(conn, &statements.update_sender_seq, params)
            })
            .await?;
        self.mirror.write().next_sender_seq = seq;
        Ok(())
    }

    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        let statements = Arc::clone(&self.statements);
        let params = self.with_id(&[int("set_next_target_seq", seq)?]);
        self.pool
            .run("set_next_target_seq", move |conn| {
                update_session_row(conn, &statements.update_target_seq, params)
            })
            .await?;
        self.mirror.write().next_target_seq = seq;
        Ok(())
    }

    async fn save_message(&self, seq: u64, message: &[u8]) -> Result<(), StoreError> {
        let statements = Arc::clone(&self.statements);
        let id = self.id_params();
        let seq = int("save_message", seq)?;
        let message = message.to_vec();
        self.pool
            .run("save_message", move |conn| {
                upsert_message(conn, &statements, &id, seq, message)
            })
            .await
    }

    async fn save_message_and_incr_next_sender_seq(
        &self,
        seq: u64,
        message: &[u8],
    ) -> Result<(), StoreError> {
        const OPERATION: &str = "save_message_and_incr_next_sender_seq";
        let next = self.next_sender_seq() + 1;
        let statements = Arc::clone(&self.statements);
        let id = self.id_params();
        let seq_value = int(OPERATION, seq)?;
        let mut params = vec![int(OPERATION, next)?];
        params.extend(id.iter().cloned());
        let message = message.to_vec();
        self.pool
            .run(OPERATION, move |conn| {
                let tx = conn.transaction()?;
                upsert_message(&tx, &statements, &id, seq_value, message)?;
                update_session_row(&tx, &statements.update_sender_seq, params)?;
                tx.commit()
            })
            .await?;
        self.mirror.write().next_sender_seq = next;
        Ok(())
    }

    async fn get_messages(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError> {
        if begin > end {
            return Ok(Vec::new());
        }
        let statements = Arc::clone(&self.statements);
        let mut params = self.id_params();
        params.push(int("get_messages", begin)?);
        params.push(int("get_messages", end)?);
        let rows = self
            .pool
            .run("get_messages", move |conn| {
                let mut stmt = conn.prepare_cached(&statements.get_messages)?;
                let rows = stmt.query_map(params_from_iter(params), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;

        let found = rows
            .into_iter()
            .map(|(seq, message)| (seq_from(seq), Bytes::from(message)))
            .collect();
        ensure_complete(begin, end, found)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let fresh = SequenceState::fresh();
        let statements = Arc::clone(&self.statements);
        let id = self.id_params();
        let params = self.with_id(&[
            Value::Integer(fresh.creation_time.as_nanos()),
            int("reset", fresh.next_target_seq)?,
            int("reset", fresh.next_sender_seq)?,
        ]);
        self.pool
            .run("reset", move |conn| {
                let tx = conn.transaction()?;
                tx.execute(&statements.delete_messages, params_from_iter(id))?;
                update_session_row(&tx, &statements.update_session, params)?;
                tx.commit()
            })
            .await?;
        *self.mirror.write() = fresh;
        info!(session = %self.session_id, "store reset");
        Ok(())
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        let statements = Arc::clone(&self.statements);
        let id = self.id_params();
        let (state, created) = self
            .pool
            .run("refresh", move |conn| {
                let existing = conn
                    .query_row(
                        &statements.get_seq_nums,
                        params_from_iter(id.iter()),
                        |row| {
                            Ok(SequenceState {
                                creation_time: Timestamp::from_nanos(row.get(0)?),
                                next_target_seq: seq_from(row.get(1)?),
                                next_sender_seq: seq_from(row.get(2)?),
                            })
                        },
                    )
                    .optional()?;
                if let Some(state) = existing {
                    return Ok((state, false));
                }

                let fresh = SequenceState::fresh();
                let mut params = vec![
                    Value::Integer(fresh.creation_time.as_nanos()),
                    Value::Integer(1),
                    Value::Integer(1),
                ];
                params.extend(id);
                conn.execute(&statements.insert_session, params_from_iter(params))?;
                Ok((fresh, true))
            })
            .await?;

        if created {
            info!(session = %self.session_id, "created session record");
        } else {
            debug!(
                session = %self.session_id,
                sender = state.next_sender_seq,
                target = state.next_target_seq,
                "loaded session record"
            );
        }
        *self.mirror.write() = state;
        Ok(())
    }
}
