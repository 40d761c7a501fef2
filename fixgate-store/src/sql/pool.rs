/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Connection pool for one SQLite data source.
//!
//! The pool is shared by every store on the same data source. Blocking
//! SQLite calls run on the tokio blocking pool, so callers await the commit
//! without stalling the runtime.

use crate::sql::statements::Statements;
use fixgate_core::error::StoreError;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Idle connections kept for reuse.
const MAX_IDLE: usize = 4;

/// Connection-level settings applied on open.
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;";

#[derive(Debug)]
struct PooledConnection {
    conn: Connection,
    opened_at: Instant,
}

/// Pool of SQLite connections to one database.
#[derive(Debug)]
pub struct SqlPool {
    data_source: String,
    max_lifetime: Option<Duration>,
    idle: Mutex<Vec<PooledConnection>>,
}

impl SqlPool {
    /// Creates an empty pool. Connections are opened on demand.
    #[must_use]
    pub fn new(data_source: impl Into<String>, max_lifetime: Option<Duration>) -> Self {
        Self {
            data_source: data_source.into(),
            max_lifetime,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Returns the data source locator.
    #[must_use]
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /// Returns the number of idle connections.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Creates the tables used by `statements` if they do not exist.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the DDL fails.
    pub async fn create_schema(self: &Arc<Self>, statements: &Arc<Statements>) -> Result<(), StoreError> {
        let statements = Arc::clone(statements);
        self.run("create_schema", move |conn| {
            conn.execute_batch(&statements.create_tables)
        })
        .await
    }

    /// Runs `f` with a pooled connection on the blocking thread pool.
    ///
    /// # Errors
    /// Any SQLite error, or a failure to open a connection, is returned as
    /// `StoreError::Persistence` tagged with `operation`.
    pub async fn run<T, F>(self: &Arc<Self>, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let pool = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut pooled = pool
                .checkout()
                .map_err(|e| StoreError::persistence(operation, e))?;
            let result = f(&mut pooled.conn).map_err(|e| StoreError::persistence(operation, e));
            pool.checkin(pooled);
            result
        })
        .await
        .map_err(|e| StoreError::persistence(operation, e))?
    }

    fn checkout(&self) -> rusqlite::Result<PooledConnection> {
        loop {
            let candidate = self.idle.lock().pop();
            match candidate {
                Some(pooled) if self.is_expired(&pooled) => {
                    debug!(data_source = %self.data_source, "closing expired connection");
                }
                Some(pooled) => return Ok(pooled),
                None => break,
            }
        }
        let conn = Connection::open(&self.data_source)?;
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        debug!(data_source = %self.data_source, "opened connection");
        Ok(PooledConnection {
            conn,
            opened_at: Instant::now(),
        })
    }

    fn checkin(&self, pooled: PooledConnection) {
        if self.is_expired(&pooled) {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE {
            idle.push(pooled);
        }
    }

    fn is_expired(&self, pooled: &PooledConnection) -> bool {
        self.max_lifetime
            .is_some_and(|max| pooled.opened_at.elapsed() >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_reuses_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let pool = Arc::new(SqlPool::new(path.to_string_lossy(), None));

        let mode: String = pool
            .run("journal_mode", |conn| {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode, "wal");
        assert_eq!(pool.idle_count(), 1);

        pool.run("noop", |_| Ok(())).await.unwrap();
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_pool_drops_expired_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let pool = Arc::new(SqlPool::new(path.to_string_lossy(), Some(Duration::ZERO)));

        pool.run("noop", |_| Ok(())).await.unwrap();
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_pool_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let pool = Arc::new(SqlPool::new(path.to_string_lossy(), None));

        let err = pool
            .run("bad_sql", |conn| conn.execute_batch("NOT SQL"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Persistence {
                operation: "bad_sql",
                ..
            }
        ));
    }
}
