/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Factory for SQL-backed stores.

use crate::config::{SqlStoreConfig, StoreSettings};
use crate::sql::pool::SqlPool;
use crate::sql::statements::Statements;
use crate::sql::store::SqlStore;
use crate::traits::{MessageStore, MessageStoreFactory};
use async_trait::async_trait;
use fixgate_core::SessionId;
use fixgate_core::error::StoreError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Creates [`SqlStore`]s, sharing one connection pool per data source.
#[derive(Debug)]
pub struct SqlStoreFactory {
    settings: StoreSettings,
    pools: Mutex<HashMap<String, Arc<SqlPool>>>,
}

impl SqlStoreFactory {
    /// Creates a factory from store settings.
    #[must_use]
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            settings,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the settings this factory was built with.
    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Returns the number of distinct pools opened so far.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }

    fn pool_for(&self, config: &SqlStoreConfig) -> Arc<SqlPool> {
        let mut pools = self.pools.lock();
        Arc::clone(
            pools
                .entry(config.data_source.clone())
                .or_insert_with(|| {
                    Arc::new(SqlPool::new(
                        config.data_source.clone(),
                        config.conn_max_lifetime,
                    ))
                }),
        )
    }
}

#[async_trait]
impl MessageStoreFactory for SqlStoreFactory {
    async fn create(&self, session_id: &SessionId) -> Result<Box<dyn MessageStore>, StoreError> {
        let config = self.settings.resolve(session_id)?;
        config.validate()?;

        let pool = self.pool_for(config);
        let statements = Arc::new(Statements::from_config(config));
        if config.create_schema {
            pool.create_schema(&statements).await?;
        }
        let store = SqlStore::open(session_id.clone(), pool, statements).await?;
        Ok(Box::new(store))
    }
}
