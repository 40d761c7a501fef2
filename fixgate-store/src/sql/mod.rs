/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! SQL-backed message store.
//!
//! - [`SqlPool`]: shared connection pool for one data source
//! - [`Statements`]: parameterized statements for the configured tables
//! - [`SqlStore`]: per-session store with an in-memory mirror of its counters
//! - [`SqlStoreFactory`]: creates stores from [`StoreSettings`](crate::StoreSettings)

mod factory;
mod pool;
mod statements;
mod store;

pub use factory::SqlStoreFactory;
pub use pool::SqlPool;
pub use statements::{Statements, rewrite_placeholders};
pub use store::SqlStore;
