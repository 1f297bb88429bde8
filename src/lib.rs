//! # Pouch
//!
//! Backend-neutral entity persistence. Entities describe themselves through
//! small traits ([`Tableable`], [`Identifiable`], [`Gettable`],
//! [`Insertable`], [`Mergeable`]); a [`Pouch`] stores and retrieves them
//! against one medium:
//!
//! - [`SqlPouch`] over any SQL [`Executor`] (MySQL or Postgres dialect)
//! - [`MapPouch`] in process memory
//! - [`KvPouch`] over a key-value cache ([`RedisKvClient`])
//! - [`HashPouch`] over a hash store ([`RedisHashClient`])
//! - [`DynamicPouch`] over caller-supplied closures
//!
//! Queries narrow reads with [`Criteria`]:
//!
//! ```
//! use pouch::{MapPouch, Pouch, Query, Record};
//!
//! let pouch = MapPouch::new();
//! pouch.insert("food:0", Record::new("food:%d").with("Name", "kale"));
//! let query = pouch.filter("Name = ?", ["kale"]).limit(10);
//! assert_eq!(query.criteria().limit_value(), 10);
//! ```

pub mod backend;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod query;
pub mod redis_client;
pub mod storage;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod value;

pub use backend::{DynamicPouch, HashClient, HashPouch, KvClient, KvPouch, MapPouch, SqlPouch};
pub use config::PouchConfig;
pub use entity::{
    CacheKeyed, Createable, Deleteable, FieldSetter, Findable, Gettable, HashDecorated, Identifiable, Insertable,
    Mergeable, Record, Tableable, Updateable,
};
pub use error::{PouchError, Result};
pub use executor::{ExecResult, Executor, Row};
pub use query::{Criteria, SqlDialect};
pub use redis_client::{RedisHashClient, RedisKvClient};
pub use storage::{Pouch, Query, Storage};
pub use value::{Field, Value};

#[cfg(feature = "postgres")]
pub use executor::MayPostgresExecutor;
