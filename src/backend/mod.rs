//! Storage backends.
//!
//! | pouch            | medium                         | bulk policy  |
//! |------------------|--------------------------------|--------------|
//! | [`SqlPouch`]     | relational database (Executor) | fail-fast    |
//! | [`MapPouch`]     | in-process ordered map         | best-effort  |
//! | [`KvPouch`]      | key-value cache (KvClient)     | fail-fast    |
//! | [`HashPouch`]    | hash store (HashClient)        | unsupported  |
//! | [`DynamicPouch`] | caller-supplied closures       | caller's     |

pub mod bulk;
pub mod key;

pub mod dynamic;
pub mod hash;
pub mod kv;
pub mod map;
pub mod sql;

pub use dynamic::{DynamicPouch, DynamicPouchBuilder, DynamicQuery};
pub use hash::{HashClient, HashPouch, HashQuery};
pub use kv::{KvClient, KvPouch, KvQuery};
pub use map::{MapPouch, MapQuery};
pub use sql::{SqlPouch, SqlQuery, Statement};
