//! Error taxonomy shared by every pouch.
//!
//! Errors fall into four groups that callers can branch on:
//! - contract errors, raised before any backend call when an entity reports
//!   inconsistent metadata (`Contract`)
//! - existence errors (`NotFound`, `AlreadyExists`)
//! - capability errors (`Unimplemented`, `NotConfigured`)
//! - backend errors, carried verbatim from the underlying client
//!   (`Postgres`, `Redis`, `Backend`, `Codec`)

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PouchError>;

/// Error type returned by every pouch operation.
#[derive(Debug)]
pub enum PouchError {
    /// The entity violated its contract (missing table, empty or
    /// mismatched column/value lists, no identifying fields, bad key formula)
    Contract(String),
    /// The addressed row or key does not exist
    NotFound(String),
    /// A create was refused because the key is already present
    AlreadyExists(String),
    /// The backend does not support this operation
    Unimplemented(&'static str),
    /// A dynamic pouch was built without a function for this operation
    NotConfigured(&'static str),
    /// Key-value blob encoding or decoding failed
    Codec(serde_json::Error),
    /// `PostgreSQL` error from `may_postgres`
    #[cfg(feature = "postgres")]
    Postgres(may_postgres::Error),
    /// Error from the redis client
    Redis(redis::RedisError),
    /// Any other backend failure, described by the backend itself
    Backend(String),
}

impl PouchError {
    /// Build a contract error from anything printable.
    pub fn contract(msg: impl Into<String>) -> Self {
        PouchError::Contract(msg.into())
    }

    /// `true` when the error means "the entity is not there", as opposed to
    /// the backend being unreachable or misbehaving.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PouchError::NotFound(_))
    }

    /// `true` when the backend does not implement the requested operation.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, PouchError::Unimplemented(_))
    }

    /// `true` for errors detected before the backend was touched.
    pub fn is_contract(&self) -> bool {
        matches!(self, PouchError::Contract(_))
    }
}

impl fmt::Display for PouchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PouchError::Contract(s) => write!(f, "invalid entity: {s}"),
            PouchError::NotFound(s) => write!(f, "not found: {s}"),
            PouchError::AlreadyExists(s) => write!(f, "already exists: {s}"),
            PouchError::Unimplemented(op) => write!(f, "pouch: {op} not implemented"),
            PouchError::NotConfigured(op) => write!(f, "no {op} function has been defined"),
            PouchError::Codec(e) => write!(f, "codec error: {e}"),
            #[cfg(feature = "postgres")]
            PouchError::Postgres(e) => write!(f, "PostgreSQL error: {e}"),
            PouchError::Redis(e) => write!(f, "redis error: {e}"),
            PouchError::Backend(s) => write!(f, "backend error: {s}"),
        }
    }
}

impl std::error::Error for PouchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PouchError::Codec(e) => Some(e),
            #[cfg(feature = "postgres")]
            PouchError::Postgres(e) => Some(e),
            PouchError::Redis(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PouchError {
    fn from(err: serde_json::Error) -> Self {
        PouchError::Codec(err)
    }
}

#[cfg(feature = "postgres")]
impl From<may_postgres::Error> for PouchError {
    fn from(err: may_postgres::Error) -> Self {
        PouchError::Postgres(err)
    }
}

impl From<redis::RedisError> for PouchError {
    fn from(err: redis::RedisError) -> Self {
        PouchError::Redis(err)
    }
}
