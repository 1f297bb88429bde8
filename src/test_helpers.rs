//! Test doubles for the pouch backends.
//!
//! - [`TestExecutor`] answers statements registered by their rendered text
//!   (placeholders replaced by the argument values).
//! - [`OrderedTestExecutor`] answers from a queue and records every
//!   statement it receives.
//! - [`MemoryCache`] and [`MemoryHash`] are in-process stand-ins for the
//!   key-value and hash-store clients.
//!
//! All of them lock internally, so a shared reference can be handed to a
//! pouch while the test keeps another to inspect state.

use crate::backend::hash::HashClient;
use crate::backend::kv::KvClient;
use crate::error::{PouchError, Result};
use crate::executor::{ExecResult, Executor, Row};
use crate::value::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicking test must not poison the double for the rest of the suite
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `sql` with each `?` replaced by the matching argument, e.g.
/// `SELECT ID FROM Food WHERE ID = 3`.
pub fn statement_id(sql: &str, params: &[Value]) -> String {
    let mut params = params.iter();
    let mut id = String::with_capacity(sql.len());
    for c in sql.chars() {
        match (c, params.len()) {
            ('?', n) if n > 0 => {
                if let Some(value) = params.next() {
                    id.push_str(&value.to_string());
                }
            }
            (c, _) => id.push(c),
        }
    }
    id
}

/// Executor answering from results registered by statement id.
#[derive(Debug, Default)]
pub struct TestExecutor {
    results: Mutex<HashMap<String, ExecResult>>,
    rows: Mutex<HashMap<String, Vec<Row>>>,
    row: Mutex<HashMap<String, Row>>,
}

impl TestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_exec(&self, id: impl Into<String>, result: ExecResult) -> &Self {
        lock(&self.results).insert(id.into(), result);
        self
    }

    pub fn register_query(&self, id: impl Into<String>, rows: Vec<Row>) -> &Self {
        lock(&self.rows).insert(id.into(), rows);
        self
    }

    pub fn register_query_row(&self, id: impl Into<String>, row: Row) -> &Self {
        lock(&self.row).insert(id.into(), row);
        self
    }
}

fn not_registered(id: &str) -> PouchError {
    PouchError::Backend(format!(
        "invalid query/args combo, not registered with TestExecutor: {id}"
    ))
}

impl Executor for TestExecutor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let id = statement_id(sql, params);
        lock(&self.results).get(&id).cloned().ok_or_else(|| not_registered(&id))
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let id = statement_id(sql, params);
        lock(&self.rows).get(&id).cloned().ok_or_else(|| not_registered(&id))
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row> {
        let id = statement_id(sql, params);
        lock(&self.row)
            .get(&id)
            .cloned()
            .ok_or_else(|| PouchError::NotFound(format!("no row registered for: {id}")))
    }
}

enum Response {
    Exec(ExecResult),
    Rows(Vec<Row>),
    Error(PouchError),
}

/// Executor answering from a FIFO of queued responses.
///
/// Each call consumes the next response whatever the statement; a response
/// of the wrong kind, or an empty queue, is a backend error.
#[derive(Default)]
pub struct OrderedTestExecutor {
    responses: Mutex<VecDeque<Response>>,
    statements: Mutex<Vec<(String, Vec<Value>)>>,
}

impl OrderedTestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_exec(&self, result: ExecResult) -> &Self {
        lock(&self.responses).push_back(Response::Exec(result));
        self
    }

    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        lock(&self.responses).push_back(Response::Rows(rows));
        self
    }

    pub fn push_row(&self, row: Row) -> &Self {
        self.push_rows(vec![row])
    }

    pub fn push_error(&self, err: PouchError) -> &Self {
        lock(&self.responses).push_back(Response::Error(err));
        self
    }

    /// Every statement received so far, with its parameters.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        lock(&self.statements).clone()
    }

    /// Responses not yet consumed.
    pub fn pending(&self) -> usize {
        lock(&self.responses).len()
    }

    fn next(&self, sql: &str, params: &[Value]) -> Result<Response> {
        lock(&self.statements).push((sql.to_string(), params.to_vec()));
        lock(&self.responses)
            .pop_front()
            .ok_or_else(|| PouchError::Backend(format!("no response queued for: {sql}")))
    }
}

impl Executor for OrderedTestExecutor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        match self.next(sql, params)? {
            Response::Exec(result) => Ok(result),
            Response::Error(err) => Err(err),
            Response::Rows(_) => Err(PouchError::Backend(format!("queued rows but got exec: {sql}"))),
        }
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        match self.next(sql, params)? {
            Response::Rows(rows) => Ok(rows),
            Response::Error(err) => Err(err),
            Response::Exec(_) => Err(PouchError::Backend(format!("queued exec but got query: {sql}"))),
        }
    }
}

/// In-memory [`KvClient`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.entries).get(key).cloned()
    }

    /// Store bytes unconditionally.
    pub fn put_raw(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        lock(&self.entries).insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl KvClient for MemoryCache {
    fn add(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut entries = lock(&self.entries);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn replace(&self, key: &str, value: &[u8]) -> Result<bool> {
        match lock(&self.entries).get_mut(key) {
            Some(slot) => {
                *slot = value.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(lock(&self.entries).remove(key).is_some())
    }
}

/// In-memory [`HashClient`].
#[derive(Debug, Default)]
pub struct MemoryHash {
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `key` with `pairs`, builder style.
    pub fn with_hash<'a>(self, key: &str, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        {
            let mut hashes = lock(&self.hashes);
            let hash = hashes.entry(key.to_string()).or_default();
            for (field, value) in pairs {
                hash.insert(field.to_string(), value.to_string());
            }
        }
        self
    }

    pub fn field(&self, key: &str, field: &str) -> Option<String> {
        lock(&self.hashes).get(key).and_then(|h| h.get(field).cloned())
    }
}

impl HashClient for MemoryHash {
    fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        let hashes = lock(&self.hashes);
        let hash = hashes.get(key);
        Ok(fields
            .iter()
            .map(|field| hash.and_then(|h| h.get(*field).cloned()))
            .collect())
    }

    fn hmset(&self, key: &str, pairs: &[(&str, &str)]) -> Result<()> {
        let mut hashes = lock(&self.hashes);
        let hash = hashes.entry(key.to_string()).or_default();
        for (field, value) in pairs {
            hash.insert((*field).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        Ok(lock(&self.hashes).get(key).is_some_and(|h| h.contains_key(field)))
    }

    fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64> {
        let mut hashes = lock(&self.hashes);
        let Some(hash) = hashes.get_mut(key) else {
            return Ok(0);
        };
        let removed = fields.iter().filter(|field| hash.remove(**field).is_some()).count();
        if hash.is_empty() {
            hashes.remove(key);
        }
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_id_substitutes_in_order() {
        let id = statement_id(
            "SELECT ID, Name FROM Food WHERE ID = ? AND Name = ?",
            &[Value::Int(3), Value::from("kale")],
        );
        assert_eq!(id, "SELECT ID, Name FROM Food WHERE ID = 3 AND Name = kale");
    }

    #[test]
    fn test_statement_id_leaves_surplus_placeholders() {
        assert_eq!(statement_id("a = ? AND b = ?", &[Value::Int(1)]), "a = 1 AND b = ?");
    }

    #[test]
    fn test_test_executor_unregistered() {
        let exec = TestExecutor::new();
        let err = exec.execute("DELETE FROM Food WHERE ID = ?", &[Value::Int(1)]).unwrap_err();
        assert!(err.to_string().contains("not registered with TestExecutor"));
        assert!(exec.query_one("SELECT 1", &[]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_test_executor_registered() {
        let exec = TestExecutor::new();
        exec.register_exec(
            "DELETE FROM Food WHERE ID = 1",
            ExecResult {
                rows_affected: 1,
                last_insert_id: None,
            },
        );
        let res = exec.execute("DELETE FROM Food WHERE ID = ?", &[Value::Int(1)]).unwrap();
        assert_eq!(res.rows_affected, 1);
    }

    #[test]
    fn test_ordered_executor_records_and_drains() {
        let exec = OrderedTestExecutor::new();
        exec.push_exec(ExecResult::default())
            .push_error(PouchError::Backend("boom".into()));
        assert!(exec.execute("A", &[]).is_ok());
        assert!(exec.execute("B", &[Value::Int(2)]).is_err());
        assert!(exec.execute("C", &[]).is_err());
        assert_eq!(exec.pending(), 0);
        let seen: Vec<String> = exec.statements().into_iter().map(|(sql, _)| sql).collect();
        assert_eq!(seen, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_ordered_executor_kind_mismatch() {
        let exec = OrderedTestExecutor::new();
        exec.push_rows(vec![]);
        assert!(exec.execute("UPDATE x SET a = ?", &[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_memory_cache_add_replace() {
        let cache = MemoryCache::new();
        assert!(!cache.replace("k", b"1").unwrap());
        assert!(cache.add("k", b"1").unwrap());
        assert!(!cache.add("k", b"2").unwrap());
        assert!(cache.replace("k", b"3").unwrap());
        assert_eq!(cache.get("k").unwrap(), Some(b"3".to_vec()));
        assert!(cache.delete("k").unwrap());
        assert!(!cache.delete("k").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_hash() {
        let hash = MemoryHash::new().with_hash("food:1", [("Name", "kale")]);
        assert_eq!(
            hash.hmget("food:1", &["Name", "Colour"]).unwrap(),
            vec![Some("kale".to_string()), None]
        );
        assert!(hash.hexists("food:1", "Name").unwrap());
        assert_eq!(hash.hdel("food:1", &["Name", "Colour"]).unwrap(), 1);
        assert!(!hash.hexists("food:1", "Name").unwrap());
    }
}
