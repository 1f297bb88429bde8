//! Redis-backed clients for the key-value and hash pouches.
//!
//! Both wrap a `redis::Client` and open a blocking connection per call, so
//! they can be shared freely; connection reuse is left to the server side
//! or to a pooling proxy.

use crate::backend::hash::HashClient;
use crate::backend::kv::KvClient;
use crate::error::Result;
use redis::{Client, Connection};

fn connection(client: &Client) -> Result<Connection> {
    Ok(client.get_connection()?)
}

/// [`KvClient`] over plain redis strings: `SET NX` for add, `SET XX` for
/// replace.
#[derive(Clone)]
pub struct RedisKvClient {
    client: Client,
    /// Expiry applied to every write, in seconds; 0 keeps keys forever
    ttl_seconds: u64,
}

impl RedisKvClient {
    pub fn new(client: Client) -> Self {
        Self { client, ttl_seconds: 0 }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    fn set(&self, key: &str, value: &[u8], condition: &str) -> Result<bool> {
        let mut con = connection(&self.client)?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg(condition);
        if self.ttl_seconds > 0 {
            cmd.arg("EX").arg(self.ttl_seconds);
        }
        // nil when the condition refused the write
        let reply: Option<String> = cmd.query(&mut con)?;
        Ok(reply.is_some())
    }
}

impl KvClient for RedisKvClient {
    fn add(&self, key: &str, value: &[u8]) -> Result<bool> {
        self.set(key, value, "NX")
    }

    fn replace(&self, key: &str, value: &[u8]) -> Result<bool> {
        self.set(key, value, "XX")
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut con = connection(&self.client)?;
        Ok(redis::cmd("GET").arg(key).query(&mut con)?)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut con = connection(&self.client)?;
        let removed: u64 = redis::cmd("DEL").arg(key).query(&mut con)?;
        Ok(removed > 0)
    }
}

/// [`HashClient`] over redis hashes.
#[derive(Clone)]
pub struct RedisHashClient {
    client: Client,
}

impl RedisHashClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl HashClient for RedisHashClient {
    fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        let mut con = connection(&self.client)?;
        Ok(redis::cmd("HMGET").arg(key).arg(fields).query(&mut con)?)
    }

    fn hmset(&self, key: &str, pairs: &[(&str, &str)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut con = connection(&self.client)?;
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in pairs {
            cmd.arg(*field).arg(*value);
        }
        let _added: u64 = cmd.query(&mut con)?;
        Ok(())
    }

    fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        let mut con = connection(&self.client)?;
        Ok(redis::cmd("HEXISTS").arg(key).arg(field).query(&mut con)?)
    }

    fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut con = connection(&self.client)?;
        Ok(redis::cmd("HDEL").arg(key).arg(fields).query(&mut con)?)
    }
}
