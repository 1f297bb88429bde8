//! Key-value (memcache-style) pouch.
//!
//! Each entity lives under one key: its [`CacheKeyed::cache_key`] when it
//! provides one, otherwise its table formula taken literally. The value is a
//! flat JSON document of the entity's insertable columns.
//!
//! Create writes with add-if-absent and update with replace-if-present, so
//! the backend enforces the create/update existence discipline. Bulk
//! operations stop at the first failure.
//!
//! [`CacheKeyed::cache_key`]: crate::entity::CacheKeyed::cache_key

use crate::backend::bulk::fail_fast;
use crate::entity::{assign_by_name, insertable_of, Createable, Deleteable, Findable, Insertable, Tableable, Updateable};
use crate::error::{PouchError, Result};
use crate::metrics::instrument;
use crate::query::Criteria;
use crate::storage::{Pouch, Query, Storage};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const BACKEND: &str = "kv";

/// Byte-string key-value client.
///
/// `add` and `replace` report whether the write happened; `delete` reports
/// whether a key was removed.
pub trait KvClient {
    /// Store `value` only if `key` is absent.
    fn add(&self, key: &str, value: &[u8]) -> Result<bool>;

    /// Store `value` only if `key` is present.
    fn replace(&self, key: &str, value: &[u8]) -> Result<bool>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn delete(&self, key: &str) -> Result<bool>;
}

impl<C: KvClient + ?Sized> KvClient for &C {
    fn add(&self, key: &str, value: &[u8]) -> Result<bool> {
        (**self).add(key, value)
    }

    fn replace(&self, key: &str, value: &[u8]) -> Result<bool> {
        (**self).replace(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
}

impl<C: KvClient + ?Sized> KvClient for Arc<C> {
    fn add(&self, key: &str, value: &[u8]) -> Result<bool> {
        (**self).add(key, value)
    }

    fn replace(&self, key: &str, value: &[u8]) -> Result<bool> {
        (**self).replace(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
}

/// Encode named values as the flat blob stored under an entity's key.
///
/// JSON has no NaN or infinity, so a non-finite float is a codec error
/// rather than a `null` that would read back as [`Value::Null`].
pub fn encode_blob(names: &[String], values: Vec<Value>) -> Result<Vec<u8>> {
    for (name, value) in names.iter().zip(&values) {
        if let Value::Float(x) = value {
            if !x.is_finite() {
                return Err(PouchError::Codec(<serde_json::Error as serde::ser::Error>::custom(
                    format!("field {name} holds non-finite float {x}"),
                )));
            }
        }
    }
    let fields: BTreeMap<&str, Value> = names.iter().map(String::as_str).zip(values).collect();
    Ok(serde_json::to_vec(&fields)?)
}

pub fn decode_blob(blob: &[u8]) -> Result<BTreeMap<String, Value>> {
    Ok(serde_json::from_slice(blob)?)
}

fn key_for<T: Tableable + ?Sized>(entity: &T) -> Result<String> {
    let key = match entity.as_cache_keyed() {
        Some(keyed) => keyed.cache_key(),
        None => entity.table().to_string(),
    };
    if key.is_empty() {
        return Err(PouchError::contract("entity provides no cache key or table"));
    }
    Ok(key)
}

fn blob_for<I: Insertable + ?Sized>(entity: &I) -> Result<Vec<u8>> {
    let (cols, values) = insertable_of(entity)?;
    encode_blob(&cols, values)
}

/// Pouch over a [`KvClient`].
pub struct KvPouch<C> {
    client: C,
}

impl<C: KvClient> KvPouch<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn find_one(&self, entity: &mut dyn Findable) -> Result<()> {
        let key = key_for(&*entity)?;
        log::debug!("kv: get {key}");
        let blob = self
            .client
            .get(&key)?
            .ok_or_else(|| PouchError::NotFound(format!("cache miss: {key}")))?;
        let fields = decode_blob(&blob)?;
        if let Some(setter) = entity.as_field_setter() {
            return setter.set_fields(fields);
        }
        assign_by_name(entity, fields)?;
        Ok(())
    }

    fn create_one(&self, entity: &mut dyn Createable) -> Result<()> {
        let key = key_for(&*entity)?;
        let blob = blob_for(&*entity)?;
        log::debug!("kv: add {key}");
        if !self.client.add(&key, &blob)? {
            return Err(PouchError::AlreadyExists(key));
        }
        Ok(())
    }

    fn update_one(&self, entity: &dyn Updateable) -> Result<()> {
        let key = key_for(entity)?;
        let blob = blob_for(entity)?;
        log::debug!("kv: replace {key}");
        if !self.client.replace(&key, &blob)? {
            return Err(PouchError::NotFound(format!("entity does not exist, refusing to update: {key}")));
        }
        Ok(())
    }

    fn delete_one(&self, entity: &dyn Deleteable) -> Result<()> {
        let key = key_for(entity)?;
        log::debug!("kv: delete {key}");
        if !self.client.delete(&key)? {
            return Err(PouchError::NotFound(format!("cache miss: {key}")));
        }
        Ok(())
    }
}

impl<C: KvClient> Storage for KvPouch<C> {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        instrument(BACKEND, "Find", || self.find_one(entity))
    }

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()> {
        instrument(BACKEND, "FindAll", || {
            fail_fast(entities.iter_mut(), |entity| self.find_one(&mut **entity))
        })
    }

    fn create(&self, entity: &mut dyn Createable) -> Result<()> {
        instrument(BACKEND, "Create", || self.create_one(entity))
    }

    fn create_all(&self, entities: &mut [&mut dyn Createable]) -> Result<()> {
        instrument(BACKEND, "CreateAll", || {
            fail_fast(entities.iter_mut(), |entity| self.create_one(&mut **entity))
        })
    }

    fn update(&self, entity: &dyn Updateable) -> Result<()> {
        instrument(BACKEND, "Update", || self.update_one(entity))
    }

    fn update_all(&self, entities: &[&dyn Updateable]) -> Result<()> {
        instrument(BACKEND, "UpdateAll", || {
            fail_fast(entities.iter().copied(), |entity| self.update_one(entity))
        })
    }

    fn delete(&self, entity: &dyn Deleteable) -> Result<()> {
        instrument(BACKEND, "Delete", || self.delete_one(entity))
    }

    fn delete_all(&self, entities: &[&dyn Deleteable]) -> Result<()> {
        instrument(BACKEND, "DeleteAll", || {
            fail_fast(entities.iter().copied(), |entity| self.delete_one(entity))
        })
    }
}

impl<C: KvClient> Pouch for KvPouch<C> {
    type Query<'p>
        = KvQuery<'p, C>
    where
        Self: 'p;

    fn query(&self) -> KvQuery<'_, C> {
        KvQuery {
            pouch: self,
            criteria: Criteria::new(),
        }
    }
}

/// Query over a [`KvPouch`]. A key lookup has nothing to narrow, so
/// criteria are carried but ignored, and listing is unsupported.
pub struct KvQuery<'p, C> {
    pouch: &'p KvPouch<C>,
    criteria: Criteria,
}

impl<C: KvClient> KvQuery<'_, C> {
    fn note_ignored(&self) {
        if !self.criteria.is_empty() {
            log::debug!("kv: criteria ignored for key lookups");
        }
    }
}

impl<C: KvClient> Storage for KvQuery<'_, C> {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        self.note_ignored();
        self.pouch.find(entity)
    }

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()> {
        self.note_ignored();
        self.pouch.find_all(entities)
    }

    fn create(&self, entity: &mut dyn Createable) -> Result<()> {
        self.pouch.create(entity)
    }

    fn create_all(&self, entities: &mut [&mut dyn Createable]) -> Result<()> {
        self.pouch.create_all(entities)
    }

    fn update(&self, entity: &dyn Updateable) -> Result<()> {
        self.pouch.update(entity)
    }

    fn update_all(&self, entities: &[&dyn Updateable]) -> Result<()> {
        self.pouch.update_all(entities)
    }

    fn delete(&self, entity: &dyn Deleteable) -> Result<()> {
        self.pouch.delete(entity)
    }

    fn delete_all(&self, entities: &[&dyn Deleteable]) -> Result<()> {
        self.pouch.delete_all(entities)
    }
}

impl<C: KvClient> Query for KvQuery<'_, C> {
    fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    fn criteria_mut(&mut self) -> &mut Criteria {
        &mut self.criteria
    }

    fn find_entities(&self, _template: &dyn Findable, _into: &mut Vec<Box<dyn Findable>>) -> Result<()> {
        Err(PouchError::Unimplemented("FindEntities"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_is_flat_json() {
        let blob = encode_blob(&["Name".to_string()], vec![Value::from("kale")]).unwrap();
        assert_eq!(blob, br#"{"Name":"kale"}"#.to_vec());
        let back = decode_blob(&blob).unwrap();
        assert_eq!(back.get("Name"), Some(&Value::from("kale")));
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        let names = vec!["Name".to_string(), "Ratio".to_string()];
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = encode_blob(&names, vec![Value::from("kale"), Value::Float(x)]).unwrap_err();
            assert!(matches!(err, PouchError::Codec(_)));
            assert!(err.to_string().contains("Ratio"));
        }
        assert!(encode_blob(&names, vec![Value::from("kale"), Value::Float(0.5)]).is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_blob(b"not json"), Err(PouchError::Codec(_))));
    }
}
