//! Hash-store (redis-style) pouch.
//!
//! Only `find` is supported: the entity's columns are fetched as fields of
//! one hash. The hash key comes from [`HashDecorated::key_formula`] when the
//! entity provides it, otherwise from filling the table formula with the
//! identifying values.
//!
//! Decorated entities receive each fetched field through
//! [`HashDecorated::set_field_from_string`]. Every other entity must expose
//! only `String` targets. Every other operation fails with
//! [`PouchError::Unimplemented`].
//!
//! [`HashDecorated::key_formula`]: crate::entity::HashDecorated::key_formula
//! [`HashDecorated::set_field_from_string`]: crate::entity::HashDecorated::set_field_from_string

use crate::backend::key::render_key;
use crate::entity::{identity_of, require_table, Createable, Deleteable, Findable, Gettable, Tableable, Updateable};
use crate::error::{PouchError, Result};
use crate::metrics::instrument;
use crate::query::Criteria;
use crate::storage::{Pouch, Query, Storage};
use std::sync::Arc;

const BACKEND: &str = "hash";

/// Field-level access to string-keyed hashes.
pub trait HashClient {
    /// Values of `fields` in `key`, in order; `None` for absent fields.
    fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>>;

    fn hmset(&self, key: &str, pairs: &[(&str, &str)]) -> Result<()>;

    fn hexists(&self, key: &str, field: &str) -> Result<bool>;

    /// Remove `fields` from `key`, returning how many existed.
    fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64>;
}

impl<C: HashClient + ?Sized> HashClient for &C {
    fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        (**self).hmget(key, fields)
    }

    fn hmset(&self, key: &str, pairs: &[(&str, &str)]) -> Result<()> {
        (**self).hmset(key, pairs)
    }

    fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        (**self).hexists(key, field)
    }

    fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64> {
        (**self).hdel(key, fields)
    }
}

impl<C: HashClient + ?Sized> HashClient for Arc<C> {
    fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        (**self).hmget(key, fields)
    }

    fn hmset(&self, key: &str, pairs: &[(&str, &str)]) -> Result<()> {
        (**self).hmset(key, pairs)
    }

    fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        (**self).hexists(key, field)
    }

    fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64> {
        (**self).hdel(key, fields)
    }
}

fn hash_key(entity: &mut dyn Findable) -> Result<String> {
    let decorated_key = entity.as_hash_decorated().map(|decorated| decorated.key_formula());
    let key = match decorated_key {
        Some(key) => key,
        None => {
            require_table(entity.table())?;
            let (_, values) = identity_of(&*entity)?;
            render_key(entity.table(), &values)?
        }
    };
    if key.is_empty() {
        return Err(PouchError::contract("must return an entity formula to be able to retrieve"));
    }
    Ok(key)
}

fn field_names(entity: &mut dyn Findable) -> Result<Vec<String>> {
    let (names, fields) = entity.all_fields();
    if names.is_empty() || names.len() != fields.len() {
        return Err(PouchError::contract("invalid number of fields/keys returned"));
    }
    Ok(names.into_iter().map(str::to_string).collect())
}

/// Pouch over a [`HashClient`].
pub struct HashPouch<C> {
    client: C,
}

impl<C: HashClient> HashPouch<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn find_one(&self, entity: &mut dyn Findable) -> Result<()> {
        let key = hash_key(entity)?;
        let names = field_names(entity)?;
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        log::debug!("hash: hmget {key} {}", refs.join(" "));

        let found = self.client.hmget(&key, &refs)?;
        if found.len() != names.len() {
            return Err(PouchError::Backend(format!(
                "hmget {key} returned {} values for {} fields",
                found.len(),
                names.len()
            )));
        }
        if found.iter().all(Option::is_none) {
            return Err(PouchError::NotFound(format!("no hash stored under {key}")));
        }

        if let Some(decorated) = entity.as_hash_decorated() {
            for (name, value) in names.iter().zip(found) {
                if let Some(value) = value {
                    decorated.set_field_from_string(name, value)?;
                }
            }
            return Ok(());
        }

        let (_, mut fields) = entity.all_fields();
        if !fields.iter_mut().all(|field| field.as_text_mut().is_some()) {
            return Err(PouchError::contract(
                "can't store string in non-string type; implement HashDecorated",
            ));
        }
        for (field, value) in fields.iter_mut().zip(found) {
            if let (Some(target), Some(value)) = (field.as_text_mut(), value) {
                *target = value;
            }
        }
        Ok(())
    }
}

fn unimplemented(operation: &'static str) -> Result<()> {
    Err(PouchError::Unimplemented(operation))
}

impl<C: HashClient> Storage for HashPouch<C> {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        instrument(BACKEND, "Find", || self.find_one(entity))
    }

    fn find_all(&self, _entities: &mut [&mut dyn Findable]) -> Result<()> {
        unimplemented("FindAll")
    }

    fn create(&self, _entity: &mut dyn Createable) -> Result<()> {
        unimplemented("Create")
    }

    fn create_all(&self, _entities: &mut [&mut dyn Createable]) -> Result<()> {
        unimplemented("CreateAll")
    }

    fn update(&self, _entity: &dyn Updateable) -> Result<()> {
        unimplemented("Update")
    }

    fn update_all(&self, _entities: &[&dyn Updateable]) -> Result<()> {
        unimplemented("UpdateAll")
    }

    fn delete(&self, _entity: &dyn Deleteable) -> Result<()> {
        unimplemented("Delete")
    }

    fn delete_all(&self, _entities: &[&dyn Deleteable]) -> Result<()> {
        unimplemented("DeleteAll")
    }
}

impl<C: HashClient> Pouch for HashPouch<C> {
    type Query<'p>
        = HashQuery<'p, C>
    where
        Self: 'p;

    fn query(&self) -> HashQuery<'_, C> {
        HashQuery {
            pouch: self,
            criteria: Criteria::new(),
        }
    }
}

/// Query over a [`HashPouch`]. `find` ignores the criteria; everything
/// else is unimplemented.
pub struct HashQuery<'p, C> {
    pouch: &'p HashPouch<C>,
    criteria: Criteria,
}

impl<C: HashClient> Storage for HashQuery<'_, C> {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        if !self.criteria.is_empty() {
            log::debug!("hash: criteria ignored for hash lookups");
        }
        self.pouch.find(entity)
    }

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()> {
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

impl<C: HashClient> Query for HashQuery<'_, C> {
    fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    fn criteria_mut(&mut self) -> &mut Criteria {
        &mut self.criteria
    }

    fn find_entities(&self, _template: &dyn Findable, _into: &mut Vec<Box<dyn Findable>>) -> Result<()> {
        unimplemented("FindEntities")
    }
}
