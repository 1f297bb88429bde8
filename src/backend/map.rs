//! In-process map pouch.
//!
//! Entities are stored as [`Record`]s under the key produced by filling
//! their table formula with their identifying values (`"food:%d"` with
//! `[1]` becomes `"food:1"`). Finds merge the stored record into the
//! caller's entity by field name.
//!
//! Create assigns identifiers from a single counter per pouch, starting at
//! 0 and shared by every entity kind stored in it. Update refuses keys that
//! do not exist; delete of a missing key is not an error.
//!
//! Bulk operations are best-effort: every item is attempted and the last
//! error is returned.
//!
//! The pouch uses interior mutability without locking, so it is neither
//! `Sync` nor safe to share between threads. The compiler enforces this.

use crate::backend::bulk::best_effort;
use crate::backend::key::render_key;
use crate::entity::{
    identity_of, insertable_of, require_table, Createable, Deleteable, Findable, Insertable, Mergeable, Record,
    Tableable, Updateable,
};
use crate::error::{PouchError, Result};
use crate::metrics::instrument;
use crate::query::Criteria;
use crate::storage::{Pouch, Query, Storage};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

const BACKEND: &str = "map";

/// Pouch over an in-memory ordered map.
#[derive(Debug, Default)]
pub struct MapPouch {
    records: RefCell<BTreeMap<String, Record>>,
    next_id: Cell<i64>,
}

impl MapPouch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pouch pre-populated with `records`, keyed as given. The identifier
    /// counter still starts at 0.
    pub fn with_records<K: Into<String>>(records: impl IntoIterator<Item = (K, Record)>) -> Self {
        Self {
            records: RefCell::new(records.into_iter().map(|(k, r)| (k.into(), r)).collect()),
            next_id: Cell::new(0),
        }
    }

    /// Store `record` under `key`, replacing whatever was there.
    pub fn insert(&self, key: impl Into<String>, record: Record) {
        self.records.borrow_mut().insert(key.into(), record);
    }

    pub fn get(&self, key: &str) -> Option<Record> {
        self.records.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    fn key_of(formula: &str, values: &[Value]) -> Result<String> {
        require_table(formula)?;
        render_key(formula, values)
    }

    fn find_one(&self, entity: &mut dyn Findable) -> Result<()> {
        let (_, ids) = identity_of(&*entity)?;
        let key = Self::key_of(entity.table(), &ids)?;
        log::debug!("map: find {key}");
        // released before calling back into the entity
        let found = self.records.borrow().get(&key).cloned();
        let mut record = found.ok_or_else(|| PouchError::NotFound(format!("no entity stored under {key}")))?;
        entity.merge(&mut record)
    }

    fn create_one(&self, entity: &mut dyn Createable) -> Result<()> {
        let table = entity.table().to_string();
        require_table(&table)?;
        let (cols, values) = insertable_of(&*entity)?;

        let id = self.next_id.get();
        let key = render_key(&table, &[Value::Int(id)])?;
        self.next_id.set(id + 1);

        let mut record = Record::new(table);
        record.overwrite(cols.iter().map(String::as_str), values);
        log::debug!("map: create {key}");
        self.records.borrow_mut().insert(key, record);
        entity.set_identifier(Value::Int(id))
    }

    fn update_one(&self, entity: &dyn Updateable) -> Result<()> {
        let (_, ids) = identity_of(entity)?;
        let key = Self::key_of(entity.table(), &ids)?;
        let (cols, values) = insertable_of(entity)?;
        log::debug!("map: update {key}");
        let mut records = self.records.borrow_mut();
        let record = records
            .get_mut(&key)
            .ok_or_else(|| PouchError::NotFound(format!("entity does not exist, refusing to update: {key}")))?;
        record.overwrite(cols.iter().map(String::as_str), values);
        Ok(())
    }

    fn delete_one(&self, entity: &dyn Deleteable) -> Result<()> {
        let (_, ids) = identity_of(entity)?;
        let key = Self::key_of(entity.table(), &ids)?;
        log::debug!("map: delete {key}");
        if self.records.borrow_mut().remove(&key).is_none() {
            log::debug!("map: {key} was not present");
        }
        Ok(())
    }

    fn find_all_with(&self, entities: &mut [&mut dyn Findable], criteria: &Criteria) -> Result<()> {
        best_effort(criteria.paginate(entities.iter_mut()), |entity| self.find_one(&mut **entity))
    }

    fn find_entities_with(
        &self,
        template: &dyn Findable,
        into: &mut Vec<Box<dyn Findable>>,
        criteria: &Criteria,
    ) -> Result<()> {
        let formula = template.table();
        require_table(formula)?;
        let matching: Vec<Record> = self
            .records
            .borrow()
            .values()
            .filter(|record| record.table() == formula)
            .cloned()
            .collect();
        for mut record in criteria.paginate(matching) {
            let mut copy = template.findable_copy();
            copy.merge(&mut record)?;
            into.push(copy);
        }
        Ok(())
    }
}

// Only pagination has meaning for an unordered key lookup.
fn warn_ignored(criteria: &Criteria) {
    if !criteria.constraints().is_empty()
        || !criteria.group_by_specs().is_empty()
        || !criteria.order_by_specs().is_empty()
    {
        log::warn!("map: constraints, grouping and ordering are ignored by the map pouch");
    }
}

impl Storage for MapPouch {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        instrument(BACKEND, "Find", || self.find_one(entity))
    }

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()> {
        instrument(BACKEND, "FindAll", || self.find_all_with(entities, &Criteria::default()))
    }

    fn create(&self, entity: &mut dyn Createable) -> Result<()> {
        instrument(BACKEND, "Create", || self.create_one(entity))
    }

    fn create_all(&self, entities: &mut [&mut dyn Createable]) -> Result<()> {
        instrument(BACKEND, "CreateAll", || {
            best_effort(entities.iter_mut(), |entity| self.create_one(&mut **entity))
        })
    }

    fn update(&self, entity: &dyn Updateable) -> Result<()> {
        instrument(BACKEND, "Update", || self.update_one(entity))
    }

    fn update_all(&self, entities: &[&dyn Updateable]) -> Result<()> {
        instrument(BACKEND, "UpdateAll", || {
            best_effort(entities.iter().copied(), |entity| self.update_one(entity))
        })
    }

    fn delete(&self, entity: &dyn Deleteable) -> Result<()> {
        instrument(BACKEND, "Delete", || self.delete_one(entity))
    }

    fn delete_all(&self, entities: &[&dyn Deleteable]) -> Result<()> {
        instrument(BACKEND, "DeleteAll", || {
            best_effort(entities.iter().copied(), |entity| self.delete_one(entity))
        })
    }
}

impl Pouch for MapPouch {
    type Query<'p> = MapQuery<'p>;

    fn query(&self) -> MapQuery<'_> {
        MapQuery {
            pouch: self,
            criteria: Criteria::new(),
        }
    }
}

/// Criteria-narrowed view of a [`MapPouch`].
///
/// `offset` and `limit` select a window of the `find_all` input, or of the
/// `find_entities` listing in key order. Other criteria are ignored.
pub struct MapQuery<'p> {
    pouch: &'p MapPouch,
    criteria: Criteria,
}

impl Storage for MapQuery<'_> {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        warn_ignored(&self.criteria);
        self.pouch.find(entity)
    }

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()> {
        warn_ignored(&self.criteria);
        instrument(BACKEND, "FindAll", || self.pouch.find_all_with(entities, &self.criteria))
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

impl Query for MapQuery<'_> {
    fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    fn criteria_mut(&mut self) -> &mut Criteria {
        &mut self.criteria
    }

    fn find_entities(&self, template: &dyn Findable, into: &mut Vec<Box<dyn Findable>>) -> Result<()> {
        warn_ignored(&self.criteria);
        instrument(BACKEND, "FindEntities", || {
            self.pouch.find_entities_with(template, into, &self.criteria)
        })
    }
}
