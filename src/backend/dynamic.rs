//! Pouch assembled from closures.
//!
//! A [`DynamicPouch`] owns a backer value (a client, a connection, a plain
//! map) and forwards each operation to the closure registered for it. Slots
//! are fixed once [`DynamicPouchBuilder::build`] returns; an operation
//! whose slot was never set fails with [`PouchError::NotConfigured`].
//!
//! ```
//! use pouch::{DynamicPouch, Identifiable, Storage, Tableable, Value};
//! use std::cell::Cell;
//!
//! struct Session(i64);
//!
//! impl Tableable for Session {
//!     fn table(&self) -> &str { "session:%d" }
//! }
//!
//! impl Identifiable for Session {
//!     fn identifiable_fields(&self) -> (Vec<&str>, Vec<Value>) {
//!         (vec!["ID"], vec![Value::Int(self.0)])
//!     }
//! }
//!
//! let pouch = DynamicPouch::builder(Cell::new(0u32))
//!     .delete(|deletes, _session| {
//!         deletes.set(deletes.get() + 1);
//!         Ok(())
//!     })
//!     .build();
//!
//! pouch.delete(&Session(7)).unwrap();
//! assert_eq!(pouch.backer().get(), 1);
//!
//! let err = pouch.update_all(&[]).unwrap_err();
//! assert_eq!(err.to_string(), "no UpdateAll function has been defined");
//! ```

use crate::entity::{Createable, Deleteable, Findable, Updateable};
use crate::error::{PouchError, Result};
use crate::metrics::instrument;
use crate::query::Criteria;
use crate::storage::{Pouch, Query, Storage};

const BACKEND: &str = "dynamic";

type FindFn<B> = Box<dyn Fn(&B, &Criteria, &mut dyn Findable) -> Result<()>>;
type FindAllFn<B> = Box<dyn Fn(&B, &Criteria, &mut [&mut dyn Findable]) -> Result<()>>;
type FindEntitiesFn<B> = Box<dyn Fn(&B, &Criteria, &dyn Findable, &mut Vec<Box<dyn Findable>>) -> Result<()>>;
type CreateFn<B> = Box<dyn Fn(&B, &mut dyn Createable) -> Result<()>>;
type CreateAllFn<B> = Box<dyn Fn(&B, &mut [&mut dyn Createable]) -> Result<()>>;
type UpdateFn<B> = Box<dyn Fn(&B, &dyn Updateable) -> Result<()>>;
type UpdateAllFn<B> = Box<dyn Fn(&B, &[&dyn Updateable]) -> Result<()>>;
type DeleteFn<B> = Box<dyn Fn(&B, &dyn Deleteable) -> Result<()>>;
type DeleteAllFn<B> = Box<dyn Fn(&B, &[&dyn Deleteable]) -> Result<()>>;

/// Pouch whose operations are closures over a backer `B`.
pub struct DynamicPouch<B> {
    backer: B,
    find: Option<FindFn<B>>,
    find_all: Option<FindAllFn<B>>,
    find_entities: Option<FindEntitiesFn<B>>,
    create: Option<CreateFn<B>>,
    create_all: Option<CreateAllFn<B>>,
    update: Option<UpdateFn<B>>,
    update_all: Option<UpdateAllFn<B>>,
    delete: Option<DeleteFn<B>>,
    delete_all: Option<DeleteAllFn<B>>,
}

/// Collects the closures for a [`DynamicPouch`].
pub struct DynamicPouchBuilder<B> {
    pouch: DynamicPouch<B>,
}

impl<B> DynamicPouch<B> {
    pub fn builder(backer: B) -> DynamicPouchBuilder<B> {
        DynamicPouchBuilder {
            pouch: DynamicPouch {
                backer,
                find: None,
                find_all: None,
                find_entities: None,
                create: None,
                create_all: None,
                update: None,
                update_all: None,
                delete: None,
                delete_all: None,
            },
        }
    }

    pub fn backer(&self) -> &B {
        &self.backer
    }

    fn find_with(&self, entity: &mut dyn Findable, criteria: &Criteria) -> Result<()> {
        let f = self.find.as_ref().ok_or(PouchError::NotConfigured("Find"))?;
        f(&self.backer, criteria, entity)
    }

    fn find_all_with(&self, entities: &mut [&mut dyn Findable], criteria: &Criteria) -> Result<()> {
        let f = self.find_all.as_ref().ok_or(PouchError::NotConfigured("FindAll"))?;
        f(&self.backer, criteria, entities)
    }

    fn find_entities_with(
        &self,
        template: &dyn Findable,
        into: &mut Vec<Box<dyn Findable>>,
        criteria: &Criteria,
    ) -> Result<()> {
        let f = self
            .find_entities
            .as_ref()
            .ok_or(PouchError::NotConfigured("FindEntities"))?;
        f(&self.backer, criteria, template, into)
    }
}

impl<B> DynamicPouchBuilder<B> {
    pub fn find(mut self, f: impl Fn(&B, &Criteria, &mut dyn Findable) -> Result<()> + 'static) -> Self {
        self.pouch.find = Some(Box::new(f));
        self
    }

    pub fn find_all(
        mut self,
        f: impl Fn(&B, &Criteria, &mut [&mut dyn Findable]) -> Result<()> + 'static,
    ) -> Self {
        self.pouch.find_all = Some(Box::new(f));
        self
    }

    pub fn find_entities(
        mut self,
        f: impl Fn(&B, &Criteria, &dyn Findable, &mut Vec<Box<dyn Findable>>) -> Result<()> + 'static,
    ) -> Self {
        self.pouch.find_entities = Some(Box::new(f));
        self
    }

    pub fn create(mut self, f: impl Fn(&B, &mut dyn Createable) -> Result<()> + 'static) -> Self {
        self.pouch.create = Some(Box::new(f));
        self
    }

    pub fn create_all(mut self, f: impl Fn(&B, &mut [&mut dyn Createable]) -> Result<()> + 'static) -> Self {
        self.pouch.create_all = Some(Box::new(f));
        self
    }

    pub fn update(mut self, f: impl Fn(&B, &dyn Updateable) -> Result<()> + 'static) -> Self {
        self.pouch.update = Some(Box::new(f));
        self
    }

    pub fn update_all(mut self, f: impl Fn(&B, &[&dyn Updateable]) -> Result<()> + 'static) -> Self {
        self.pouch.update_all = Some(Box::new(f));
        self
    }

    pub fn delete(mut self, f: impl Fn(&B, &dyn Deleteable) -> Result<()> + 'static) -> Self {
        self.pouch.delete = Some(Box::new(f));
        self
    }

    pub fn delete_all(mut self, f: impl Fn(&B, &[&dyn Deleteable]) -> Result<()> + 'static) -> Self {
        self.pouch.delete_all = Some(Box::new(f));
        self
    }

    pub fn build(self) -> DynamicPouch<B> {
        self.pouch
    }
}

impl<B> Storage for DynamicPouch<B> {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        instrument(BACKEND, "Find", || self.find_with(entity, &Criteria::default()))
    }

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()> {
        instrument(BACKEND, "FindAll", || self.find_all_with(entities, &Criteria::default()))
    }

    fn create(&self, entity: &mut dyn Createable) -> Result<()> {
        instrument(BACKEND, "Create", || {
            let f = self.create.as_ref().ok_or(PouchError::NotConfigured("Create"))?;
            f(&self.backer, entity)
        })
    }

    fn create_all(&self, entities: &mut [&mut dyn Createable]) -> Result<()> {
        instrument(BACKEND, "CreateAll", || {
            let f = self.create_all.as_ref().ok_or(PouchError::NotConfigured("CreateAll"))?;
            f(&self.backer, entities)
        })
    }

    fn update(&self, entity: &dyn Updateable) -> Result<()> {
        instrument(BACKEND, "Update", || {
            let f = self.update.as_ref().ok_or(PouchError::NotConfigured("Update"))?;
            f(&self.backer, entity)
        })
    }

    fn update_all(&self, entities: &[&dyn Updateable]) -> Result<()> {
        instrument(BACKEND, "UpdateAll", || {
            let f = self.update_all.as_ref().ok_or(PouchError::NotConfigured("UpdateAll"))?;
            f(&self.backer, entities)
        })
    }

    fn delete(&self, entity: &dyn Deleteable) -> Result<()> {
        instrument(BACKEND, "Delete", || {
            let f = self.delete.as_ref().ok_or(PouchError::NotConfigured("Delete"))?;
            f(&self.backer, entity)
        })
    }

    fn delete_all(&self, entities: &[&dyn Deleteable]) -> Result<()> {
        instrument(BACKEND, "DeleteAll", || {
            let f = self.delete_all.as_ref().ok_or(PouchError::NotConfigured("DeleteAll"))?;
            f(&self.backer, entities)
        })
    }
}

impl<B> Pouch for DynamicPouch<B> {
    type Query<'p>
        = DynamicQuery<'p, B>
    where
        Self: 'p;

    fn query(&self) -> DynamicQuery<'_, B> {
        DynamicQuery {
            pouch: self,
            criteria: Criteria::new(),
        }
    }
}

/// Query over a [`DynamicPouch`]; the find closures receive its criteria.
pub struct DynamicQuery<'p, B> {
    pouch: &'p DynamicPouch<B>,
    criteria: Criteria,
}

impl<B> Storage for DynamicQuery<'_, B> {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        instrument(BACKEND, "Find", || self.pouch.find_with(entity, &self.criteria))
    }

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()> {
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

impl<B> Query for DynamicQuery<'_, B> {
    fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    fn criteria_mut(&mut self) -> &mut Criteria {
        &mut self.criteria
    }

    fn find_entities(&self, template: &dyn Findable, into: &mut Vec<Box<dyn Findable>>) -> Result<()> {
        instrument(BACKEND, "FindEntities", || {
            self.pouch.find_entities_with(template, into, &self.criteria)
        })
    }
}
