//! Backend-neutral storage traits.
//!
//! A [`Pouch`] is a handle onto one backing medium. It can store and
//! retrieve entities directly through [`Storage`], or hand out a [`Query`]
//! that narrows later operations with criteria.
//!
//! ```
//! use pouch::{MapPouch, Pouch, Query, Storage};
//!
//! let pouch = MapPouch::new();
//! let query = pouch.order_by("Name").limit(2).offset(1);
//! assert_eq!(query.criteria().limit_value(), 2);
//! assert_eq!(query.criteria().offset_value(), 1);
//! ```

use crate::entity::{Createable, Deleteable, Findable, Updateable};
use crate::error::Result;
use crate::query::Criteria;
use crate::value::Value;

/// Single and bulk CRUD over one backing medium.
///
/// Bulk variants run strictly in sequence. Whether they stop at the first
/// failure or keep going and report the last one is a property of each
/// backend and is documented there.
pub trait Storage {
    /// Populate `entity` from storage, addressed by its identifying fields.
    fn find(&self, entity: &mut dyn Findable) -> Result<()>;

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()>;

    /// Store `entity` and write the assigned identifier back into it.
    fn create(&self, entity: &mut dyn Createable) -> Result<()>;

    fn create_all(&self, entities: &mut [&mut dyn Createable]) -> Result<()>;

    /// Overwrite the stored columns named by the entity's insertable fields.
    fn update(&self, entity: &dyn Updateable) -> Result<()>;

    fn update_all(&self, entities: &[&dyn Updateable]) -> Result<()>;

    fn delete(&self, entity: &dyn Deleteable) -> Result<()>;

    fn delete_all(&self, entities: &[&dyn Deleteable]) -> Result<()>;
}

/// Storage narrowed by criteria.
///
/// The fluent methods consume and return the query so calls chain:
/// `pouch.query().filter("Name = ?", ["kale"]).limit(10)`.
pub trait Query: Storage + Sized {
    fn criteria(&self) -> &Criteria;

    fn criteria_mut(&mut self) -> &mut Criteria;

    /// List every entity matching the criteria, appending a fresh copy of
    /// `template` per match to `into`.
    fn find_entities(&self, template: &dyn Findable, into: &mut Vec<Box<dyn Findable>>) -> Result<()>;

    fn group_by(mut self, spec: impl Into<String>) -> Self {
        self.criteria_mut().push_group_by(spec);
        self
    }

    fn order_by(mut self, spec: impl Into<String>) -> Self {
        self.criteria_mut().push_order_by(spec);
        self
    }

    /// Add a constraint fragment. Named `filter` because `where` is reserved.
    fn filter<I, V>(mut self, fragment: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.criteria_mut().push_filter(fragment, values);
        self
    }

    fn limit(mut self, limit: u64) -> Self {
        self.criteria_mut().set_limit(limit);
        self
    }

    fn offset(mut self, offset: u64) -> Self {
        self.criteria_mut().set_offset(offset);
        self
    }
}

/// A backing-store handle that can start queries.
///
/// Each fluent method starts a fresh query with empty criteria; nothing is
/// carried over between chains.
pub trait Pouch: Storage {
    type Query<'p>: Query
    where
        Self: 'p;

    /// A query with no criteria.
    fn query(&self) -> Self::Query<'_>;

    fn group_by(&self, spec: impl Into<String>) -> Self::Query<'_> {
        self.query().group_by(spec)
    }

    fn order_by(&self, spec: impl Into<String>) -> Self::Query<'_> {
        self.query().order_by(spec)
    }

    fn filter<I, V>(&self, fragment: impl Into<String>, values: I) -> Self::Query<'_>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.query().filter(fragment, values)
    }

    fn limit(&self, limit: u64) -> Self::Query<'_> {
        self.query().limit(limit)
    }

    fn offset(&self, offset: u64) -> Self::Query<'_> {
        self.query().offset(offset)
    }
}
