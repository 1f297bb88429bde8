//! Entity contracts.
//!
//! Every storable entity describes itself through a handful of small traits
//! instead of reflection: where it lives ([`Tableable`]), how it is identified
//! ([`Identifiable`]), which fields receive retrieved data ([`Gettable`]) and
//! which values it writes ([`Insertable`]). The CRUD capabilities are
//! compositions of those:
//!
//! | capability      | composed of                                  |
//! |-----------------|----------------------------------------------|
//! | [`Findable`]    | Identifiable + Gettable + Mergeable + copy   |
//! | [`Createable`]  | Insertable + Tableable                       |
//! | [`Updateable`]  | Insertable + Identifiable + Tableable        |
//! | [`Deleteable`]  | Identifiable + Tableable                     |
//!
//! `Createable`, `Updateable` and `Deleteable` have blanket implementations,
//! so implementing the building blocks is enough.
//!
//! Backends that can use extra information ask for it through the optional
//! capability accessors on [`Tableable`] (`as_cache_keyed`,
//! `as_hash_decorated`, `as_field_setter`). They return `None` unless the
//! entity opts in.
//!
//! # Example
//!
//! ```
//! use pouch::{Field, Findable, Gettable, Identifiable, Insertable, Mergeable, Tableable, Value};
//! use pouch::entity::merge_fields;
//!
//! #[derive(Default)]
//! struct Food {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Tableable for Food {
//!     fn table(&self) -> &str { "food:%d" }
//! }
//!
//! impl Identifiable for Food {
//!     fn identifiable_fields(&self) -> (Vec<&str>, Vec<Value>) {
//!         (vec!["ID"], vec![Value::Int(self.id)])
//!     }
//! }
//!
//! impl Gettable for Food {
//!     fn all_fields(&mut self) -> (Vec<&str>, Vec<&mut dyn Field>) {
//!         (vec!["ID", "Name"], vec![&mut self.id, &mut self.name])
//!     }
//! }
//!
//! impl Mergeable for Food {
//!     fn merge(&mut self, source: &mut dyn Gettable) -> pouch::Result<()> {
//!         merge_fields(self, source)
//!     }
//! }
//!
//! impl Findable for Food {
//!     fn findable_copy(&self) -> Box<dyn Findable> { Box::new(Food::default()) }
//! }
//!
//! impl Insertable for Food {
//!     fn insertable_fields(&self) -> (Vec<&str>, Vec<Value>) {
//!         (vec!["Name"], vec![Value::from(self.name.as_str())])
//!     }
//!     fn set_identifier(&mut self, id: Value) -> pouch::Result<()> {
//!         self.id.assign(id)
//!     }
//! }
//! ```

use crate::error::{PouchError, Result};
use crate::value::{Field, Value};
use std::collections::BTreeMap;

/// An entity that knows where in a storage system it lives.
///
/// The returned string is either a literal table name (SQL) or a key
/// template with `%d`/`%s`/`%v` placeholders filled from the identifying
/// values (map and hash backends).
pub trait Tableable {
    fn table(&self) -> &str;

    /// Key override for the key-value backend.
    fn as_cache_keyed(&self) -> Option<&dyn CacheKeyed> {
        None
    }

    /// Key override and per-field string setter for the hash backend.
    fn as_hash_decorated(&mut self) -> Option<&mut dyn HashDecorated> {
        None
    }

    /// Bulk field setter used when decoding key-value blobs.
    fn as_field_setter(&mut self) -> Option<&mut dyn FieldSetter> {
        None
    }
}

/// An entity that knows how to find itself.
pub trait Identifiable {
    /// Names of the identifying fields and their current values.
    fn identifiable_fields(&self) -> (Vec<&str>, Vec<Value>);
}

/// An entity that knows which of its fields receive retrieved data.
pub trait Gettable: Tableable {
    /// Every retrievable column together with the field that receives it.
    fn all_fields(&mut self) -> (Vec<&str>, Vec<&mut dyn Field>);

    /// Write-targets for `cols`, in the order requested. Unknown columns are
    /// skipped, so callers compare lengths to detect them.
    fn fields_for(&mut self, cols: &[&str]) -> Vec<&mut dyn Field> {
        let (names, fields) = self.all_fields();
        let mut slots: Vec<Option<&mut dyn Field>> = fields.into_iter().map(Some).collect();
        cols.iter()
            .filter_map(|col| {
                let idx = names.iter().position(|name| name == col)?;
                slots.get_mut(idx).and_then(Option::take)
            })
            .collect()
    }
}

/// An entity that knows what of itself needs to be stored.
pub trait Insertable {
    /// Columns to write and their values.
    fn insertable_fields(&self) -> (Vec<&str>, Vec<Value>);

    /// Values for the requested columns; unknown columns yield `Value::Null`.
    fn values_for(&self, cols: &[&str]) -> Vec<Value> {
        let (names, values) = self.insertable_fields();
        cols.iter()
            .map(|col| {
                names
                    .iter()
                    .position(|name| name == col)
                    .and_then(|idx| values.get(idx).cloned())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }

    /// Receive the identifier the backend assigned on create.
    fn set_identifier(&mut self, id: Value) -> Result<()>;
}

/// An entity that can absorb data retrieved into another representation.
pub trait Mergeable {
    fn merge(&mut self, source: &mut dyn Gettable) -> Result<()>;
}

/// An entity that can be looked up and rebuilt from storage.
pub trait Findable: Identifiable + Gettable + Mergeable {
    /// A blank instance of the same kind, used to accumulate listing results.
    fn findable_copy(&self) -> Box<dyn Findable>;
}

/// An entity that can be created.
pub trait Createable: Insertable + Tableable {}

impl<T: Insertable + Tableable + ?Sized> Createable for T {}

/// An entity that can overwrite its stored columns.
pub trait Updateable: Insertable + Identifiable + Tableable {}

impl<T: Insertable + Identifiable + Tableable + ?Sized> Updateable for T {}

/// An entity that can delete only itself.
pub trait Deleteable: Identifiable + Tableable {}

impl<T: Identifiable + Tableable + ?Sized> Deleteable for T {}

/// Supplies the key used by the key-value backend instead of the table formula.
pub trait CacheKeyed {
    fn cache_key(&self) -> String;
}

/// Hash-store decoration: a ready-made key plus a setter for fields whose
/// storage type is not a bare `String`.
pub trait HashDecorated {
    fn key_formula(&self) -> String;
    fn set_field_from_string(&mut self, field: &str, value: String) -> Result<()>;
}

/// Receives a decoded name/value mapping in one call.
pub trait FieldSetter {
    fn set_fields(&mut self, fields: BTreeMap<String, Value>) -> Result<()>;
}

/// Fail unless `table` names something.
pub fn require_table(table: &str) -> Result<()> {
    if table.is_empty() {
        return Err(PouchError::contract(
            "entity is not known to map to any table",
        ));
    }
    Ok(())
}

/// Fail unless `names` and `values` are both non-empty and the same length.
pub fn checked_pairs<A, B>(what: &str, names: &[A], values: &[B]) -> Result<()> {
    if names.is_empty() || values.is_empty() {
        return Err(PouchError::contract(format!("no {what} provided")));
    }
    if names.len() != values.len() {
        return Err(PouchError::contract(format!(
            "{what}: {} names but {} values",
            names.len(),
            values.len()
        )));
    }
    Ok(())
}

/// Owned identifying names and values of `entity`, validated.
pub fn identity_of<I: Identifiable + ?Sized>(entity: &I) -> Result<(Vec<String>, Vec<Value>)> {
    let (names, values) = entity.identifiable_fields();
    if names.is_empty() || values.is_empty() {
        return Err(PouchError::contract("no identifying information for entity"));
    }
    checked_pairs("identifying fields", &names, &values)?;
    Ok((names.into_iter().map(str::to_string).collect(), values))
}

/// Owned insertable names and values of `entity`, validated.
pub fn insertable_of<I: Insertable + ?Sized>(entity: &I) -> Result<(Vec<String>, Vec<Value>)> {
    let (names, values) = entity.insertable_fields();
    if names.is_empty() || values.is_empty() {
        return Err(PouchError::contract("cannot insert empty entity"));
    }
    checked_pairs("insertable fields", &names, &values)?;
    Ok((names.into_iter().map(str::to_string).collect(), values))
}

/// Snapshot of every gettable field of `source` as owned name/value pairs.
pub fn read_fields<G: Gettable + ?Sized>(source: &mut G) -> Result<BTreeMap<String, Value>> {
    let (names, fields) = source.all_fields();
    checked_pairs("gettable fields", &names, &fields)?;
    Ok(names
        .iter()
        .zip(fields.iter())
        .map(|(name, field)| ((*name).to_string(), field.value()))
        .collect())
}

/// Assign each value whose name matches one of `target`'s gettable fields.
/// Returns how many fields were written; unmatched names are ignored.
pub fn assign_by_name<G: Gettable + ?Sized>(
    target: &mut G,
    mut values: BTreeMap<String, Value>,
) -> Result<usize> {
    let (names, fields) = target.all_fields();
    checked_pairs("gettable fields", &names, &fields)?;
    let mut written = 0;
    for (name, field) in names.into_iter().zip(fields) {
        if let Some(value) = values.remove(name) {
            field.assign(value)?;
            written += 1;
        }
    }
    Ok(written)
}

/// Reconcile `source` into `target` by field-name matching. This is the
/// usual body of [`Mergeable::merge`].
pub fn merge_fields<G: Gettable + ?Sized>(target: &mut G, source: &mut dyn Gettable) -> Result<()> {
    let incoming = read_fields(source)?;
    assign_by_name(target, incoming)?;
    Ok(())
}

/// A detached row: named values tagged with the table formula they belong to.
///
/// The map backend stores entities as `Record`s, and any `Record` can be
/// merged into an entity because it is [`Gettable`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    table: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overwrite the named columns, leaving the others untouched.
    pub fn overwrite<'a>(&mut self, names: impl IntoIterator<Item = &'a str>, values: Vec<Value>) {
        for (name, value) in names.into_iter().zip(values) {
            self.fields.insert(name.to_string(), value);
        }
    }
}

impl Tableable for Record {
    fn table(&self) -> &str {
        &self.table
    }
}

impl Gettable for Record {
    fn all_fields(&mut self) -> (Vec<&str>, Vec<&mut dyn Field>) {
        self.fields
            .iter_mut()
            .map(|(name, value)| (name.as_str(), value as &mut dyn Field))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Plant {
        id: i64,
        name: String,
        height: Option<f64>,
    }

    impl Tableable for Plant {
        fn table(&self) -> &str {
            "plant:%d"
        }
    }

    impl Gettable for Plant {
        fn all_fields(&mut self) -> (Vec<&str>, Vec<&mut dyn Field>) {
            (
                vec!["ID", "Name", "Height"],
                vec![&mut self.id, &mut self.name, &mut self.height],
            )
        }
    }

    impl Insertable for Plant {
        fn insertable_fields(&self) -> (Vec<&str>, Vec<Value>) {
            (vec!["Name", "Height"], vec![self.name.clone().into(), self.height.into()])
        }

        fn set_identifier(&mut self, id: Value) -> Result<()> {
            self.id.assign(id)
        }
    }

    #[test]
    fn test_fields_for_selects_in_requested_order() {
        let mut plant = Plant::default();
        let mut targets = plant.fields_for(&["Name", "ID"]);
        assert_eq!(targets.len(), 2);
        targets[0].assign(Value::from("fern")).unwrap();
        targets[1].assign(Value::Int(9)).unwrap();
        drop(targets);
        assert_eq!(plant.name, "fern");
        assert_eq!(plant.id, 9);
    }

    #[test]
    fn test_fields_for_skips_unknown_columns() {
        let mut plant = Plant::default();
        assert_eq!(plant.fields_for(&["Name", "Colour"]).len(), 1);
    }

    #[test]
    fn test_values_for_defaults_to_null() {
        let plant = Plant {
            name: "moss".into(),
            ..Plant::default()
        };
        assert_eq!(
            plant.values_for(&["Name", "Nope"]),
            vec![Value::from("moss"), Value::Null]
        );
    }

    #[test]
    fn test_merge_from_record() {
        let mut plant = Plant::default();
        let mut stored = Record::new("plant:%d")
            .with("Name", "ivy")
            .with("Height", 1.25)
            .with("Unrelated", true);
        merge_fields(&mut plant, &mut stored).unwrap();
        assert_eq!(plant.name, "ivy");
        assert_eq!(plant.height, Some(1.25));
        assert_eq!(plant.id, 0);
    }

    #[test]
    fn test_contract_checks() {
        assert!(require_table("").unwrap_err().is_contract());
        assert!(checked_pairs::<&str, Value>("x", &[], &[]).is_err());
        assert!(checked_pairs("x", &["a", "b"], &[Value::Null]).is_err());
        assert!(checked_pairs("x", &["a"], &[Value::Null]).is_ok());
    }

    #[test]
    fn test_record_overwrite_keeps_other_columns() {
        let mut rec = Record::new("t").with("A", 1).with("B", 2);
        rec.overwrite(["B"], vec![Value::Int(3)]);
        assert_eq!(rec.get("A"), Some(&Value::Int(1)));
        assert_eq!(rec.get("B"), Some(&Value::Int(3)));
    }
}
