//! Entities shared by the scenario tests.

#![allow(dead_code)]

use pouch::entity::{merge_fields, read_fields};
use pouch::{
    CacheKeyed, Field, FieldSetter, Findable, Gettable, Identifiable, Insertable, Mergeable, Tableable, Value,
};
use std::collections::BTreeMap;

/// Table name used by the SQL scenarios.
pub const SQL_TABLE: &str = "Food";
/// Key formula used by the map scenarios.
pub const MAP_FORMULA: &str = "food:%d";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Food {
    pub table: &'static str,
    pub id: i64,
    pub name: String,
    pub nullable: Option<String>,
}

impl Food {
    pub fn sql(id: i64) -> Self {
        Self {
            table: SQL_TABLE,
            id,
            ..Self::default()
        }
    }

    pub fn map(id: i64) -> Self {
        Self {
            table: MAP_FORMULA,
            id,
            ..Self::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

impl Tableable for Food {
    fn table(&self) -> &str {
        self.table
    }
}

impl Identifiable for Food {
    fn identifiable_fields(&self) -> (Vec<&str>, Vec<Value>) {
        (vec!["ID"], vec![Value::Int(self.id)])
    }
}

impl Gettable for Food {
    fn all_fields(&mut self) -> (Vec<&str>, Vec<&mut dyn Field>) {
        (
            vec!["ID", "Name", "NullableField"],
            vec![&mut self.id, &mut self.name, &mut self.nullable],
        )
    }
}

impl Insertable for Food {
    fn insertable_fields(&self) -> (Vec<&str>, Vec<Value>) {
        let mut cols = vec!["Name"];
        let mut vals = vec![Value::from(self.name.as_str())];
        if let Some(nullable) = &self.nullable {
            cols.push("NullableField");
            vals.push(Value::from(nullable.as_str()));
        }
        (cols, vals)
    }

    fn set_identifier(&mut self, id: Value) -> pouch::Result<()> {
        self.id.assign(id)
    }
}

impl Mergeable for Food {
    fn merge(&mut self, source: &mut dyn Gettable) -> pouch::Result<()> {
        merge_fields(self, source)
    }
}

impl Findable for Food {
    fn findable_copy(&self) -> Box<dyn Findable> {
        Box::new(Food {
            table: self.table,
            ..Food::default()
        })
    }
}

/// Food cached under `food:<id>`, decoding through its own setter.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CachedFood {
    pub id: i64,
    pub name: String,
    pub calories: i64,
    /// Number of fields handed to `set_fields` on the last find
    pub fields_seen: usize,
}

impl CachedFood {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

impl CacheKeyed for CachedFood {
    fn cache_key(&self) -> String {
        format!("food:{}", self.id)
    }
}

impl FieldSetter for CachedFood {
    fn set_fields(&mut self, mut fields: BTreeMap<String, Value>) -> pouch::Result<()> {
        self.fields_seen = fields.len();
        if let Some(name) = fields.remove("Name") {
            self.name.assign(name)?;
        }
        if let Some(calories) = fields.remove("Calories") {
            self.calories.assign(calories)?;
        }
        Ok(())
    }
}

impl Tableable for CachedFood {
    fn table(&self) -> &str {
        "cached_food"
    }

    fn as_cache_keyed(&self) -> Option<&dyn CacheKeyed> {
        Some(self)
    }

    fn as_field_setter(&mut self) -> Option<&mut dyn FieldSetter> {
        Some(self)
    }
}

impl Identifiable for CachedFood {
    fn identifiable_fields(&self) -> (Vec<&str>, Vec<Value>) {
        (vec!["ID"], vec![Value::Int(self.id)])
    }
}

impl Gettable for CachedFood {
    fn all_fields(&mut self) -> (Vec<&str>, Vec<&mut dyn Field>) {
        (
            vec!["ID", "Name", "Calories"],
            vec![&mut self.id, &mut self.name, &mut self.calories],
        )
    }
}

impl Insertable for CachedFood {
    fn insertable_fields(&self) -> (Vec<&str>, Vec<Value>) {
        (
            vec!["Name", "Calories"],
            vec![Value::from(self.name.as_str()), Value::Int(self.calories)],
        )
    }

    fn set_identifier(&mut self, id: Value) -> pouch::Result<()> {
        self.id.assign(id)
    }
}

impl Mergeable for CachedFood {
    fn merge(&mut self, source: &mut dyn Gettable) -> pouch::Result<()> {
        merge_fields(self, source)
    }
}

impl Findable for CachedFood {
    fn findable_copy(&self) -> Box<dyn Findable> {
        Box::new(CachedFood::default())
    }
}

/// The `Name` field of a listed entity.
pub fn name_of(entity: &mut dyn Findable) -> Option<Value> {
    read_fields(entity).ok().and_then(|mut fields| fields.remove("Name"))
}
