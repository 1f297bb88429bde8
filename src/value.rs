//! Scalar values and write-targets.
//!
//! [`Value`] is the currency every backend speaks: SQL parameters, cache blob
//! entries, hash fields and identifiers are all carried as `Value`s.
//!
//! [`Field`] is the write-target side. An entity hands out `&mut dyn Field`
//! references to its own struct fields; backends assign retrieved values into
//! them without knowing the concrete field types. Implementations exist for
//! the usual primitives, `String`, `Vec<u8>`, `Value` itself and `Option<T>`.
//!
//! ```
//! use pouch::{Field, Value};
//!
//! let mut name = String::new();
//! let target: &mut dyn Field = &mut name;
//! target.assign(Value::from("kale")).unwrap();
//! assert_eq!(name, "kale");
//! ```

use crate::error::{PouchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A backend-neutral scalar.
///
/// Serialized untagged, so a map of values encodes as a flat JSON document
/// (`{"Name":"kale","ID":1}`) and decodes back to the same variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A location that can receive a retrieved value.
pub trait Field {
    /// Store `value` into this target, converting where the conversion is
    /// lossless. Incompatible values are a contract error.
    fn assign(&mut self, value: Value) -> Result<()>;

    /// Current contents of the target.
    fn value(&self) -> Value;

    /// The raw `String` behind this target, if it is one.
    fn as_text_mut(&mut self) -> Option<&mut String> {
        None
    }
}

fn mismatch(expected: &str, value: &Value) -> PouchError {
    PouchError::contract(format!(
        "cannot assign {} value `{value}` to a {expected} field",
        value.kind()
    ))
}

impl Field for Value {
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = value;
        Ok(())
    }

    fn value(&self) -> Value {
        self.clone()
    }
}

impl Field for bool {
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Bool(b) => b,
            Value::Int(0) => false,
            Value::Int(1) => true,
            other => return Err(mismatch("bool", &other)),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Field for i64 {
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Int(i) => i,
            Value::Text(ref s) => s.parse().map_err(|_| mismatch("i64", &value))?,
            other => return Err(mismatch("i64", &other)),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Int(*self)
    }
}

impl Field for i32 {
    fn assign(&mut self, value: Value) -> Result<()> {
        let mut wide = 0i64;
        wide.assign(value.clone())?;
        *self = i32::try_from(wide).map_err(|_| mismatch("i32", &value))?;
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Int(i64::from(*self))
    }
}

impl Field for u32 {
    fn assign(&mut self, value: Value) -> Result<()> {
        let mut wide = 0i64;
        wide.assign(value.clone())?;
        *self = u32::try_from(wide).map_err(|_| mismatch("u32", &value))?;
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Int(i64::from(*self))
    }
}

impl Field for f64 {
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Float(x) => x,
            // i64 -> f64 is exact below 2^53, which covers any sane column
            Value::Int(i) => i as f64,
            other => return Err(mismatch("f64", &other)),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Float(*self)
    }
}

impl Field for String {
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Text(s) => s,
            Value::Bytes(b) => String::from_utf8(b)
                .map_err(|e| PouchError::contract(format!("non utf-8 bytes for text field: {e}")))?,
            Value::Int(i) => i.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => return Err(mismatch("String", &Value::Null)),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn as_text_mut(&mut self) -> Option<&mut String> {
        Some(self)
    }
}

impl Field for Vec<u8> {
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Bytes(b) => b,
            Value::Text(s) => s.into_bytes(),
            other => return Err(mismatch("bytes", &other)),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl<T> Field for Option<T>
where
    T: Field + Default,
{
    fn assign(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.assign(value)?;
        *self = Some(inner);
        Ok(())
    }

    fn value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Field::value)
    }
}
