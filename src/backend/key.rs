//! Key formula rendering.
//!
//! A formula such as `"food:%d"` or `"user:%s:%v"` is filled from an
//! entity's identifying values, in order. `%d` takes an integer, `%s` and
//! `%v` take any scalar, and `%%` is a literal percent sign.

use crate::error::{PouchError, Result};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<std::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"%([dsv%])"));

fn placeholder() -> Result<&'static Regex> {
    PLACEHOLDER
        .as_ref()
        .map_err(|e| PouchError::Backend(format!("placeholder pattern: {e}")))
}

/// Number of value placeholders in `formula`.
pub fn placeholder_count(formula: &str) -> Result<usize> {
    Ok(placeholder()?
        .captures_iter(formula)
        .filter(|c| &c[1] != "%")
        .count())
}

/// Substitute `values` into `formula`.
///
/// The result must differ from the formula (a formula without placeholders
/// is a literal, not a key template) and every placeholder must be filled.
pub fn render_key(formula: &str, values: &[Value]) -> Result<String> {
    if formula.is_empty() {
        return Err(PouchError::contract("entity is not known to map to any table"));
    }
    let expected = placeholder_count(formula)?;
    if expected != values.len() {
        return Err(PouchError::contract(format!(
            "key formula {formula:?} takes {expected} values, got {}",
            values.len()
        )));
    }

    let mut next = values.iter();
    let mut failure = None;
    let rendered = placeholder()?.replace_all(formula, |caps: &Captures<'_>| {
        let verb = &caps[1];
        if verb == "%" {
            return "%".to_string();
        }
        match (verb, next.next()) {
            ("d", Some(Value::Int(i))) => i.to_string(),
            ("d", Some(other)) => {
                failure.get_or_insert_with(|| {
                    PouchError::contract(format!(
                        "key formula {formula:?}: %d needs an integer, got {} value",
                        other.kind()
                    ))
                });
                String::new()
            }
            (_, Some(v)) => v.to_string(),
            (_, None) => String::new(),
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }

    let rendered = rendered.into_owned();
    if rendered == formula || rendered.is_empty() {
        return Err(PouchError::contract(format!("invalid generated key: {rendered:?}")));
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_integer_key() {
        assert_eq!(render_key("food:%d", &[Value::Int(1)]).unwrap(), "food:1");
    }

    #[test]
    fn test_render_mixed_key() {
        let key = render_key("user:%s:%v", &[Value::from("ann"), Value::Int(3)]).unwrap();
        assert_eq!(key, "user:ann:3");
    }

    #[test]
    fn test_literal_percent() {
        let key = render_key("rate:%d%%", &[Value::Int(50)]).unwrap();
        assert_eq!(key, "rate:50%");
    }

    #[test]
    fn test_formula_without_placeholders_is_rejected() {
        let err = render_key("food", &[]).unwrap_err();
        assert!(err.is_contract());
    }

    #[test]
    fn test_value_count_must_match() {
        assert!(render_key("food:%d", &[]).unwrap_err().is_contract());
        assert!(render_key("food:%d", &[Value::Int(1), Value::Int(2)])
            .unwrap_err()
            .is_contract());
    }

    #[test]
    fn test_integer_verb_rejects_text() {
        let err = render_key("food:%d", &[Value::from("one")]).unwrap_err();
        assert!(err.is_contract());
    }
}
