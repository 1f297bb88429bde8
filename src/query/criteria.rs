//! Criteria builder.
//!
//! `Criteria` accumulates filter fragments, grouping, ordering and
//! pagination, and renders them into a trailing SQL clause plus the ordered
//! parameter list. Fragments are opaque backend-native text: nothing here
//! parses or sanitizes them, so callers must parameterize with `?`.

use crate::query::dialect::SqlDialect;
use crate::value::Value;

/// One `WHERE` fragment with the values for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub fragment: String,
    pub values: Vec<Value>,
}

/// Filter state attached to a query.
///
/// Rendering order is fixed: constraints, then group-by, then order-by,
/// then limit/offset. Multiple constraints are joined with `AND`.
///
/// # Example
///
/// ```
/// use pouch::{Criteria, SqlDialect, Value};
///
/// let (clause, params) = Criteria::new()
///     .filter("Name = ?", [Value::from("kale")])
///     .order_by("ID DESC")
///     .limit(2)
///     .offset(3)
///     .to_clause(SqlDialect::MySql);
/// assert_eq!(clause, "Name = ? ORDER BY ID DESC LIMIT 3, 2");
/// assert_eq!(params, vec![Value::from("kale")]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    constraints: Vec<Constraint>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: u64,
    offset: u64,
}

/// Rendered criteria, split so the constraint part can be glued onto an
/// existing `WHERE`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedCriteria {
    /// AND-joined constraint fragments, if any
    pub constraint: Option<String>,
    /// `GROUP BY … ORDER BY … LIMIT …`, possibly empty
    pub tail: String,
    /// Constraint values in fragment order
    pub params: Vec<Value>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a GROUP BY spec.
    pub fn group_by(mut self, spec: impl Into<String>) -> Self {
        self.push_group_by(spec);
        self
    }

    /// Add an ORDER BY spec such as `"Name ASC"`.
    pub fn order_by(mut self, spec: impl Into<String>) -> Self {
        self.push_order_by(spec);
        self
    }

    /// Add a WHERE fragment and its positional values.
    pub fn filter<I, V>(mut self, fragment: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_filter(fragment, values);
        self
    }

    /// Cap the number of results; `0` means unlimited.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Skip the first `offset` results. Only rendered alongside a limit.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn push_group_by(&mut self, spec: impl Into<String>) {
        self.group_by.push(spec.into());
    }

    pub fn push_order_by(&mut self, spec: impl Into<String>) {
        self.order_by.push(spec.into());
    }

    pub fn push_filter<I, V>(&mut self, fragment: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.constraints.push(Constraint {
            fragment: fragment.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit;
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn group_by_specs(&self) -> &[String] {
        &self.group_by
    }

    pub fn order_by_specs(&self) -> &[String] {
        &self.order_by
    }

    pub fn limit_value(&self) -> u64 {
        self.limit
    }

    pub fn offset_value(&self) -> u64 {
        self.offset
    }

    /// `true` when no criteria have been added.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
            && self.group_by.is_empty()
            && self.order_by.is_empty()
            && self.limit == 0
            && self.offset == 0
    }

    /// Apply offset then limit to an in-memory sequence, for backends that
    /// cannot push pagination down.
    pub fn paginate<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let skipped = items.into_iter().skip(usize::try_from(self.offset).unwrap_or(usize::MAX));
        if self.limit > 0 {
            skipped.take(usize::try_from(self.limit).unwrap_or(usize::MAX)).collect()
        } else {
            skipped.collect()
        }
    }

    pub fn render(&self, dialect: SqlDialect) -> RenderedCriteria {
        let constraint = if self.constraints.is_empty() {
            None
        } else {
            Some(
                self.constraints
                    .iter()
                    .map(|c| c.fragment.as_str())
                    .collect::<Vec<_>>()
                    .join(" AND "),
            )
        };
        let params = self
            .constraints
            .iter()
            .flat_map(|c| c.values.iter().cloned())
            .collect();

        let mut tail = Vec::new();
        if !self.group_by.is_empty() {
            tail.push(format!("GROUP BY {}", self.group_by.join(", ")));
        }
        if !self.order_by.is_empty() {
            tail.push(format!("ORDER BY {}", self.order_by.join(", ")));
        }
        if let Some(limit) = dialect.limit_clause(self.limit, self.offset) {
            tail.push(limit);
        }

        RenderedCriteria {
            constraint,
            tail: tail.join(" "),
            params,
        }
    }

    /// The full trailing clause and its parameters.
    pub fn to_clause(&self, dialect: SqlDialect) -> (String, Vec<Value>) {
        let rendered = self.render(dialect);
        let clause = match rendered.constraint {
            Some(c) if rendered.tail.is_empty() => c,
            Some(c) => format!("{c} {}", rendered.tail),
            None => rendered.tail,
        };
        (clause, rendered.params)
    }
}
