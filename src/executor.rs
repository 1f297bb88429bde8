//! Statement execution surface consumed by the SQL pouch.
//!
//! An [`Executor`] runs finished statements against a live connection,
//! transaction, or test double. The pouch never manages connections itself:
//! pooling, timeouts and cancellation belong to whatever sits behind the
//! executor.
//!
//! With the `postgres` feature enabled, [`MayPostgresExecutor`] wraps a
//! `may_postgres::Client`.

use crate::error::{PouchError, Result};
use crate::value::{Field, Value};
use std::sync::Arc;

/// Outcome of a mutating statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Identifier generated by the statement, when the backend reports one
    pub last_insert_id: Option<Value>,
}

/// One result row: column names and values in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// A row without column names, as test doubles usually build them.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            columns: Vec::new(),
            values: values.into_iter().collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.values.get(idx)
    }

    /// Copy the row's values into `targets`, positionally. The number of
    /// targets must match the number of columns.
    pub fn scan(&self, targets: &mut [&mut dyn Field]) -> Result<()> {
        if targets.len() != self.values.len() {
            return Err(PouchError::contract(format!(
                "expected {} destination arguments in scan, not {}",
                self.values.len(),
                targets.len()
            )));
        }
        for (target, value) in targets.iter_mut().zip(&self.values) {
            target.assign(value.clone())?;
        }
        Ok(())
    }
}

/// Runs SQL statements with positional parameters.
///
/// Statements reach the executor already finalized for its dialect.
pub trait Executor {
    /// Execute a mutating statement.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    /// Run a query and collect every row.
    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a query expected to produce a row. Zero rows is
    /// [`PouchError::NotFound`]; extra rows are ignored.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row> {
        self.query_all(sql, params)?
            .into_iter()
            .next()
            .ok_or_else(|| PouchError::NotFound("no rows in result set".to_string()))
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        (**self).execute(sql, params)
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query_all(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row> {
        (**self).query_one(sql, params)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        (**self).execute(sql, params)
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query_all(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row> {
        (**self).query_one(sql, params)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        (**self).execute(sql, params)
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query_all(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row> {
        (**self).query_one(sql, params)
    }
}

#[cfg(feature = "postgres")]
pub use self::postgres::MayPostgresExecutor;

#[cfg(feature = "postgres")]
mod postgres {
    use super::{ExecResult, Executor, Row};
    use crate::error::{PouchError, Result};
    use crate::value::Value;
    use may_postgres::types::{ToSql, Type};
    use may_postgres::Client;

    #[cfg(feature = "metrics")]
    use crate::metrics::METRICS;
    #[cfg(feature = "tracing")]
    use crate::metrics::tracing_helpers;
    #[cfg(feature = "metrics")]
    use std::time::Instant;

    static NULL_PARAM: Option<i32> = None;

    /// Borrow each value as a driver parameter. `Value::Bool`, `Int`,
    /// `Float`, `Text` and `Bytes` bind as `bool`, `int8`, `float8`, `text`
    /// and `bytea`. `Value::Null` binds as a NULL `int4`, which the server
    /// only accepts for integer columns.
    fn to_params(values: &[Value]) -> Vec<&dyn ToSql> {
        values
            .iter()
            .map(|v| match v {
                Value::Null => &NULL_PARAM as &dyn ToSql,
                Value::Bool(b) => b as &dyn ToSql,
                Value::Int(i) => i as &dyn ToSql,
                Value::Float(x) => x as &dyn ToSql,
                Value::Text(s) => s as &dyn ToSql,
                Value::Bytes(b) => b as &dyn ToSql,
            })
            .collect()
    }

    fn read_column(row: &may_postgres::Row, idx: usize, ty: &Type) -> Result<Value> {
        let value = if *ty == Type::BOOL {
            row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(idx)?.map(|v| Value::Int(i64::from(v)))
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(idx)?.map(|v| Value::Int(i64::from(v)))
        } else if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(idx)?.map(Value::Int)
        } else if *ty == Type::FLOAT4 {
            row.try_get::<_, Option<f32>>(idx)?.map(|v| Value::Float(f64::from(v)))
        } else if *ty == Type::FLOAT8 {
            row.try_get::<_, Option<f64>>(idx)?.map(Value::Float)
        } else if *ty == Type::BYTEA {
            row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Bytes)
        } else {
            row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
        };
        Ok(value.unwrap_or(Value::Null))
    }

    fn to_row(row: &may_postgres::Row) -> Result<Row> {
        let mut columns = Vec::with_capacity(row.columns().len());
        let mut values = Vec::with_capacity(row.columns().len());
        for (idx, column) in row.columns().iter().enumerate() {
            columns.push(column.name().to_string());
            values.push(read_column(row, idx, column.type_())?);
        }
        Ok(Row::new(columns, values))
    }

    /// `lastval()` fails this way when the insert touched no sequence.
    fn no_sequence_used(message: &str) -> bool {
        message.contains("lastval is not yet defined")
    }

    fn is_insert(sql: &str) -> bool {
        sql.trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
    }

    /// [`Executor`] over a `may_postgres::Client`.
    ///
    /// After an `INSERT` the generated key is read back with
    /// `SELECT lastval()`; tables without a sequence report no identifier.
    pub struct MayPostgresExecutor {
        client: Client,
    }

    impl MayPostgresExecutor {
        pub fn new(client: Client) -> Self {
            Self { client }
        }

        pub fn client(&self) -> &Client {
            &self.client
        }

        pub fn into_client(self) -> Client {
            self.client
        }

        fn observe<T>(&self, sql: &str, run: impl FnOnce() -> Result<T>) -> Result<T> {
            #[cfg(feature = "tracing")]
            let _span = tracing_helpers::execute_statement_span(sql).entered();
            log::debug!("postgres: {sql}");

            #[cfg(feature = "metrics")]
            let start = Instant::now();
            let result = run();
            #[cfg(feature = "metrics")]
            METRICS.record("sql", "statement", start.elapsed(), result.is_ok());
            result
        }

        fn last_insert_id(&self) -> Option<Value> {
            match self.client.query_one("SELECT lastval()", &[]) {
                Ok(row) => match row.try_get::<_, i64>(0) {
                    Ok(id) => Some(Value::Int(id)),
                    Err(e) => {
                        log::warn!("postgres: unreadable generated key: {e}");
                        None
                    }
                },
                Err(e) => {
                    let message = e.to_string();
                    if no_sequence_used(&message) {
                        log::debug!("postgres: no generated key available: {message}");
                    } else {
                        log::warn!("postgres: reading generated key failed: {message}");
                    }
                    None
                }
            }
        }
    }

    impl Executor for MayPostgresExecutor {
        fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
            self.observe(sql, || {
                let params = to_params(params);
                let rows_affected = self.client.execute(sql, &params).map_err(PouchError::from)?;
                let last_insert_id = if is_insert(sql) {
                    self.last_insert_id()
                } else {
                    None
                };
                Ok(ExecResult {
                    rows_affected,
                    last_insert_id,
                })
            })
        }

        fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
            self.observe(sql, || {
                let params = to_params(params);
                let rows = self.client.query(sql, &params)?;
                rows.iter().map(to_row).collect()
            })
        }
    }

}
