//! SQL pouch.
//!
//! Builds one parameterized statement per entity operation and runs it
//! through an [`Executor`]. Identifying values bind before criteria values;
//! on insert the generated key is written back through
//! [`Insertable::set_identifier`](crate::Insertable::set_identifier).
//!
//! Bulk operations are fail-fast: they stop at the first failing entity and
//! do not undo the ones already applied. Wrap the executor in a transaction
//! if all-or-nothing matters.

use crate::backend::bulk::{fail_fast, require_items};
use crate::entity::{
    identity_of, insertable_of, require_table, Createable, Deleteable, Findable, Gettable, Insertable, Tableable,
    Updateable,
};
use crate::error::{PouchError, Result};
use crate::executor::Executor;
use crate::metrics::instrument;
use crate::query::{Criteria, SqlDialect};
use crate::storage::{Pouch, Query, Storage};
use crate::value::Value;

const BACKEND: &str = "sql";

/// A finished statement and its parameters, in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn equalities(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("{name} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn column_names(entity: &mut dyn Findable) -> Result<Vec<String>> {
    let (cols, fields) = entity.all_fields();
    if cols.is_empty() || fields.is_empty() {
        return Err(PouchError::contract("must provide columns to select from"));
    }
    if cols.len() != fields.len() {
        return Err(PouchError::contract(format!(
            "gettable fields: {} names but {} targets",
            cols.len(),
            fields.len()
        )));
    }
    Ok(cols.into_iter().map(str::to_string).collect())
}

/// `SELECT` of every gettable column, narrowed by identity then criteria.
pub fn select_statement(entity: &mut dyn Findable, criteria: &Criteria, dialect: SqlDialect) -> Result<Statement> {
    let table = entity.table().to_string();
    require_table(&table)?;
    let cols = column_names(entity)?;
    let (ids, mut params) = identity_of(&*entity)?;

    let rendered = criteria.render(dialect);
    let mut sql = format!("SELECT {} FROM {table} WHERE {}", cols.join(", "), equalities(&ids));
    if let Some(constraint) = &rendered.constraint {
        sql.push_str(" AND ");
        sql.push_str(constraint);
    }
    if !rendered.tail.is_empty() {
        sql.push(' ');
        sql.push_str(&rendered.tail);
    }
    params.extend(rendered.params);
    Ok(Statement {
        sql: dialect.finalize(&sql),
        params,
    })
}

pub fn insert_statement(entity: &dyn Createable, dialect: SqlDialect) -> Result<Statement> {
    let table = entity.table();
    require_table(table)?;
    let (cols, params) = insertable_of(entity)?;
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        cols.join(", "),
        placeholders(cols.len())
    );
    Ok(Statement {
        sql: dialect.finalize(&sql),
        params,
    })
}

/// `UPDATE` of the insertable columns; values bind before identity.
pub fn update_statement(entity: &dyn Updateable, dialect: SqlDialect) -> Result<Statement> {
    let table = entity.table();
    require_table(table)?;
    let (cols, mut params) = insertable_of(entity)?;
    let (ids, id_values) = identity_of(entity)?;
    let assignments = cols
        .iter()
        .map(|col| format!("{col} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {table} SET {assignments} WHERE {}", equalities(&ids));
    params.extend(id_values);
    Ok(Statement {
        sql: dialect.finalize(&sql),
        params,
    })
}

pub fn delete_statement(entity: &dyn Deleteable, dialect: SqlDialect) -> Result<Statement> {
    let table = entity.table();
    require_table(table)?;
    let (ids, params) = identity_of(entity)?;
    let sql = format!("DELETE FROM {table} WHERE {}", equalities(&ids));
    Ok(Statement {
        sql: dialect.finalize(&sql),
        params,
    })
}

/// Listing `SELECT`: no identity filter, criteria only.
pub fn listing_statement(
    table: &str,
    cols: &[String],
    criteria: &Criteria,
    dialect: SqlDialect,
) -> Result<Statement> {
    require_table(table)?;
    if cols.is_empty() {
        return Err(PouchError::contract("must provide columns to select from"));
    }
    let rendered = criteria.render(dialect);
    let mut sql = format!("SELECT {} FROM {table}", cols.join(", "));
    if let Some(constraint) = &rendered.constraint {
        sql.push_str(" WHERE ");
        sql.push_str(constraint);
    }
    if !rendered.tail.is_empty() {
        sql.push(' ');
        sql.push_str(&rendered.tail);
    }
    Ok(Statement {
        sql: dialect.finalize(&sql),
        params: rendered.params,
    })
}

/// Pouch over any SQL [`Executor`].
pub struct SqlPouch<E> {
    executor: E,
    dialect: SqlDialect,
}

impl<E: Executor> SqlPouch<E> {
    /// A MySQL-dialect pouch.
    pub fn new(executor: E) -> Self {
        Self::with_dialect(executor, SqlDialect::MySql)
    }

    pub fn with_dialect(executor: E, dialect: SqlDialect) -> Self {
        Self { executor, dialect }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    fn find_with(&self, entity: &mut dyn Findable, criteria: &Criteria) -> Result<()> {
        let stmt = select_statement(entity, criteria, self.dialect)?;
        log::debug!("sql: {}", stmt.sql);
        let row = self.executor.query_one(&stmt.sql, &stmt.params)?;
        let (_, mut fields) = entity.all_fields();
        row.scan(&mut fields)
    }

    fn find_all_with(&self, entities: &mut [&mut dyn Findable], criteria: &Criteria) -> Result<()> {
        require_items(entities.len(), "find")?;
        fail_fast(entities.iter_mut(), |entity| self.find_with(&mut **entity, criteria))
    }

    fn create_one(&self, entity: &mut dyn Createable) -> Result<()> {
        let stmt = insert_statement(entity, self.dialect)?;
        log::debug!("sql: {}", stmt.sql);
        let res = self.executor.execute(&stmt.sql, &stmt.params)?;
        match res.last_insert_id {
            Some(id) => entity.set_identifier(id),
            None => {
                log::debug!("sql: insert into {} reported no generated identifier", entity.table());
                Ok(())
            }
        }
    }

    fn create_all_inner(&self, entities: &mut [&mut dyn Createable]) -> Result<()> {
        require_items(entities.len(), "insert")?;
        fail_fast(entities.iter_mut(), |entity| self.create_one(&mut **entity))
    }

    fn update_one(&self, entity: &dyn Updateable) -> Result<()> {
        let stmt = update_statement(entity, self.dialect)?;
        log::debug!("sql: {}", stmt.sql);
        self.executor.execute(&stmt.sql, &stmt.params)?;
        Ok(())
    }

    fn update_all_inner(&self, entities: &[&dyn Updateable]) -> Result<()> {
        require_items(entities.len(), "update")?;
        fail_fast(entities.iter().copied(), |entity| self.update_one(entity))
    }

    fn delete_one(&self, entity: &dyn Deleteable) -> Result<()> {
        let stmt = delete_statement(entity, self.dialect)?;
        log::debug!("sql: {}", stmt.sql);
        self.executor.execute(&stmt.sql, &stmt.params)?;
        Ok(())
    }

    fn delete_all_inner(&self, entities: &[&dyn Deleteable]) -> Result<()> {
        require_items(entities.len(), "delete")?;
        fail_fast(entities.iter().copied(), |entity| self.delete_one(entity))
    }

    fn find_entities_with(
        &self,
        template: &dyn Findable,
        into: &mut Vec<Box<dyn Findable>>,
        criteria: &Criteria,
    ) -> Result<()> {
        let mut probe = template.findable_copy();
        let cols = column_names(&mut *probe)?;
        let stmt = listing_statement(template.table(), &cols, criteria, self.dialect)?;
        log::debug!("sql: {}", stmt.sql);

        let col_refs: Vec<&str> = cols.iter().map(String::as_str).collect();
        for row in self.executor.query_all(&stmt.sql, &stmt.params)? {
            let mut copy = template.findable_copy();
            {
                let mut fields = copy.fields_for(&col_refs);
                if fields.len() != col_refs.len() {
                    return Err(PouchError::contract(format!(
                        "entity copy exposes {} of {} selected columns",
                        fields.len(),
                        col_refs.len()
                    )));
                }
                row.scan(&mut fields)?;
            }
            into.push(copy);
        }
        Ok(())
    }
}

impl<E: Executor> Storage for SqlPouch<E> {
    fn find(&self, entity: &mut dyn Findable) -> Result<()> {
        instrument(BACKEND, "Find", || self.find_with(entity, &Criteria::default()))
    }

    fn find_all(&self, entities: &mut [&mut dyn Findable]) -> Result<()> {
        instrument(BACKEND, "FindAll", || self.find_all_with(entities, &Criteria::default()))
    }

    fn create(&self, entity: &mut dyn Createable) -> Result<()> {
        instrument(BACKEND, "Create", || self.create_one(entity))
    }

    fn create_all(&self, entities: &mut [&mut dyn Createable]) -> Result<()> {
        instrument(BACKEND, "CreateAll", || self.create_all_inner(entities))
    }

    fn update(&self, entity: &dyn Updateable) -> Result<()> {
        instrument(BACKEND, "Update", || self.update_one(entity))
    }

    fn update_all(&self, entities: &[&dyn Updateable]) -> Result<()> {
        instrument(BACKEND, "UpdateAll", || self.update_all_inner(entities))
    }

    fn delete(&self, entity: &dyn Deleteable) -> Result<()> {
        instrument(BACKEND, "Delete", || self.delete_one(entity))
    }

    fn delete_all(&self, entities: &[&dyn Deleteable]) -> Result<()> {
        instrument(BACKEND, "DeleteAll", || self.delete_all_inner(entities))
    }
}

impl<E: Executor> Pouch for SqlPouch<E> {
    type Query<'p>
        = SqlQuery<'p, E>
    where
        Self: 'p;

    fn query(&self) -> SqlQuery<'_, E> {
        SqlQuery {
            pouch: self,
            criteria: Criteria::new(),
        }
    }
}

/// Criteria-narrowed view of a [`SqlPouch`].
///
/// Criteria apply to `find`, `find_all` and `find_entities`; writes ignore
/// them.
pub struct SqlQuery<'p, E> {
    pouch: &'p SqlPouch<E>,
    criteria: Criteria,
}

impl<E: Executor> Storage for SqlQuery<'_, E> {
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

impl<E: Executor> Query for SqlQuery<'_, E> {
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
