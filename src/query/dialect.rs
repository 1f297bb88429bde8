//! SQL dialect differences: placeholders and pagination.

use serde::Deserialize;

/// Target SQL dialect.
///
/// Statements are always assembled with `?` placeholders; [`finalize`]
/// rewrites them for dialects that number their parameters.
///
/// [`finalize`]: SqlDialect::finalize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// `?` placeholders, `LIMIT <offset>, <limit>`
    #[default]
    MySql,
    /// `$n` placeholders, `LIMIT <limit> OFFSET <offset>`
    Postgres,
}

impl SqlDialect {
    /// Pagination clause, or `None` when `limit` is 0 (unlimited).
    pub fn limit_clause(&self, limit: u64, offset: u64) -> Option<String> {
        if limit == 0 {
            return None;
        }
        Some(match (self, offset) {
            (_, 0) => format!("LIMIT {limit}"),
            (SqlDialect::MySql, off) => format!("LIMIT {off}, {limit}"),
            (SqlDialect::Postgres, off) => format!("LIMIT {limit} OFFSET {off}"),
        })
    }

    /// Rewrite `?` placeholders into the dialect's native form. Quoted
    /// literals and identifiers are left alone.
    pub fn finalize(&self, sql: &str) -> String {
        match self {
            SqlDialect::MySql => sql.to_string(),
            SqlDialect::Postgres => number_placeholders(sql),
        }
    }
}

fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut n = 0;
    for ch in sql.chars() {
        match (quote, ch) {
            (None, '\'' | '"') => {
                quote = Some(ch);
                out.push(ch);
            }
            (Some(q), c) if c == q => {
                quote = None;
                out.push(ch);
            }
            (None, '?') => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}
