//! The SQL Server query builder
//!
//! This module provides the query builder implementation for the SQL Server
//! backend: `?` placeholders for the ODBC driver and `[bracket]` quoting.

use super::backend::MssqlBackend;
use crate::dialect::ParamStyle;
use diesel::query_builder::QueryBuilder;
use diesel::result::QueryResult;

mod limit_offset;
mod select_statement;

pub use self::select_statement::MssqlSelectStatement;

/// Constructs SQL queries for use with the SQL Server backend
#[derive(Default)]
pub struct MssqlQueryBuilder {
    /// The SQL string being built
    pub(crate) sql: String,
    /// Placeholder pushed for every bind
    pub(crate) param_style: ParamStyle,
}

impl MssqlQueryBuilder {
    /// Construct a new query builder with an empty query
    pub fn new() -> Self {
        MssqlQueryBuilder::default()
    }

    /// Construct an empty query builder for the given placeholder style
    pub fn with_param_style(param_style: ParamStyle) -> Self {
        MssqlQueryBuilder {
            sql: String::new(),
            param_style,
        }
    }

    /// Get the current SQL string
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl QueryBuilder<MssqlBackend> for MssqlQueryBuilder {
    fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn push_identifier(&mut self, identifier: &str) -> QueryResult<()> {
        self.push_sql(&quote_identifier(identifier));
        Ok(())
    }

    fn push_bind_param(&mut self) {
        let placeholder = self.param_style.placeholder();
        self.push_sql(placeholder);
    }

    fn finish(self) -> String {
        self.sql
    }
}

/// Quote one identifier, doubling any closing bracket
pub(crate) fn quote_identifier(identifier: &str) -> String {
    format!("[{}]", identifier.replace(']', "]]"))
}

/// Quote a possibly schema qualified name part by part
pub(crate) fn quote_table_name(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}
