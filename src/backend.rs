//! SQL Server backend for Diesel
//!
//! This module provides the backend definition used by [`crate::MssqlConnection`].

use diesel::{
    backend::{
        sql_dialect::{self, returning_clause::DoesNotSupportReturningClause},
        Backend, DieselReserveSpecialization, SqlDialect, TrustedBackend,
    },
    sql_types::TypeMetadata,
};

use crate::{
    bind_collector::MssqlBindCollector,
    query_builder::{MssqlQueryBuilder, MssqlSelectStatement},
    value::MssqlValue,
};

/// The SQL Server backend for Diesel
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Default)]
pub struct MssqlBackend;

/// SQL Server parameter types
///
/// These decide how a bind value is described to the ODBC driver.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum MssqlType {
    /// BIT
    Bit,
    /// SMALLINT
    SmallInt,
    /// INT
    Int,
    /// BIGINT
    BigInt,
    /// REAL
    Real,
    /// FLOAT
    Float,
    /// NVARCHAR
    NVarChar,
    /// VARBINARY
    VarBinary,
    /// DATE
    Date,
    /// TIME
    Time,
    /// DATETIME2
    DateTime2,
}

impl Backend for MssqlBackend {
    type QueryBuilder = MssqlQueryBuilder;
    type RawValue<'a> = MssqlValue<'a>;
    type BindCollector<'a> = MssqlBindCollector;
}

impl TypeMetadata for MssqlBackend {
    type TypeMetadata = MssqlType;
    type MetadataLookup = ();
}

impl SqlDialect for MssqlBackend {
    type ReturningClause = DoesNotSupportReturningClause;
    type OnConflictClause = sql_dialect::on_conflict_clause::DoesNotSupportOnConflictClause;
    type InsertWithDefaultKeyword = sql_dialect::default_keyword_for_insert::IsoSqlDefaultKeyword;
    type BatchInsertSupport = sql_dialect::batch_insert_support::PostgresLikeBatchInsertSupport;
    type ConcatClause = MssqlConcatClause;
    type DefaultValueClauseForInsert = sql_dialect::default_value_clause::AnsiDefaultValueClause;
    type EmptyFromClauseSyntax = sql_dialect::from_clause_syntax::AnsiSqlFromClauseSyntax;
    type SelectStatementSyntax = MssqlSelectStatement;
    type ExistsSyntax = sql_dialect::exists_syntax::AnsiSqlExistsSyntax;
    type ArrayComparison = sql_dialect::array_comparison::AnsiSqlArrayComparison;
    type AliasSyntax = sql_dialect::alias_syntax::AsAliasSyntax;
}

impl DieselReserveSpecialization for MssqlBackend {}
impl TrustedBackend for MssqlBackend {}

/// SQL Server concatenates with `+`, so `||` is never rendered for this backend
#[derive(Debug, Copy, Clone)]
pub struct MssqlConcatClause;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mssql_type_equality() {
        assert_eq!(MssqlType::Int, MssqlType::Int);
        assert_ne!(MssqlType::Int, MssqlType::BigInt);
    }

    #[test]
    fn test_mssql_backend_default() {
        let _backend = MssqlBackend::default();
    }

    #[test]
    fn test_mssql_type_debug() {
        assert_eq!(format!("{:?}", MssqlType::NVarChar), "NVarChar");
    }
}
