//! Bind collector for the SQL Server backend
//!
//! Bind values are collected straight into [`SqlValue`]s, the same type the
//! driver takes as parameters.

use diesel::{
    query_builder::BindCollector,
    serialize::{IsNull, Output},
    sql_types::HasSqlType,
};

use crate::{
    backend::{MssqlBackend, MssqlType},
    driver::SqlValue,
};

/// Collected bind values for a query
#[derive(Debug, Default, Clone)]
pub struct MssqlBindCollector {
    /// The collected bind values with their types
    pub binds: Vec<(SqlValue, MssqlType)>,
}

impl MssqlBindCollector {
    /// The parameter row handed to the driver
    pub fn into_params(self) -> Vec<SqlValue> {
        self.binds.into_iter().map(|(value, _)| value).collect()
    }
}

impl<'bind> BindCollector<'bind, MssqlBackend> for MssqlBindCollector {
    type Buffer = SqlValue;

    fn push_bound_value<T, U>(
        &mut self,
        bind: &'bind U,
        metadata_lookup: &mut <MssqlBackend as diesel::sql_types::TypeMetadata>::MetadataLookup,
    ) -> diesel::QueryResult<()>
    where
        MssqlBackend: diesel::backend::Backend + HasSqlType<T>,
        U: diesel::serialize::ToSql<T, MssqlBackend> + ?Sized + 'bind,
    {
        let mut to_sql_output = Output::new(SqlValue::Null, metadata_lookup);
        let is_null = bind
            .to_sql(&mut to_sql_output)
            .map_err(diesel::result::Error::SerializationError)?;

        let bind = if matches!(is_null, IsNull::No) {
            to_sql_output.into_inner()
        } else {
            SqlValue::Null
        };

        let metadata = <MssqlBackend as HasSqlType<T>>::metadata(metadata_lookup);
        self.binds.push((bind, metadata));
        Ok(())
    }
}
