//! Row type for the SQL Server backend
//!
//! Rows are fetched from the cursor in batches of the cursor's array size and
//! handed to Diesel one at a time. Column names are shared by every row of a
//! result set.

use std::sync::Arc;

use diesel::row::{Field, PartialRow, Row, RowIndex, RowSealed};

use crate::{
    backend::MssqlBackend,
    driver::{SqlRow, SqlValue},
    value::MssqlValue,
};

/// A row from a SQL Server result set
#[derive(Debug, Clone)]
pub struct MssqlRow {
    values: SqlRow,
    columns: Arc<[String]>,
}

impl MssqlRow {
    /// Create a new row from the fetched values and the result set's columns
    pub fn new(values: SqlRow, columns: Arc<[String]>) -> Self {
        Self { values, columns }
    }
}

impl RowSealed for MssqlRow {}

impl<'stmt> Row<'stmt, MssqlBackend> for MssqlRow {
    type Field<'f> = MssqlField<'f> where 'stmt: 'f, Self: 'f;
    type InnerPartialRow = Self;

    fn field_count(&self) -> usize {
        self.values.len()
    }

    fn get<'b, I>(&'b self, idx: I) -> Option<Self::Field<'b>>
    where
        'stmt: 'b,
        Self: RowIndex<I>,
    {
        let index = self.idx(idx)?;
        Some(MssqlField {
            name: self.columns.get(index).map(String::as_str),
            value: self.values.get(index)?,
        })
    }

    fn partial_row(&self, range: std::ops::Range<usize>) -> PartialRow<'_, Self::InnerPartialRow> {
        PartialRow::new(self, range)
    }
}

impl RowIndex<usize> for MssqlRow {
    fn idx(&self, idx: usize) -> Option<usize> {
        if idx < self.values.len() {
            Some(idx)
        } else {
            None
        }
    }
}

impl<'a> RowIndex<&'a str> for MssqlRow {
    fn idx(&self, field: &'a str) -> Option<usize> {
        self.columns.iter().position(|name| name == field)
    }
}

/// A field from a SQL Server row
#[derive(Debug)]
pub struct MssqlField<'stmt> {
    name: Option<&'stmt str>,
    value: &'stmt SqlValue,
}

impl<'stmt> Field<'stmt, MssqlBackend> for MssqlField<'stmt> {
    fn field_name(&self) -> Option<&str> {
        self.name
    }

    fn value(&self) -> Option<MssqlValue<'_>> {
        if self.value.is_null() {
            None
        } else {
            Some(MssqlValue::new(self.value))
        }
    }
}
