//! SQL type implementations for the SQL Server backend
//!
//! This module provides type mappings between Diesel SQL types and SQL Server
//! types. Date and time values travel as text in the server's ISO formats.

use diesel::{
    deserialize::{self, FromSql},
    serialize::{self, IsNull, Output, ToSql},
    sql_types::{self, HasSqlType},
};

use crate::{
    backend::{MssqlBackend, MssqlType},
    driver::SqlValue,
    value::MssqlValue,
};

// BIT
impl HasSqlType<sql_types::Bool> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::Bit
    }
}

impl FromSql<sql_types::Bool, MssqlBackend> for bool {
    fn from_sql(value: MssqlValue<'_>) -> deserialize::Result<Self> {
        match value.read_integer()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(format!("invalid BIT value {}", other).into()),
        }
    }
}

impl ToSql<sql_types::Bool, MssqlBackend> for bool {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, MssqlBackend>) -> serialize::Result {
        out.set_value(SqlValue::Integer(if *self { 1 } else { 0 }));
        Ok(IsNull::No)
    }
}

// SMALLINT
impl HasSqlType<sql_types::SmallInt> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::SmallInt
    }
}

impl FromSql<sql_types::SmallInt, MssqlBackend> for i16 {
    fn from_sql(value: MssqlValue<'_>) -> deserialize::Result<Self> {
        Ok(i16::try_from(value.read_integer()?)?)
    }
}

impl ToSql<sql_types::SmallInt, MssqlBackend> for i16 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, MssqlBackend>) -> serialize::Result {
        out.set_value(SqlValue::Integer(*self as i64));
        Ok(IsNull::No)
    }
}

// INT
impl HasSqlType<sql_types::Integer> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::Int
    }
}

impl FromSql<sql_types::Integer, MssqlBackend> for i32 {
    fn from_sql(value: MssqlValue<'_>) -> deserialize::Result<Self> {
        Ok(i32::try_from(value.read_integer()?)?)
    }
}

impl ToSql<sql_types::Integer, MssqlBackend> for i32 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, MssqlBackend>) -> serialize::Result {
        out.set_value(SqlValue::Integer(*self as i64));
        Ok(IsNull::No)
    }
}

// BIGINT
impl HasSqlType<sql_types::BigInt> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::BigInt
    }
}

impl FromSql<sql_types::BigInt, MssqlBackend> for i64 {
    fn from_sql(value: MssqlValue<'_>) -> deserialize::Result<Self> {
        value.read_integer()
    }
}

impl ToSql<sql_types::BigInt, MssqlBackend> for i64 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, MssqlBackend>) -> serialize::Result {
        out.set_value(SqlValue::Integer(*self));
        Ok(IsNull::No)
    }
}

// REAL
impl HasSqlType<sql_types::Float> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::Real
    }
}

impl FromSql<sql_types::Float, MssqlBackend> for f32 {
    fn from_sql(value: MssqlValue<'_>) -> deserialize::Result<Self> {
        Ok(value.read_double()? as f32)
    }
}

impl ToSql<sql_types::Float, MssqlBackend> for f32 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, MssqlBackend>) -> serialize::Result {
        out.set_value(SqlValue::Double(*self as f64));
        Ok(IsNull::No)
    }
}

// FLOAT
impl HasSqlType<sql_types::Double> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::Float
    }
}

impl FromSql<sql_types::Double, MssqlBackend> for f64 {
    fn from_sql(value: MssqlValue<'_>) -> deserialize::Result<Self> {
        value.read_double()
    }
}

impl ToSql<sql_types::Double, MssqlBackend> for f64 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, MssqlBackend>) -> serialize::Result {
        out.set_value(SqlValue::Double(*self));
        Ok(IsNull::No)
    }
}

// NVARCHAR
impl HasSqlType<sql_types::Text> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::NVarChar
    }
}

impl FromSql<sql_types::Text, MssqlBackend> for String {
    fn from_sql(value: MssqlValue<'_>) -> deserialize::Result<Self> {
        Ok(value.read_text()?.to_string())
    }
}

impl ToSql<sql_types::Text, MssqlBackend> for str {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, MssqlBackend>) -> serialize::Result {
        out.set_value(SqlValue::Text(self.to_string()));
        Ok(IsNull::No)
    }
}

// VARBINARY
impl HasSqlType<sql_types::Binary> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::VarBinary
    }
}

impl FromSql<sql_types::Binary, MssqlBackend> for Vec<u8> {
    fn from_sql(value: MssqlValue<'_>) -> deserialize::Result<Self> {
        Ok(value.read_blob()?.to_vec())
    }
}

impl ToSql<sql_types::Binary, MssqlBackend> for [u8] {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, MssqlBackend>) -> serialize::Result {
        out.set_value(SqlValue::Binary(self.to_vec()));
        Ok(IsNull::No)
    }
}

// Date and time
impl HasSqlType<sql_types::Date> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::Date
    }
}

impl HasSqlType<sql_types::Time> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::Time
    }
}

impl HasSqlType<sql_types::Timestamp> for MssqlBackend {
    fn metadata(_lookup: &mut ()) -> MssqlType {
        MssqlType::DateTime2
    }
}
