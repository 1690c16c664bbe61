//! Driver abstraction
//!
//! The adapter never talks to SQL Server directly. It drives an ODBC-style
//! connection/cursor API through the traits in this module, which a concrete
//! binding (ceODBC-like, pyodbc-like, or a pure Rust ODBC wrapper) implements.
//!
//! The shape follows the classic DB-API cursor: `execute`/`executemany` send a
//! batch, `fetchmany`/`fetchall` read the current result set, and `nextset`
//! moves to the following one, consuming the current set as a side effect.
//!
//! # Implementing a driver
//!
//! No binding ships with this crate. An implementation must hold to the
//! following, which the identity and version handling rely on:
//!
//! - `execute` runs the whole text as one batch, so
//!   `INSERT ..; select scope_identity()` yields several result sets.
//! - After `execute` the cursor is positioned on the first result set.
//! - `fetchall`/`fetchmany` return `Err` when the current set has no columns
//!   (a DML row count), and `Ok(vec![])` when it has columns but no rows.
//! - `nextset` returns `Ok(false)` once the sets are exhausted. `Err` is only
//!   for a real failure; it is passed to the caller unchanged.
//! - `capabilities().supports_nextset` is `false` when `nextset` cannot be
//!   used, which switches the dialect to `@@identity`.
//! - `rowcount` is `-1` when the driver does not know it.
//! - Errors carry the SQLSTATE and native error number when the driver
//!   reports them (see [`DriverError::with_sqlstate`] and
//!   [`DriverError::with_native_error`]); they drive the mapping to Diesel
//!   error kinds.
//!
//! ```
//! use async_trait::async_trait;
//! use diesel_mssql_odbc::{
//!     ConnectArgs, Cursor, DialectConfig, DriverCapabilities, DriverConnection, DriverError,
//!     MssqlConnection, SqlRow, SqlValue,
//! };
//!
//! struct Offline;
//!
//! struct OfflineCursor {
//!     arraysize: usize,
//! }
//!
//! #[async_trait]
//! impl DriverConnection for Offline {
//!     type Cursor<'c> = OfflineCursor where Self: 'c;
//!
//!     async fn connect(_args: &ConnectArgs) -> Result<Self, DriverError> {
//!         Ok(Offline)
//!     }
//!
//!     fn capabilities(&self) -> DriverCapabilities {
//!         DriverCapabilities { supports_nextset: false }
//!     }
//!
//!     fn cursor(&mut self) -> Result<Self::Cursor<'_>, DriverError> {
//!         Ok(OfflineCursor { arraysize: 1 })
//!     }
//! }
//!
//! #[async_trait]
//! impl Cursor for OfflineCursor {
//!     fn arraysize(&self) -> usize {
//!         self.arraysize
//!     }
//!
//!     fn set_arraysize(&mut self, size: usize) {
//!         self.arraysize = size;
//!     }
//!
//!     async fn execute(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<(), DriverError> {
//!         Ok(())
//!     }
//!
//!     async fn executemany(&mut self, _sql: &str, _rows: Vec<SqlRow>) -> Result<(), DriverError> {
//!         Ok(())
//!     }
//!
//!     fn description(&self) -> Option<Vec<String>> {
//!         None
//!     }
//!
//!     fn rowcount(&self) -> i64 {
//!         -1
//!     }
//!
//!     async fn fetchmany(&mut self, _size: usize) -> Result<Vec<SqlRow>, DriverError> {
//!         self.fetchall().await
//!     }
//!
//!     async fn fetchall(&mut self) -> Result<Vec<SqlRow>, DriverError> {
//!         Err(DriverError::new("No results.  Previous SQL was not a query.").with_sqlstate("24000"))
//!     }
//!
//!     async fn nextset(&mut self) -> Result<bool, DriverError> {
//!         Ok(false)
//!     }
//! }
//!
//! let conn = MssqlConnection::from_driver(Offline, DialectConfig::default());
//! assert!(!conn.dialect().use_scope_identity());
//! ```

use async_trait::async_trait;

use crate::error::DriverError;

#[cfg(test)]
pub(crate) mod mock;

/// A single cell or parameter value as understood by the driver
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Any exact integer type (BIT, TINYINT .. BIGINT)
    Integer(i64),
    /// REAL / FLOAT
    Double(f64),
    /// Character data, also used for DECIMAL/NUMERIC as returned by most drivers
    Text(String),
    /// VARBINARY / IMAGE
    Binary(Vec<u8>),
}

impl SqlValue {
    /// Check if the value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Binary(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One fetched row
pub type SqlRow = Vec<SqlValue>;

/// What the loaded driver is able to do
///
/// Reported once per connection and used by the dialect to narrow its own
/// capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCapabilities {
    /// The cursor can advance to the next result set of a multi-statement batch
    pub supports_nextset: bool,
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self {
            supports_nextset: true,
        }
    }
}

/// Arguments handed to [`DriverConnection::connect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectArgs {
    /// Full ODBC connection string, `;` separated
    pub connection_string: String,
    /// Open the connection in autocommit mode
    pub autocommit: bool,
}

/// A connection handle owned by the driver
#[async_trait]
pub trait DriverConnection: Send + Sized {
    /// Cursor type, borrowing the connection for its lifetime
    type Cursor<'c>: Cursor
    where
        Self: 'c;

    /// Open a new connection
    async fn connect(args: &ConnectArgs) -> Result<Self, DriverError>;

    /// Capabilities of the underlying driver
    fn capabilities(&self) -> DriverCapabilities;

    /// Open a new cursor on this connection
    fn cursor(&mut self) -> Result<Self::Cursor<'_>, DriverError>;
}

/// A cursor over one statement batch and its result sets
#[async_trait]
pub trait Cursor: Send {
    /// Number of rows `fetchmany` reads per call by default
    fn arraysize(&self) -> usize;

    /// Change the number of rows `fetchmany` reads per call
    fn set_arraysize(&mut self, size: usize);

    /// Execute one statement (or statement batch) with a single parameter row
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<(), DriverError>;

    /// Execute one statement once per parameter row
    ///
    /// The rows are a materialised sequence; the driver may iterate them more
    /// than once (for example to infer parameter types).
    async fn executemany(&mut self, sql: &str, rows: Vec<SqlRow>) -> Result<(), DriverError>;

    /// Column names of the current result set, `None` if it has no columns
    fn description(&self) -> Option<Vec<String>>;

    /// Rows affected by the last execution, `-1` when unknown
    fn rowcount(&self) -> i64;

    /// Fetch up to `size` rows from the current result set
    async fn fetchmany(&mut self, size: usize) -> Result<Vec<SqlRow>, DriverError>;

    /// Fetch all remaining rows of the current result set
    ///
    /// Drivers raise an error when the current set produced no columns at all
    /// (for instance the row count of an INSERT).
    async fn fetchall(&mut self) -> Result<Vec<SqlRow>, DriverError>;

    /// Skip to the next result set, returning `false` when there is none
    async fn nextset(&mut self) -> Result<bool, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_from_option() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("a")), SqlValue::Text("a".into()));
    }

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::Integer(0).is_null());
    }

    #[test]
    fn test_default_capabilities_support_nextset() {
        assert!(DriverCapabilities::default().supports_nextset);
    }
}
