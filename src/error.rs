//! Error types for the SQL Server adapter
//!
//! [`DriverError`] is what the driver raises; [`Error`] is everything the
//! adapter itself can fail with. Both end up as [`diesel::result::Error`]
//! when they cross into Diesel.

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};

/// An error raised by the ODBC driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    /// The diagnostic message
    pub(crate) message: String,
    /// Five character SQLSTATE, if the driver reported one
    pub(crate) sqlstate: Option<String>,
    /// SQL Server native error number
    pub(crate) native_error: Option<i32>,
}

impl DriverError {
    /// Create a new driver error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sqlstate: None,
            native_error: None,
        }
    }

    /// Attach the SQLSTATE reported with the diagnostic record
    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }

    /// Attach the server's native error number
    pub fn with_native_error(mut self, code: i32) -> Self {
        self.native_error = Some(code);
        self
    }

    pub fn sqlstate(&self) -> Option<&str> {
        self.sqlstate.as_deref()
    }

    pub fn native_error(&self) -> Option<i32> {
        self.native_error
    }

    /// Map the native error number onto Diesel's error kinds
    pub fn kind(&self) -> DatabaseErrorKind {
        match self.native_error {
            Some(2627) | Some(2601) => DatabaseErrorKind::UniqueViolation,
            Some(547) => DatabaseErrorKind::ForeignKeyViolation,
            Some(515) => DatabaseErrorKind::NotNullViolation,
            Some(1205) => DatabaseErrorKind::SerializationFailure,
            _ => DatabaseErrorKind::Unknown,
        }
    }
}

impl DatabaseErrorInformation for DriverError {
    fn message(&self) -> &str {
        &self.message
    }

    fn details(&self) -> Option<&str> {
        self.sqlstate.as_deref()
    }

    fn hint(&self) -> Option<&str> {
        None
    }

    fn table_name(&self) -> Option<&str> {
        None
    }

    fn column_name(&self) -> Option<&str> {
        None
    }

    fn constraint_name(&self) -> Option<&str> {
        None
    }

    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Errors produced by the adapter
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The identity-retrieval loop ran out of result sets
    #[error("no result set yielded an identity value after skipping {skipped} result sets")]
    IdentityNotFound { skipped: usize },

    /// The identity row held something that is not an integer
    #[error("identity value {value} is not an integer")]
    InvalidIdentity { value: String },

    #[error("invalid connection URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid value for option `{key}`: {value}")]
    InvalidOption { key: String, value: String },
}

/// Adapter-level error details exposed to Diesel as a database error
#[derive(Debug)]
struct AdapterErrorInfo(String);

impl DatabaseErrorInformation for AdapterErrorInfo {
    fn message(&self) -> &str {
        &self.0
    }

    fn details(&self) -> Option<&str> {
        None
    }

    fn hint(&self) -> Option<&str> {
        None
    }

    fn table_name(&self) -> Option<&str> {
        None
    }

    fn column_name(&self) -> Option<&str> {
        None
    }

    fn constraint_name(&self) -> Option<&str> {
        None
    }

    fn statement_position(&self) -> Option<i32> {
        None
    }
}

impl From<DriverError> for diesel::result::Error {
    fn from(error: DriverError) -> Self {
        diesel::result::Error::DatabaseError(error.kind(), Box::new(error))
    }
}

impl From<Error> for diesel::result::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Driver(e) => e.into(),
            other => diesel::result::Error::DatabaseError(
                DatabaseErrorKind::Unknown,
                Box::new(AdapterErrorInfo(other.to_string())),
            ),
        }
    }
}

impl From<Error> for diesel::ConnectionError {
    fn from(error: Error) -> Self {
        match error {
            Error::Driver(e) => diesel::ConnectionError::BadConnection(e.to_string()),
            other => diesel::ConnectionError::InvalidConnectionUrl(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let error = DriverError::new("Invalid object name 'users'.");
        assert_eq!(format!("{}", error), "Invalid object name 'users'.");
    }

    #[test]
    fn test_driver_error_builders() {
        let error = DriverError::new("boom")
            .with_sqlstate("42S02")
            .with_native_error(208);
        assert_eq!(error.sqlstate(), Some("42S02"));
        assert_eq!(error.native_error(), Some(208));
        assert_eq!(error.details(), Some("42S02"));
    }

    #[test]
    fn test_kind_from_native_error() {
        let unique = DriverError::new("dup").with_native_error(2627);
        assert!(matches!(unique.kind(), DatabaseErrorKind::UniqueViolation));

        let fk = DriverError::new("fk").with_native_error(547);
        assert!(matches!(fk.kind(), DatabaseErrorKind::ForeignKeyViolation));

        let not_null = DriverError::new("null").with_native_error(515);
        assert!(matches!(not_null.kind(), DatabaseErrorKind::NotNullViolation));

        let other = DriverError::new("other");
        assert!(matches!(other.kind(), DatabaseErrorKind::Unknown));
    }

    #[test]
    fn test_into_diesel_error_keeps_message() {
        let error: diesel::result::Error = DriverError::new("deadlock victim")
            .with_native_error(1205)
            .into();
        match error {
            diesel::result::Error::DatabaseError(kind, info) => {
                assert!(matches!(kind, DatabaseErrorKind::SerializationFailure));
                assert_eq!(info.message(), "deadlock victim");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_adapter_error_into_diesel_error() {
        let error: diesel::result::Error = Error::IdentityNotFound { skipped: 3 }.into();
        match error {
            diesel::result::Error::DatabaseError(_, info) => {
                assert!(info.message().contains("3 result sets"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
