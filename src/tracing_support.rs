//! Structured query logging
//!
//! Every driver round-trip the adapter makes is timed by a [`SpanTimer`] and
//! reported as a single `tracing` event on the `diesel_mssql_odbc::query`
//! target once it finishes.
//!
//! # Span Fields
//!
//! - `operation`: "exec", "executemany", "load", "version_probe" or "identity_fetch"
//! - `db.system`: "mssql"
//! - `db.statement`: SQL text, truncated to [`TracingConfig::max_sql_length`]
//! - `rows`, `elapsed`, and `error.class` on failure
//!
//! # Example
//!
//! ```
//! use diesel_mssql_odbc::tracing_support::{QuerySpan, SpanOperation, TracingConfig};
//!
//! let config = TracingConfig::default();
//! let mut span = QuerySpan::new(SpanOperation::Execute).with_sql("SELECT 1", &config);
//! span.record_success(1, std::time::Duration::from_millis(3));
//! assert!(span.summary().contains("op=exec"));
//! ```

use std::time::{Duration, Instant};

use crate::error::DriverError;

const TARGET: &str = "diesel_mssql_odbc::query";

/// The operation type for spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanOperation {
    /// Executing a single statement
    Execute,
    /// Executing one statement over many parameter rows
    ExecuteMany,
    /// Executing a query and fetching its rows
    Load,
    /// Reading `SERVERPROPERTY('ProductVersion')`
    VersionProbe,
    /// Walking result sets to find the generated identity
    IdentityFetch,
}

impl SpanOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanOperation::Execute => "exec",
            SpanOperation::ExecuteMany => "executemany",
            SpanOperation::Load => "load",
            SpanOperation::VersionProbe => "version_probe",
            SpanOperation::IdentityFetch => "identity_fetch",
        }
    }
}

impl std::fmt::Display for SpanOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error classification from the SQLSTATE class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 28xxx: invalid authorization
    Auth,
    /// 08xxx: connection exception
    Network,
    /// 42xxx, 37xxx: syntax error or access rule violation
    SqlError,
    /// 23xxx: integrity constraint violation
    Constraint,
    /// 22xxx, 07xxx: data or parameter mismatch
    Data,
    /// HYT00 / HYT01
    Timeout,
    /// 40001: deadlock victim
    Deadlock,
    Unknown,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Auth => "auth",
            ErrorClass::Network => "network",
            ErrorClass::SqlError => "sql_error",
            ErrorClass::Constraint => "constraint",
            ErrorClass::Data => "data",
            ErrorClass::Timeout => "timeout",
            ErrorClass::Deadlock => "deadlock",
            ErrorClass::Unknown => "unknown",
        }
    }

    /// Classify a five character SQLSTATE
    pub fn from_sqlstate(sqlstate: &str) -> Self {
        match sqlstate {
            "HYT00" | "HYT01" => return ErrorClass::Timeout,
            "40001" => return ErrorClass::Deadlock,
            _ => {}
        }
        match sqlstate.get(..2) {
            Some("28") => ErrorClass::Auth,
            Some("08") => ErrorClass::Network,
            Some("42") | Some("37") => ErrorClass::SqlError,
            Some("23") => ErrorClass::Constraint,
            Some("22") | Some("07") => ErrorClass::Data,
            _ => ErrorClass::Unknown,
        }
    }

    pub fn from_driver_error(error: &DriverError) -> Self {
        error
            .sqlstate()
            .map(Self::from_sqlstate)
            .unwrap_or(ErrorClass::Unknown)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for query logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Whether to include SQL statements in events
    pub include_sql: bool,
    /// Maximum SQL length to include
    pub max_sql_length: usize,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            include_sql: true,
            max_sql_length: 1000,
        }
    }
}

/// Metadata for one driver round-trip
#[derive(Debug, Clone)]
pub struct QuerySpan {
    pub operation: SpanOperation,
    pub sql: Option<String>,
    pub rows: Option<usize>,
    pub duration: Option<Duration>,
    pub error_class: Option<ErrorClass>,
    pub error_message: Option<String>,
    /// The caller recovers from errors, so they are reported at debug
    pub swallowed: bool,
}

impl QuerySpan {
    pub fn new(operation: SpanOperation) -> Self {
        Self {
            operation,
            sql: None,
            rows: None,
            duration: None,
            error_class: None,
            error_message: None,
            swallowed: false,
        }
    }

    /// Attach the SQL text, honouring the config
    pub fn with_sql(mut self, sql: &str, config: &TracingConfig) -> Self {
        if config.include_sql {
            self.sql = Some(truncate(sql, config.max_sql_length).to_string());
        }
        self
    }

    pub fn record_success(&mut self, rows: usize, duration: Duration) {
        self.rows = Some(rows);
        self.duration = Some(duration);
    }

    pub fn record_error(&mut self, error: &DriverError) {
        self.error_class = Some(ErrorClass::from_driver_error(error));
        self.error_message = Some(error.to_string());
    }

    pub fn is_error(&self) -> bool {
        self.error_class.is_some()
    }

    /// Level the span is emitted at
    pub fn level(&self) -> tracing::Level {
        if self.is_error() && !self.swallowed {
            tracing::Level::WARN
        } else {
            tracing::Level::DEBUG
        }
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![format!("op={}", self.operation)];

        if let Some(ref duration) = self.duration {
            parts.push(format!("duration={:?}", duration));
        }

        if let Some(rows) = self.rows {
            parts.push(format!("rows={}", rows));
        }

        if let Some(ref error) = self.error_class {
            parts.push(format!("error={}", error));
        }

        parts.join(" ")
    }

    /// Emit the span as a `tracing` event
    pub fn emit(&self) {
        let statement = self.sql.as_deref().unwrap_or("");
        let elapsed = self.duration.unwrap_or_default();
        match (&self.error_class, &self.error_message) {
            (Some(class), message) if self.swallowed => tracing::debug!(
                target: TARGET,
                operation = self.operation.as_str(),
                db.system = "mssql",
                db.statement = statement,
                error.class = class.as_str(),
                ?elapsed,
                "{}",
                message.as_deref().unwrap_or("query failed")
            ),
            (Some(class), message) => tracing::warn!(
                target: TARGET,
                operation = self.operation.as_str(),
                db.system = "mssql",
                db.statement = statement,
                error.class = class.as_str(),
                ?elapsed,
                "{}",
                message.as_deref().unwrap_or("query failed")
            ),
            (None, _) => tracing::debug!(
                target: TARGET,
                operation = self.operation.as_str(),
                db.system = "mssql",
                db.statement = statement,
                rows = self.rows.unwrap_or(0),
                ?elapsed,
                "query finished"
            ),
        }
    }
}

fn truncate(sql: &str, max: usize) -> &str {
    if sql.len() <= max {
        return sql;
    }
    let mut end = max;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Helper to time an operation and emit its span
pub struct SpanTimer {
    start: Instant,
    span: QuerySpan,
}

impl SpanTimer {
    pub fn start(operation: SpanOperation) -> Self {
        Self {
            start: Instant::now(),
            span: QuerySpan::new(operation),
        }
    }

    pub fn with_sql(mut self, sql: &str, config: &TracingConfig) -> Self {
        self.span = self.span.with_sql(sql, config);
        self
    }

    /// Report a failure at debug level, for callers that recover from it
    pub fn swallow_errors(mut self) -> Self {
        self.span.swallowed = true;
        self
    }

    /// Finish timing, record success and emit
    pub fn finish_success(mut self, rows: usize) -> QuerySpan {
        let duration = self.start.elapsed();
        self.span.record_success(rows, duration);
        self.span.emit();
        self.span
    }

    /// Finish timing, record the error and emit
    pub fn finish_error(mut self, error: &DriverError) -> QuerySpan {
        self.span.duration = Some(self.start.elapsed());
        self.span.record_error(error);
        self.span.emit();
        self.span
    }

    /// Finish with the outcome of a driver call, passing it through
    pub fn finish<T>(
        self,
        result: Result<T, DriverError>,
        rows: impl FnOnce(&T) -> usize,
    ) -> Result<T, DriverError> {
        match &result {
            Ok(value) => {
                let n = rows(value);
                self.finish_success(n);
            }
            Err(error) => {
                self.finish_error(error);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_operation_as_str() {
        assert_eq!(SpanOperation::Execute.as_str(), "exec");
        assert_eq!(SpanOperation::ExecuteMany.as_str(), "executemany");
        assert_eq!(SpanOperation::IdentityFetch.as_str(), "identity_fetch");
    }

    #[test]
    fn test_error_class_from_sqlstate() {
        assert_eq!(ErrorClass::from_sqlstate("28000"), ErrorClass::Auth);
        assert_eq!(ErrorClass::from_sqlstate("08S01"), ErrorClass::Network);
        assert_eq!(ErrorClass::from_sqlstate("42S02"), ErrorClass::SqlError);
        assert_eq!(ErrorClass::from_sqlstate("23000"), ErrorClass::Constraint);
        assert_eq!(ErrorClass::from_sqlstate("22003"), ErrorClass::Data);
        assert_eq!(ErrorClass::from_sqlstate("HYT00"), ErrorClass::Timeout);
        assert_eq!(ErrorClass::from_sqlstate("40001"), ErrorClass::Deadlock);
        assert_eq!(ErrorClass::from_sqlstate("HY000"), ErrorClass::Unknown);
        assert_eq!(ErrorClass::from_sqlstate(""), ErrorClass::Unknown);
    }

    #[test]
    fn test_error_class_without_sqlstate() {
        let error = DriverError::new("driver went away");
        assert_eq!(ErrorClass::from_driver_error(&error), ErrorClass::Unknown);
    }

    #[test]
    fn test_with_sql_truncates() {
        let config = TracingConfig {
            include_sql: true,
            max_sql_length: 6,
        };
        let span = QuerySpan::new(SpanOperation::Execute).with_sql("SELECT 1", &config);
        assert_eq!(span.sql.as_deref(), Some("SELECT"));
    }

    #[test]
    fn test_with_sql_disabled() {
        let config = TracingConfig {
            include_sql: false,
            ..TracingConfig::default()
        };
        let span = QuerySpan::new(SpanOperation::Load).with_sql("SELECT 1", &config);
        assert!(span.sql.is_none());
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("héllo", 2), "h");
    }

    #[test]
    fn test_span_summary() {
        let mut span = QuerySpan::new(SpanOperation::Load);
        span.record_success(5, Duration::from_millis(100));

        let summary = span.summary();
        assert!(summary.contains("op=load"));
        assert!(summary.contains("rows=5"));
    }

    #[test]
    fn test_span_timer_error() {
        let timer = SpanTimer::start(SpanOperation::Execute);
        let span = timer.finish_error(&DriverError::new("bad").with_sqlstate("42000"));

        assert!(span.is_error());
        assert_eq!(span.error_class, Some(ErrorClass::SqlError));
    }

    #[test]
    fn test_swallowed_error_is_debug() {
        let error = DriverError::new("Invalid object name").with_sqlstate("42S02");

        let span = SpanTimer::start(SpanOperation::VersionProbe).finish_error(&error);
        assert_eq!(span.level(), tracing::Level::WARN);

        let span = SpanTimer::start(SpanOperation::VersionProbe)
            .swallow_errors()
            .finish_error(&error);
        assert!(span.is_error());
        assert_eq!(span.level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_span_timer_finish_passes_result_through() {
        let timer = SpanTimer::start(SpanOperation::Execute);
        let result: Result<Vec<u8>, DriverError> = Ok(vec![1, 2]);
        assert_eq!(timer.finish(result, |v| v.len()), Ok(vec![1, 2]));
    }
}
