//! SQL Server dialect for ODBC drivers
//!
//! [`MssqlDialect`] holds everything that is specific to this driver and
//! server combination: the placeholder style, how batches are executed,
//! whether the generated identity can be read back in the same round-trip,
//! and the server version. It is plain configuration composed into the
//! connection, not a layer in an inheritance chain.

use crate::driver::{Cursor, DriverCapabilities, DriverConnection, SqlRow, SqlValue};
use crate::error::DriverError;
use crate::tracing_support::{SpanOperation, SpanTimer, TracingConfig};
use crate::version::ServerVersion;

/// Identifier used in connection URLs to select this adapter
pub const DIALECT_NAME: &str = "mssql+odbc";

/// Rows fetched per `fetchmany` round-trip on every cursor the dialect opens
pub const DEFAULT_ARRAYSIZE: usize = 100;

/// Upper bound on result sets skipped while looking for the identity row
pub const DEFAULT_MAX_IDENTITY_RESULT_SETS: usize = 64;

/// Suffix appended to an INSERT to read its identity in the same batch
pub const SCOPE_IDENTITY_SUFFIX: &str = "; select scope_identity()";

pub(crate) const VERSION_QUERY: &str = "SELECT  SERVERPROPERTY('ProductVersion')";

/// Bind parameter placeholder style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamStyle {
    /// `?`
    #[default]
    Qmark,
}

impl ParamStyle {
    /// Text pushed for one bind parameter
    pub fn placeholder(&self) -> &'static str {
        match self {
            ParamStyle::Qmark => "?",
        }
    }
}

/// How statements with several parameter rows are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchStrategy {
    /// One `executemany` call over the materialised rows
    #[default]
    ExecuteMany,
    /// One `execute` call per row
    ExecuteEach,
}

/// Driver-specific behaviour of the dialect
///
/// # Example
///
/// ```
/// use diesel_mssql_odbc::DialectConfig;
///
/// let config = DialectConfig::builder()
///     .use_scope_identity(false)
///     .max_identity_result_sets(8)
///     .build();
///
/// assert!(!config.use_scope_identity);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectConfig {
    /// Prefer `scope_identity()` over `@@identity`
    pub use_scope_identity: bool,
    /// See [`DEFAULT_MAX_IDENTITY_RESULT_SETS`]
    pub max_identity_result_sets: usize,
    pub param_style: ParamStyle,
    pub batch_strategy: BatchStrategy,
    pub tracing: TracingConfig,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            use_scope_identity: true,
            max_identity_result_sets: DEFAULT_MAX_IDENTITY_RESULT_SETS,
            param_style: ParamStyle::Qmark,
            batch_strategy: BatchStrategy::ExecuteMany,
            tracing: TracingConfig::default(),
        }
    }
}

impl DialectConfig {
    pub fn builder() -> DialectConfigBuilder {
        DialectConfigBuilder::default()
    }
}

/// Builder for [`DialectConfig`]
#[derive(Debug, Default)]
pub struct DialectConfigBuilder {
    config: DialectConfig,
}

impl DialectConfigBuilder {
    pub fn use_scope_identity(mut self, enabled: bool) -> Self {
        self.config.use_scope_identity = enabled;
        self
    }

    pub fn max_identity_result_sets(mut self, max: usize) -> Self {
        self.config.max_identity_result_sets = max;
        self
    }

    pub fn batch_strategy(mut self, strategy: BatchStrategy) -> Self {
        self.config.batch_strategy = strategy;
        self
    }

    pub fn tracing(mut self, tracing: TracingConfig) -> Self {
        self.config.tracing = tracing;
        self
    }

    pub fn build(self) -> DialectConfig {
        self.config
    }
}

/// The SQL Server dialect bound to one driver
#[derive(Debug, Clone)]
pub struct MssqlDialect {
    config: DialectConfig,
    use_scope_identity: bool,
}

impl MssqlDialect {
    /// Build the dialect, narrowing capabilities to what the driver supports
    ///
    /// `driver` is `None` when no driver is loaded (for instance when the
    /// dialect is only used to render SQL). Embedding `scope_identity()` needs
    /// a driver whose cursors can move to the next result set.
    pub fn new(config: DialectConfig, driver: Option<DriverCapabilities>) -> Self {
        let use_scope_identity = config.use_scope_identity
            && driver.map(|caps| caps.supports_nextset).unwrap_or(false);
        if config.use_scope_identity && !use_scope_identity {
            tracing::debug!(
                driver_loaded = driver.is_some(),
                "driver cannot advance result sets, scope_identity() will not be embedded"
            );
        }
        Self {
            config,
            use_scope_identity,
        }
    }

    pub fn name(&self) -> &'static str {
        DIALECT_NAME
    }

    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    /// Whether `scope_identity()` can be used for this dialect instance
    pub fn use_scope_identity(&self) -> bool {
        self.use_scope_identity
    }

    pub fn param_style(&self) -> ParamStyle {
        self.config.param_style
    }

    /// Open a cursor with the dialect's fetch size
    pub fn create_cursor<'c, C: DriverConnection>(
        &self,
        conn: &'c mut C,
    ) -> Result<C::Cursor<'c>, DriverError> {
        let mut cursor = conn.cursor()?;
        cursor.set_arraysize(DEFAULT_ARRAYSIZE);
        Ok(cursor)
    }

    /// Execute `sql` once per parameter row
    ///
    /// The rows are collected first; the driver needs a sequence it can walk
    /// more than once.
    pub async fn do_executemany<K, I>(
        &self,
        cursor: &mut K,
        sql: &str,
        rows: I,
    ) -> Result<(), DriverError>
    where
        K: Cursor + ?Sized,
        I: IntoIterator<Item = SqlRow>,
    {
        let rows: Vec<SqlRow> = rows.into_iter().collect();
        let count = rows.len();
        let timer =
            SpanTimer::start(SpanOperation::ExecuteMany).with_sql(sql, &self.config.tracing);

        let result = match self.config.batch_strategy {
            BatchStrategy::ExecuteMany => cursor.executemany(sql, rows).await,
            BatchStrategy::ExecuteEach => {
                let mut outcome = Ok(());
                for row in &rows {
                    outcome = cursor.execute(sql, row).await;
                    if outcome.is_err() {
                        break;
                    }
                }
                outcome
            }
        };
        timer.finish(result, |_| count)
    }

    /// Ask the server for its product version
    ///
    /// `SERVERPROPERTY('ProductVersion')` does not exist before SQL Server
    /// 2008 and some driver/server combinations cannot run it; any failure
    /// yields [`ServerVersion::fallback`].
    pub async fn server_version_info<C: DriverConnection>(&self, conn: &mut C) -> ServerVersion {
        match self.query_product_version(conn).await {
            Ok(Some(raw)) => ServerVersion::parse(&raw),
            Ok(None) => {
                tracing::debug!("ProductVersion query returned no value, assuming fallback");
                ServerVersion::fallback()
            }
            Err(error) => {
                tracing::debug!(%error, "ProductVersion query failed, assuming fallback");
                ServerVersion::fallback()
            }
        }
    }

    async fn query_product_version<C: DriverConnection>(
        &self,
        conn: &mut C,
    ) -> Result<Option<String>, DriverError> {
        let mut cursor = self.create_cursor(conn)?;
        let timer = SpanTimer::start(SpanOperation::VersionProbe)
            .with_sql(VERSION_QUERY, &self.config.tracing)
            .swallow_errors();
        let rows: Result<Vec<SqlRow>, DriverError> = async {
            cursor.execute(VERSION_QUERY, &[]).await?;
            cursor.fetchall().await
        }
        .await;
        let rows = timer.finish(rows, |rows| rows.len())?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .and_then(|value| match value {
                SqlValue::Text(s) => Some(s),
                SqlValue::Null => None,
                SqlValue::Integer(n) => Some(n.to_string()),
                SqlValue::Double(d) => Some(d.to_string()),
                SqlValue::Binary(b) => Some(String::from_utf8_lossy(&b).into_owned()),
            }))
    }
}

impl Default for MssqlDialect {
    fn default() -> Self {
        Self::new(DialectConfig::default(), Some(DriverCapabilities::default()))
    }
}
