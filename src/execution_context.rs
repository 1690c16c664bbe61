//! Per-statement execution lifecycle
//!
//! A [`Statement`] goes through three steps:
//!
//! 1. [`ExecutionContext::pre_exec`] decides whether `scope_identity()` is
//!    appended to the statement text and records the decision as an
//!    [`IdentityEmbedding`] in the returned [`PreparedExecution`].
//! 2. [`ExecutionContext::execute`] sends it through the cursor.
//! 3. [`ExecutionContext::post_exec`] reads the generated identity back,
//!    either from the embedded select or with a separate query.
//!
//! The identity select has to ride in the same batch as the INSERT: a second
//! round-trip would see identities produced by triggers or by other work on
//! the connection in between.

use crate::dialect::{MssqlDialect, SCOPE_IDENTITY_SUFFIX};
use crate::driver::{Cursor, SqlRow, SqlValue};
use crate::error::{DriverError, Error};
use crate::query_builder::quote_table_name;
use crate::tracing_support::{SpanOperation, SpanTimer};

const SELECT_SCOPE_IDENTITY: &str = "SELECT scope_identity() AS lastrowid";
const SELECT_AT_AT_IDENTITY: &str = "SELECT @@identity AS lastrowid";

/// Whether the identity select was embedded into the statement text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityEmbedding {
    NotEmbedded,
    Embedded,
}

/// A statement with its parameter rows, before the dialect touches it
///
/// # Example
///
/// ```
/// use diesel_mssql_odbc::{SqlValue, Statement};
///
/// let stmt = Statement::new("INSERT INTO users (name) VALUES (?)")
///     .bind(vec![SqlValue::from("alice")])
///     .expect_identity();
///
/// assert!(!stmt.is_executemany());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    rows: Vec<SqlRow>,
    expects_identity: bool,
    identity_insert: Option<String>,
}

impl Statement {
    /// A statement executed once without parameters
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            rows: vec![Vec::new()],
            expects_identity: false,
            identity_insert: None,
        }
    }

    /// A statement executed once per parameter row
    pub fn many<I>(sql: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = SqlRow>,
    {
        Self {
            rows: rows.into_iter().collect(),
            ..Self::new(sql)
        }
    }

    /// Use `params` as the single parameter row
    pub fn bind(mut self, params: Vec<SqlValue>) -> Self {
        self.rows = vec![params];
        self
    }

    /// Mark the statement as an INSERT whose generated key is wanted
    pub fn expect_identity(mut self) -> Self {
        self.expects_identity = true;
        self
    }

    /// The INSERT supplies explicit values for the identity column of `table`
    ///
    /// `table` may be schema qualified (`dbo.users`); each part is quoted.
    pub fn with_identity_insert(mut self, table: &str) -> Self {
        self.identity_insert = Some(quote_table_name(table));
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn rows(&self) -> &[SqlRow] {
        &self.rows
    }

    pub fn is_executemany(&self) -> bool {
        self.rows.len() > 1
    }

    /// Whether the caller should get a generated key back
    ///
    /// Never for executemany, and never when the identity value is supplied
    /// explicitly.
    fn selects_lastrowid(&self) -> bool {
        self.expects_identity && !self.is_executemany() && self.identity_insert.is_none()
    }

    fn has_parameters(&self) -> bool {
        self.rows.first().map(|row| !row.is_empty()).unwrap_or(false)
    }
}

/// A statement after pre-execution, ready for the cursor
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedExecution {
    sql: String,
    rows: Vec<SqlRow>,
    identity: IdentityEmbedding,
    select_lastrowid: bool,
    identity_insert: Option<String>,
}

impl PreparedExecution {
    /// The statement text as it will be sent
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn identity(&self) -> IdentityEmbedding {
        self.identity
    }
}

/// What a finished execution produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Rows affected as reported by the driver, `-1` when unknown
    pub rowcount: i64,
    /// Generated identity, when the statement asked for one
    pub last_insert_id: Option<i64>,
}

/// Runs statements through a cursor on behalf of a dialect
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    dialect: &'a MssqlDialect,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(dialect: &'a MssqlDialect) -> Self {
        Self { dialect }
    }

    /// Decide whether to embed `scope_identity()` into the statement
    ///
    /// Only INSERTs that want their key back, on a dialect that can read the
    /// second result set, with at least one parameter. An
    /// `INSERT .. DEFAULT VALUES` changes its result shape when a select is
    /// appended, so it is left alone.
    pub fn pre_exec(&self, statement: Statement) -> PreparedExecution {
        let select_lastrowid = statement.selects_lastrowid();
        let embed =
            select_lastrowid && self.dialect.use_scope_identity() && statement.has_parameters();

        let Statement {
            mut sql,
            rows,
            identity_insert,
            ..
        } = statement;

        let identity = if embed {
            sql.push_str(SCOPE_IDENTITY_SUFFIX);
            IdentityEmbedding::Embedded
        } else {
            IdentityEmbedding::NotEmbedded
        };

        PreparedExecution {
            sql,
            rows,
            identity,
            select_lastrowid,
            identity_insert,
        }
    }

    /// Send the prepared statement through the cursor
    pub async fn execute<K>(
        &self,
        cursor: &mut K,
        prepared: &PreparedExecution,
    ) -> Result<(), DriverError>
    where
        K: Cursor + ?Sized,
    {
        if prepared.rows.len() > 1 {
            return self
                .dialect
                .do_executemany(cursor, &prepared.sql, prepared.rows.iter().cloned())
                .await;
        }

        let params = prepared.rows.first().map(Vec::as_slice).unwrap_or(&[]);
        let timer = SpanTimer::start(SpanOperation::Execute)
            .with_sql(&prepared.sql, &self.dialect.config().tracing);
        let result = cursor.execute(&prepared.sql, params).await;
        let rowcount = cursor.rowcount();
        timer.finish(result, |_| rowcount.max(0) as usize)
    }

    /// Read the generated identity, if the statement asked for one
    pub async fn post_exec<K>(
        &self,
        cursor: &mut K,
        prepared: &PreparedExecution,
    ) -> Result<Option<i64>, Error>
    where
        K: Cursor + ?Sized,
    {
        match prepared.identity {
            IdentityEmbedding::Embedded => self.fetch_embedded_identity(cursor).await.map(Some),
            IdentityEmbedding::NotEmbedded if prepared.select_lastrowid => {
                self.fetch_identity_separately(cursor).await.map(Some)
            }
            IdentityEmbedding::NotEmbedded => Ok(None),
        }
    }

    /// The whole lifecycle, including IDENTITY_INSERT handling
    pub async fn run<K>(
        &self,
        cursor: &mut K,
        statement: Statement,
    ) -> Result<ExecutionOutcome, Error>
    where
        K: Cursor + ?Sized,
    {
        let prepared = self.pre_exec(statement);

        if let Some(table) = &prepared.identity_insert {
            self.set_identity_insert(cursor, table, true).await?;
        }

        if let Err(error) = self.execute(cursor, &prepared).await {
            if let Some(table) = &prepared.identity_insert {
                if let Err(cleanup) = self.set_identity_insert(cursor, table, false).await {
                    tracing::warn!(
                        %cleanup,
                        table = %table,
                        "could not switch IDENTITY_INSERT off"
                    );
                }
            }
            return Err(error.into());
        }
        let rowcount = cursor.rowcount();

        let last_insert_id = self.post_exec(cursor, &prepared).await;

        if let Some(table) = &prepared.identity_insert {
            self.set_identity_insert(cursor, table, false).await?;
        }

        Ok(ExecutionOutcome {
            rowcount,
            last_insert_id: last_insert_id?,
        })
    }

    async fn set_identity_insert<K>(
        &self,
        cursor: &mut K,
        table: &str,
        on: bool,
    ) -> Result<(), DriverError>
    where
        K: Cursor + ?Sized,
    {
        let sql = format!(
            "SET IDENTITY_INSERT {} {}",
            table,
            if on { "ON" } else { "OFF" }
        );
        cursor.execute(&sql, &[]).await
    }

    /// Walk the result sets of the batch until the identity row shows up
    ///
    /// Triggers on the target table can add result sets ahead of the one we
    /// want. Fetching from a set that has no columns raises in most drivers,
    /// and `nextset` consumes the current set, so both an error and an empty
    /// set simply mean "advance and try again".
    async fn fetch_embedded_identity<K>(&self, cursor: &mut K) -> Result<i64, Error>
    where
        K: Cursor + ?Sized,
    {
        let max = self.dialect.config().max_identity_result_sets;
        let timer = SpanTimer::start(SpanOperation::IdentityFetch);
        let mut skipped = 0;

        let row = loop {
            match cursor.fetchall().await {
                Ok(rows) => {
                    if let Some(row) = rows.into_iter().next() {
                        break row;
                    }
                    tracing::trace!(skipped, "result set has no rows");
                }
                Err(error) => {
                    tracing::debug!(%error, skipped, "result set has no columns, advancing");
                }
            }

            let advanced = if skipped < max {
                match cursor.nextset().await {
                    Ok(advanced) => advanced,
                    Err(error) => {
                        timer.finish_error(&error);
                        return Err(error.into());
                    }
                }
            } else {
                false
            };
            if !advanced {
                timer.finish_success(0);
                return Err(Error::IdentityNotFound { skipped });
            }
            skipped += 1;
        };

        timer.finish_success(skipped);
        identity_from_row(row)
    }

    async fn fetch_identity_separately<K>(&self, cursor: &mut K) -> Result<i64, Error>
    where
        K: Cursor + ?Sized,
    {
        let sql = if self.dialect.use_scope_identity() {
            SELECT_SCOPE_IDENTITY
        } else {
            SELECT_AT_AT_IDENTITY
        };
        let timer = SpanTimer::start(SpanOperation::IdentityFetch)
            .with_sql(sql, &self.dialect.config().tracing);
        let rows: Result<Vec<SqlRow>, DriverError> = async {
            cursor.execute(sql, &[]).await?;
            cursor.fetchall().await
        }
        .await;
        let rows = timer.finish(rows, |rows| rows.len())?;

        match rows.into_iter().next() {
            Some(row) => identity_from_row(row),
            None => Err(Error::IdentityNotFound { skipped: 0 }),
        }
    }
}

/// Convert the first column of an identity row to an integer
///
/// `scope_identity()` is `numeric(38,0)`, which drivers hand back as text,
/// a double or an integer depending on their type mapping.
fn identity_from_row(row: SqlRow) -> Result<i64, Error> {
    let value = row.into_iter().next().unwrap_or(SqlValue::Null);
    let invalid = |value: &SqlValue| Error::InvalidIdentity {
        value: format!("{:?}", value),
    };

    match &value {
        SqlValue::Integer(n) => Ok(*n),
        SqlValue::Double(d) if d.is_finite() && d.fract() == 0.0 => Ok(*d as i64),
        SqlValue::Text(text) => parse_integral(text).ok_or_else(|| invalid(&value)),
        _ => Err(invalid(&value)),
    }
}

/// Parse `"42"` or `"42.000"`; anything with a non-zero fraction is rejected
pub(crate) fn parse_integral(text: &str) -> Option<i64> {
    let text = text.trim();
    match text.split_once('.') {
        None => text.parse().ok(),
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole.parse().ok(),
        Some(_) => None,
    }
}
