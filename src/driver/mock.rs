//! Scripted in-memory driver for tests
//!
//! Every `execute`/`executemany` pops the next scripted batch; when the script
//! is empty the batch behaves like a DML statement: one result set without
//! columns and a rowcount of 1.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ConnectArgs, Cursor, DriverCapabilities, DriverConnection, SqlRow, SqlValue};
use crate::error::DriverError;

/// One result set in a scripted batch
#[derive(Debug, Clone)]
pub(crate) enum MockResultSet {
    /// A set with columns (possibly zero rows)
    Rows {
        columns: Vec<String>,
        rows: Vec<SqlRow>,
    },
    /// A set without columns, fetching from it raises
    NoColumns,
}

impl MockResultSet {
    pub(crate) fn rows(columns: &[&str], rows: Vec<SqlRow>) -> Self {
        MockResultSet::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub(crate) fn scalar(value: impl Into<SqlValue>) -> Self {
        Self::rows(&[""], vec![vec![value.into()]])
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockBatch {
    pub(crate) result: Result<Vec<MockResultSet>, DriverError>,
    pub(crate) rowcount: i64,
}

/// A statement the cursor received
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Executed {
    pub(crate) sql: String,
    pub(crate) rows: Vec<SqlRow>,
    pub(crate) many: bool,
    pub(crate) arraysize: usize,
}

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub(crate) script: VecDeque<MockBatch>,
    pub(crate) executed: Vec<Executed>,
    pub(crate) nextset_calls: usize,
    pub(crate) nextset_errors: VecDeque<DriverError>,
    pub(crate) cursors_opened: usize,
    pub(crate) connect_args: Option<ConnectArgs>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockConnection {
    pub(crate) state: Arc<Mutex<MockState>>,
    pub(crate) capabilities: DriverCapabilities,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn without_nextset() -> Self {
        Self {
            capabilities: DriverCapabilities {
                supports_nextset: false,
            },
            ..Self::default()
        }
    }

    pub(crate) fn push_sets(&self, sets: Vec<MockResultSet>) {
        self.push(MockBatch {
            result: Ok(sets),
            rowcount: -1,
        });
    }

    pub(crate) fn push_dml(&self, rowcount: i64) {
        self.push(MockBatch {
            result: Ok(vec![MockResultSet::NoColumns]),
            rowcount,
        });
    }

    pub(crate) fn push_error(&self, error: DriverError) {
        self.push(MockBatch {
            result: Err(error),
            rowcount: -1,
        });
    }

    /// The next `nextset` call fails with `error`
    pub(crate) fn push_nextset_error(&self, error: DriverError) {
        self.state.lock().unwrap().nextset_errors.push_back(error);
    }

    fn push(&self, batch: MockBatch) {
        self.state.lock().unwrap().script.push_back(batch);
    }

    pub(crate) fn executed(&self) -> Vec<Executed> {
        self.state.lock().unwrap().executed.clone()
    }

    pub(crate) fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|e| e.sql).collect()
    }

    pub(crate) fn nextset_calls(&self) -> usize {
        self.state.lock().unwrap().nextset_calls
    }
}

#[async_trait]
impl DriverConnection for MockConnection {
    type Cursor<'c>
        = MockCursor
    where
        Self: 'c;

    async fn connect(args: &ConnectArgs) -> Result<Self, DriverError> {
        let conn = MockConnection::new();
        conn.state.lock().unwrap().connect_args = Some(args.clone());
        Ok(conn)
    }

    fn capabilities(&self) -> DriverCapabilities {
        self.capabilities
    }

    fn cursor(&mut self) -> Result<Self::Cursor<'_>, DriverError> {
        self.state.lock().unwrap().cursors_opened += 1;
        Ok(MockCursor {
            state: self.state.clone(),
            arraysize: 1,
            current: None,
            pending: VecDeque::new(),
            rowcount: -1,
        })
    }
}

#[derive(Debug)]
pub(crate) struct MockCursor {
    state: Arc<Mutex<MockState>>,
    arraysize: usize,
    current: Option<MockResultSet>,
    pending: VecDeque<MockResultSet>,
    rowcount: i64,
}

impl MockCursor {
    fn run(&mut self, sql: &str, rows: Vec<SqlRow>, many: bool) -> Result<(), DriverError> {
        let batch = {
            let mut state = self.state.lock().unwrap();
            state.executed.push(Executed {
                sql: sql.to_string(),
                rows,
                many,
                arraysize: self.arraysize,
            });
            state.script.pop_front()
        };
        let batch = batch.unwrap_or(MockBatch {
            result: Ok(vec![MockResultSet::NoColumns]),
            rowcount: 1,
        });

        let mut sets: VecDeque<MockResultSet> = batch.result?.into();
        self.current = sets.pop_front();
        self.pending = sets;
        self.rowcount = batch.rowcount;
        Ok(())
    }

    fn take_rows(&mut self, limit: Option<usize>) -> Result<Vec<SqlRow>, DriverError> {
        match self.current.as_mut() {
            Some(MockResultSet::Rows { rows, .. }) => {
                let n = limit.unwrap_or(rows.len()).min(rows.len());
                Ok(rows.drain(..n).collect())
            }
            Some(MockResultSet::NoColumns) => Err(DriverError::new(
                "No results.  Previous SQL was not a query.",
            )
            .with_sqlstate("24000")),
            None => Err(DriverError::new("No result set available").with_sqlstate("24000")),
        }
    }
}

#[async_trait]
impl Cursor for MockCursor {
    fn arraysize(&self) -> usize {
        self.arraysize
    }

    fn set_arraysize(&mut self, size: usize) {
        self.arraysize = size;
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<(), DriverError> {
        self.run(sql, vec![params.to_vec()], false)
    }

    async fn executemany(&mut self, sql: &str, rows: Vec<SqlRow>) -> Result<(), DriverError> {
        self.run(sql, rows, true)
    }

    fn description(&self) -> Option<Vec<String>> {
        match &self.current {
            Some(MockResultSet::Rows { columns, .. }) => Some(columns.clone()),
            _ => None,
        }
    }

    fn rowcount(&self) -> i64 {
        self.rowcount
    }

    async fn fetchmany(&mut self, size: usize) -> Result<Vec<SqlRow>, DriverError> {
        self.take_rows(Some(size))
    }

    async fn fetchall(&mut self) -> Result<Vec<SqlRow>, DriverError> {
        self.take_rows(None)
    }

    async fn nextset(&mut self) -> Result<bool, DriverError> {
        {
            let mut state = self.state.lock().unwrap();
            state.nextset_calls += 1;
            if let Some(error) = state.nextset_errors.pop_front() {
                return Err(error);
            }
        }
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }
}
