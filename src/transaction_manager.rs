//! Transaction Manager for the SQL Server backend
//!
//! The outermost level is a real transaction; nested levels are savepoints.
//! SQL Server has no `RELEASE SAVEPOINT`, so committing a nested level only
//! drops the depth, and its work becomes part of the enclosing transaction.

use std::num::NonZeroU32;

use async_trait::async_trait;
use diesel::{
    connection::{TransactionDepthChange, TransactionManagerStatus},
    result::Error as DieselError,
    QueryResult,
};
use diesel_async::{SimpleAsyncConnection, TransactionManager};

use crate::connection::MssqlConnection;
use crate::driver::DriverConnection;

/// Transaction Manager for SQL Server connections
///
/// The depth lives in Diesel's [`TransactionManagerStatus`], so pools see an
/// open transaction through `transaction_manager_status_mut`.
///
/// # Example
///
/// ```ignore
/// use diesel_async::AsyncConnection;
///
/// conn.transaction(|conn| async move {
///     diesel::insert_into(users)
///         .values(&new_user)
///         .execute(conn)
///         .await?;
///     Ok(())
/// }.scope_boxed()).await?;
/// ```
#[derive(Default)]
pub struct MssqlTransactionManager {
    /// Transaction status
    pub(crate) status: TransactionManagerStatus,
}

impl MssqlTransactionManager {
    /// Create a new transaction manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if currently in a transaction
    pub fn is_in_transaction(&self) -> bool {
        self.transaction_depth() > 0
    }

    /// Get the current transaction depth, 0 outside a transaction or when broken
    pub fn transaction_depth(&self) -> u32 {
        self.status
            .transaction_depth()
            .ok()
            .flatten()
            .map_or(0, NonZeroU32::get)
    }

    fn current_depth(&self) -> QueryResult<u32> {
        Ok(self.status.transaction_depth()?.map_or(0, NonZeroU32::get))
    }

    fn change_depth(&mut self, change: TransactionDepthChange) -> QueryResult<()> {
        self.status
            .transaction_state()?
            .change_transaction_depth(change)
    }

    fn begin_sql(depth: u32) -> String {
        if depth == 0 {
            "BEGIN TRANSACTION".to_string()
        } else {
            format!("SAVE TRANSACTION {}", savepoint_name(depth))
        }
    }

    fn rollback_sql(depth: u32) -> String {
        if depth <= 1 {
            "ROLLBACK TRANSACTION".to_string()
        } else {
            format!("ROLLBACK TRANSACTION {}", savepoint_name(depth - 1))
        }
    }
}

fn savepoint_name(depth: u32) -> String {
    format!("diesel_savepoint_{}", depth)
}

#[async_trait]
impl<C> TransactionManager<MssqlConnection<C>> for MssqlTransactionManager
where
    C: DriverConnection + 'static,
{
    type TransactionStateData = Self;

    async fn begin_transaction(conn: &mut MssqlConnection<C>) -> QueryResult<()> {
        let depth = conn.transaction_manager.current_depth()?;
        conn.batch_execute(&Self::begin_sql(depth)).await?;
        conn.transaction_manager
            .change_depth(TransactionDepthChange::IncreaseDepth)
    }

    async fn rollback_transaction(conn: &mut MssqlConnection<C>) -> QueryResult<()> {
        let depth = conn.transaction_manager.current_depth()?;

        if depth == 0 {
            return Err(DieselError::NotInTransaction);
        }

        if let Err(error) = conn.batch_execute(&Self::rollback_sql(depth)).await {
            if depth == 1 {
                conn.transaction_manager.status.set_in_error();
            }
            return Err(error);
        }
        conn.transaction_manager
            .change_depth(TransactionDepthChange::DecreaseDepth)
    }

    async fn commit_transaction(conn: &mut MssqlConnection<C>) -> QueryResult<()> {
        let depth = conn.transaction_manager.current_depth()?;

        if depth == 0 {
            return Err(DieselError::NotInTransaction);
        }

        if depth == 1 {
            if let Err(error) = conn.batch_execute("COMMIT TRANSACTION").await {
                // the commit error wins over a failed rollback
                match conn.batch_execute("ROLLBACK TRANSACTION").await {
                    Ok(()) => conn
                        .transaction_manager
                        .change_depth(TransactionDepthChange::DecreaseDepth)?,
                    Err(rollback) => {
                        tracing::debug!(%rollback, "rollback after failed commit failed");
                        conn.transaction_manager.status.set_in_error();
                    }
                }
                return Err(error);
            }
        }

        conn.transaction_manager
            .change_depth(TransactionDepthChange::DecreaseDepth)
    }

    fn transaction_manager_status_mut(
        conn: &mut MssqlConnection<C>,
    ) -> &mut TransactionManagerStatus {
        &mut conn.transaction_manager.status
    }
}
