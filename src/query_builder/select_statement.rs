//! SELECT rendering for SQL Server
//!
//! `OFFSET .. ROWS` is only accepted after an `ORDER BY`. A limited or
//! offset query without an ordering gets `ORDER BY (SELECT NULL)`, which
//! keeps whatever order the server produces.

use diesel::query_builder::{
    AstPass, BoxedLimitOffsetClause, BoxedSelectStatement, LimitClause, LimitOffsetClause,
    NoLimitClause, NoOffsetClause, NoOrderClause, OffsetClause, OrderClause, QueryFragment,
    SelectStatement,
};
use diesel::result::QueryResult;

use crate::backend::MssqlBackend;

const UNORDERED: &str = " ORDER BY (SELECT NULL)";

/// Select statement syntax of [`MssqlBackend`]
#[derive(Debug, Copy, Clone)]
pub struct MssqlSelectStatement;

/// Whether a limit/offset clause restricts the rows returned
pub trait RowWindow {
    fn has_row_window(&self) -> bool;
}

impl RowWindow for LimitOffsetClause<NoLimitClause, NoOffsetClause> {
    fn has_row_window(&self) -> bool {
        false
    }
}

impl<L> RowWindow for LimitOffsetClause<LimitClause<L>, NoOffsetClause> {
    fn has_row_window(&self) -> bool {
        true
    }
}

impl<O> RowWindow for LimitOffsetClause<NoLimitClause, OffsetClause<O>> {
    fn has_row_window(&self) -> bool {
        true
    }
}

impl<L, O> RowWindow for LimitOffsetClause<LimitClause<L>, OffsetClause<O>> {
    fn has_row_window(&self) -> bool {
        true
    }
}

impl RowWindow for BoxedLimitOffsetClause<'_, MssqlBackend> {
    fn has_row_window(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

/// Whether an order clause renders an `ORDER BY`
pub trait HasOrder {
    fn has_order(&self) -> bool;
}

impl HasOrder for NoOrderClause {
    fn has_order(&self) -> bool {
        false
    }
}

impl<E> HasOrder for OrderClause<E> {
    fn has_order(&self) -> bool {
        true
    }
}

impl<F, S, D, W, O, LOf, G, H, LC> QueryFragment<MssqlBackend, MssqlSelectStatement>
    for SelectStatement<F, S, D, W, O, LOf, G, H, LC>
where
    S: QueryFragment<MssqlBackend>,
    F: QueryFragment<MssqlBackend>,
    D: QueryFragment<MssqlBackend>,
    W: QueryFragment<MssqlBackend>,
    O: QueryFragment<MssqlBackend> + HasOrder,
    LOf: QueryFragment<MssqlBackend> + RowWindow,
    G: QueryFragment<MssqlBackend>,
    H: QueryFragment<MssqlBackend>,
    LC: QueryFragment<MssqlBackend>,
{
    fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, MssqlBackend>) -> QueryResult<()> {
        out.push_sql("SELECT ");
        self.distinct.walk_ast(out.reborrow())?;
        self.select.walk_ast(out.reborrow())?;
        self.from.walk_ast(out.reborrow())?;
        self.where_clause.walk_ast(out.reborrow())?;
        self.group_by.walk_ast(out.reborrow())?;
        self.having.walk_ast(out.reborrow())?;
        self.order.walk_ast(out.reborrow())?;
        if !self.order.has_order() && self.limit_offset.has_row_window() {
            out.push_sql(UNORDERED);
        }
        self.limit_offset.walk_ast(out.reborrow())?;
        self.locking.walk_ast(out.reborrow())?;
        Ok(())
    }
}

impl<'a, ST, QS, GB> QueryFragment<MssqlBackend, MssqlSelectStatement>
    for BoxedSelectStatement<'a, ST, QS, MssqlBackend, GB>
where
    QS: QueryFragment<MssqlBackend>,
{
    fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, MssqlBackend>) -> QueryResult<()> {
        out.push_sql("SELECT ");
        self.distinct.walk_ast(out.reborrow())?;
        self.select.walk_ast(out.reborrow())?;
        self.from.walk_ast(out.reborrow())?;
        self.where_clause.walk_ast(out.reborrow())?;
        self.group_by.walk_ast(out.reborrow())?;
        self.having.walk_ast(out.reborrow())?;
        match self.order {
            Some(ref order) => {
                out.push_sql(" ORDER BY ");
                order.walk_ast(out.reborrow())?;
            }
            None if self.limit_offset.has_row_window() => out.push_sql(UNORDERED),
            None => {}
        }
        self.limit_offset.walk_ast(out.reborrow())?;
        Ok(())
    }
}
