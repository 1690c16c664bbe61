//! LIMIT/OFFSET for SQL Server
//!
//! SQL Server has no `LIMIT`; both are expressed with
//! `OFFSET n ROWS FETCH NEXT m ROWS ONLY`, which is only valid after an
//! `ORDER BY` clause. Unordered queries get one from the select statement
//! rendering.

use diesel::query_builder::{
    AstPass, BoxedLimitOffsetClause, IntoBoxedClause, LimitClause, LimitOffsetClause,
    NoLimitClause, NoOffsetClause, OffsetClause, QueryFragment,
};
use diesel::result::QueryResult;

use crate::backend::MssqlBackend;

impl QueryFragment<MssqlBackend> for LimitOffsetClause<NoLimitClause, NoOffsetClause> {
    fn walk_ast<'b>(&'b self, _out: AstPass<'_, 'b, MssqlBackend>) -> QueryResult<()> {
        Ok(())
    }
}

impl<L> QueryFragment<MssqlBackend> for LimitOffsetClause<LimitClause<L>, NoOffsetClause>
where
    L: QueryFragment<MssqlBackend>,
{
    fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, MssqlBackend>) -> QueryResult<()> {
        out.push_sql(" OFFSET 0 ROWS FETCH NEXT ");
        self.limit_clause.0.walk_ast(out.reborrow())?;
        out.push_sql(" ROWS ONLY");
        Ok(())
    }
}

impl<O> QueryFragment<MssqlBackend> for LimitOffsetClause<NoLimitClause, OffsetClause<O>>
where
    O: QueryFragment<MssqlBackend>,
{
    fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, MssqlBackend>) -> QueryResult<()> {
        out.push_sql(" OFFSET ");
        self.offset_clause.0.walk_ast(out.reborrow())?;
        out.push_sql(" ROWS");
        Ok(())
    }
}

impl<L, O> QueryFragment<MssqlBackend> for LimitOffsetClause<LimitClause<L>, OffsetClause<O>>
where
    L: QueryFragment<MssqlBackend>,
    O: QueryFragment<MssqlBackend>,
{
    fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, MssqlBackend>) -> QueryResult<()> {
        out.push_sql(" OFFSET ");
        self.offset_clause.0.walk_ast(out.reborrow())?;
        out.push_sql(" ROWS FETCH NEXT ");
        self.limit_clause.0.walk_ast(out.reborrow())?;
        out.push_sql(" ROWS ONLY");
        Ok(())
    }
}

impl<'a> QueryFragment<MssqlBackend> for BoxedLimitOffsetClause<'a, MssqlBackend> {
    fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, MssqlBackend>) -> QueryResult<()> {
        match (self.limit.as_ref(), self.offset.as_ref()) {
            (Some(limit), Some(offset)) => {
                out.push_sql(" OFFSET ");
                offset.walk_ast(out.reborrow())?;
                out.push_sql(" ROWS FETCH NEXT ");
                limit.walk_ast(out.reborrow())?;
                out.push_sql(" ROWS ONLY");
            }
            (Some(limit), None) => {
                out.push_sql(" OFFSET 0 ROWS FETCH NEXT ");
                limit.walk_ast(out.reborrow())?;
                out.push_sql(" ROWS ONLY");
            }
            (None, Some(offset)) => {
                out.push_sql(" OFFSET ");
                offset.walk_ast(out.reborrow())?;
                out.push_sql(" ROWS");
            }
            (None, None) => {}
        }
        Ok(())
    }
}

impl<'a> IntoBoxedClause<'a, MssqlBackend> for LimitOffsetClause<NoLimitClause, NoOffsetClause> {
    type BoxedClause = BoxedLimitOffsetClause<'a, MssqlBackend>;

    fn into_boxed(self) -> Self::BoxedClause {
        BoxedLimitOffsetClause {
            limit: None,
            offset: None,
        }
    }
}

impl<'a, L> IntoBoxedClause<'a, MssqlBackend> for LimitOffsetClause<LimitClause<L>, NoOffsetClause>
where
    L: QueryFragment<MssqlBackend> + Send + 'a,
{
    type BoxedClause = BoxedLimitOffsetClause<'a, MssqlBackend>;

    fn into_boxed(self) -> Self::BoxedClause {
        BoxedLimitOffsetClause {
            limit: Some(Box::new(self.limit_clause.0)),
            offset: None,
        }
    }
}

impl<'a, O> IntoBoxedClause<'a, MssqlBackend> for LimitOffsetClause<NoLimitClause, OffsetClause<O>>
where
    O: QueryFragment<MssqlBackend> + Send + 'a,
{
    type BoxedClause = BoxedLimitOffsetClause<'a, MssqlBackend>;

    fn into_boxed(self) -> Self::BoxedClause {
        BoxedLimitOffsetClause {
            limit: None,
            offset: Some(Box::new(self.offset_clause.0)),
        }
    }
}

impl<'a, L, O> IntoBoxedClause<'a, MssqlBackend>
    for LimitOffsetClause<LimitClause<L>, OffsetClause<O>>
where
    L: QueryFragment<MssqlBackend> + Send + 'a,
    O: QueryFragment<MssqlBackend> + Send + 'a,
{
    type BoxedClause = BoxedLimitOffsetClause<'a, MssqlBackend>;

    fn into_boxed(self) -> Self::BoxedClause {
        BoxedLimitOffsetClause {
            limit: Some(Box::new(self.limit_clause.0)),
            offset: Some(Box::new(self.offset_clause.0)),
        }
    }
}
