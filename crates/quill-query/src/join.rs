//! Join clauses as constrained sub-builders.
//!
//! A [`JoinClause`] owns a nested [`Builder`] whose where list holds the
//! join conditions. `on`/`or_on` record column-to-column comparisons and
//! the `where` pass-throughs record value comparisons whose bindings are
//! merged into the parent's `join` bucket when the join is attached.

use crate::builder::Builder;
use crate::clause::Operand;
use crate::expression::Ident;
use quill_core::Result;

/// The join flavor, driving the emitted keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    /// The SQL keyword sequence for this join flavor.
    pub const fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
            JoinKind::Cross => "cross join",
        }
    }
}

/// One join attached to a query.
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: Ident,
    pub query: Builder,
}

impl JoinClause {
    pub(crate) fn new(kind: JoinKind, table: Ident, query: Builder) -> Self {
        Self { kind, table, query }
    }

    fn map_query(mut self, f: impl FnOnce(Builder) -> Result<Builder>) -> Result<Self> {
        self.query = f(self.query)?;
        Ok(self)
    }

    /// Add an `and`-joined column comparison: `first operator second`.
    pub fn on(
        self,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.map_query(|q| q.where_column(first, operator, second))
    }

    /// Add an `or`-joined column comparison.
    pub fn or_on(
        self,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.map_query(|q| q.or_where_column(first, operator, second))
    }

    /// Add a value comparison against a bound parameter.
    pub fn where_(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.map_query(|q| q.where_(column, operator, value))
    }

    /// Add an `or`-joined value comparison.
    pub fn or_where_(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.map_query(|q| q.or_where_(column, operator, value))
    }

    /// Shorthand for an equality value comparison.
    pub fn where_eq(self, column: impl Into<Ident>, value: impl Into<Operand>) -> Result<Self> {
        self.map_query(|q| q.where_eq(column, value))
    }

    /// Add an `in` condition against bound parameters.
    pub fn where_in(
        self,
        column: impl Into<Ident>,
        values: impl IntoIterator<Item = impl Into<Operand>>,
    ) -> Result<Self> {
        self.map_query(|q| q.where_in(column, values))
    }

    /// Add an `is null` condition.
    pub fn where_null(self, column: impl Into<Ident>) -> Result<Self> {
        self.map_query(|q| Ok(q.where_null(column)))
    }

    /// Add an `is not null` condition.
    pub fn where_not_null(self, column: impl Into<Ident>) -> Result<Self> {
        self.map_query(|q| Ok(q.where_not_null(column)))
    }

    /// Add a raw condition fragment.
    pub fn where_raw(
        self,
        sql: &str,
        bindings: impl IntoIterator<Item = impl Into<quill_core::Value>>,
    ) -> Result<Self> {
        self.map_query(|q| q.where_raw(sql, bindings))
    }

    /// Nest a parenthesized condition group.
    pub fn where_nested(
        self,
        build: impl FnOnce(Builder) -> Result<Builder>,
    ) -> Result<Self> {
        self.map_query(|q| q.where_nested(build))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_kind_keywords() {
        assert_eq!(JoinKind::Inner.as_str(), "inner join");
        assert_eq!(JoinKind::Left.as_str(), "left join");
        assert_eq!(JoinKind::Right.as_str(), "right join");
        assert_eq!(JoinKind::Cross.as_str(), "cross join");
    }
}
