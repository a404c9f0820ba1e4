//! The fluent query builder.
//!
//! A [`Builder`] is a mutable description of one SQL statement: column
//! list, table, joins, predicate tree, grouping, ordering, paging and
//! set operations. Nothing is compiled until a terminal method asks the
//! attached [`Grammar`] for SQL text; parameter values are captured into
//! the builder's binding buckets at mutation time, so compiling the same
//! builder twice yields identical text and identical bindings.

use std::fmt;
use std::sync::Arc;

use asupersync::{Cx, Outcome};
use quill_core::{Connection, Error, Result, Row, Value};

use crate::clause::{
    Aggregate, Assignment, BindingKind, Bindings, Conjunction, DatePart, Direction, Distinct,
    Having, Operand, Order, Part, Union, WhereClause,
};
use crate::expression::Ident;
use crate::grammar::{
    GenericGrammar, Grammar, MySqlGrammar, PostgresGrammar, SqlServerGrammar, SqliteGrammar,
};
use crate::join::{JoinClause, JoinKind};

type BeforeQueryHook = Arc<dyn Fn(&mut Builder) + Send + Sync>;

/// A single SQL statement under construction.
#[derive(Clone)]
pub struct Builder {
    grammar: Arc<dyn Grammar>,
    pub(crate) columns: Vec<Ident>,
    pub(crate) distinct: Distinct,
    pub(crate) from: Option<Ident>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) wheres: Vec<WhereClause>,
    pub(crate) groups: Vec<Ident>,
    pub(crate) havings: Vec<Having>,
    pub(crate) orders: Vec<Order>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) unions: Vec<Union>,
    pub(crate) union_limit: Option<u64>,
    pub(crate) union_offset: Option<u64>,
    pub(crate) union_orders: Vec<Order>,
    pub(crate) aggregate: Option<Aggregate>,
    pub(crate) bindings: Bindings,
    before_query: Vec<BeforeQueryHook>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("grammar", &self.grammar.name())
            .field("columns", &self.columns)
            .field("distinct", &self.distinct)
            .field("from", &self.from)
            .field("joins", &self.joins)
            .field("wheres", &self.wheres)
            .field("groups", &self.groups)
            .field("havings", &self.havings)
            .field("orders", &self.orders)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("unions", &self.unions)
            .field("aggregate", &self.aggregate)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Create a builder that compiles through the given grammar.
    pub fn new(grammar: Arc<dyn Grammar>) -> Self {
        Self {
            grammar,
            columns: Vec::new(),
            distinct: Distinct::Off,
            from: None,
            joins: Vec::new(),
            wheres: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            unions: Vec::new(),
            union_limit: None,
            union_offset: None,
            union_orders: Vec::new(),
            aggregate: None,
            bindings: Bindings::default(),
            before_query: Vec::new(),
        }
    }

    /// Builder with the ANSI-flavored generic grammar.
    pub fn generic() -> Self {
        Self::new(Arc::new(GenericGrammar))
    }

    /// Builder targeting MySQL.
    pub fn mysql() -> Self {
        Self::new(Arc::new(MySqlGrammar))
    }

    /// Builder targeting PostgreSQL.
    pub fn postgres() -> Self {
        Self::new(Arc::new(PostgresGrammar))
    }

    /// Builder targeting SQLite.
    pub fn sqlite() -> Self {
        Self::new(Arc::new(SqliteGrammar))
    }

    /// Builder targeting SQL Server.
    pub fn sqlserver() -> Self {
        Self::new(Arc::new(SqlServerGrammar))
    }

    /// The grammar this builder compiles through.
    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    /// A fresh empty builder sharing this builder's grammar, used for
    /// sub-queries so both sides compile with the same dialect.
    pub fn new_query(&self) -> Self {
        Self::new(Arc::clone(&self.grammar))
    }

    fn prepare_operator(&self, operator: &str) -> Result<String> {
        let op = operator.trim().to_ascii_lowercase();
        if self.grammar.operators().contains(&op.as_str()) {
            Ok(op)
        } else {
            Err(Error::invalid_argument(format!(
                "illegal operator \"{operator}\""
            )))
        }
    }

    fn bind_operand(&mut self, kind: BindingKind, operand: &Operand) {
        if let Operand::Value(v) = operand {
            self.bindings.push(kind, v.clone());
        }
    }

    // ---- select ----------------------------------------------------------

    /// Set the column list, replacing any previous selection.
    pub fn select<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self.bindings.clear(BindingKind::Select);
        self
    }

    /// Append columns to the selection.
    pub fn add_select<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append a raw select fragment with optional bindings.
    pub fn select_raw<B>(mut self, sql: &str, bindings: B) -> Self
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        self.columns.push(Ident::raw(sql));
        self.bindings
            .extend(BindingKind::Select, bindings.into_iter().map(Into::into));
        self
    }

    /// Append a sub-query select, aliased. The sub-query is compiled
    /// immediately and its bindings move into the select bucket.
    pub fn select_sub(
        mut self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        alias: &str,
    ) -> Result<Self> {
        let sub = build(self.new_query())?;
        let sql = self.grammar.compile_select(&sub)?;
        let alias_sql = self.grammar.wrap(&Ident::from(alias))?;
        self.columns.push(Ident::raw(format!("({sql}) as {alias_sql}")));
        self.bindings
            .extend(BindingKind::Select, sub.bindings.flatten());
        Ok(self)
    }

    /// Select only distinct rows.
    pub fn distinct(mut self) -> Self {
        self.distinct = Distinct::All;
        self
    }

    /// `distinct on (columns)`, for grammars that support it.
    pub fn distinct_on<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.distinct = Distinct::Columns(columns.into_iter().map(Into::into).collect());
        self
    }

    // ---- from ------------------------------------------------------------

    /// Set the table the query targets. Accepts `"table"` or
    /// `"table as alias"`.
    pub fn from(mut self, table: impl Into<Ident>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Set a raw from fragment with optional bindings.
    pub fn from_raw<B>(mut self, sql: &str, bindings: B) -> Self
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        self.from = Some(Ident::raw(sql));
        self.bindings
            .extend(BindingKind::From, bindings.into_iter().map(Into::into));
        self
    }

    /// Select from an aliased sub-query.
    pub fn from_sub(
        self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        alias: &str,
    ) -> Result<Self> {
        let sub = build(self.new_query())?;
        self.from_sub_builder(&sub, alias)
    }

    fn from_sub_builder(mut self, sub: &Builder, alias: &str) -> Result<Self> {
        let sql = self.grammar.compile_select(sub)?;
        let alias_sql = self.grammar.wrap_table(&Ident::from(alias))?;
        self.from = Some(Ident::raw(format!("({sql}) as {alias_sql}")));
        self.bindings
            .extend(BindingKind::From, sub.bindings.flatten());
        Ok(self)
    }

    // ---- joins -----------------------------------------------------------

    fn add_join(mut self, mut join: JoinClause) -> Self {
        let params = std::mem::take(&mut join.query.bindings);
        self.bindings.extend(BindingKind::Join, params.flatten());
        self.joins.push(join);
        self
    }

    fn join_with(
        self,
        kind: JoinKind,
        table: Ident,
        first: Ident,
        operator: &str,
        second: Ident,
    ) -> Result<Self> {
        let join = JoinClause::new(kind, table, self.new_query()).on(first, operator, second)?;
        Ok(self.add_join(join))
    }

    /// Inner join with a single `on` equality/comparison.
    pub fn join(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.join_with(JoinKind::Inner, table.into(), first.into(), operator, second.into())
    }

    /// Inner join with a freely built condition list.
    pub fn join_on(
        self,
        table: impl Into<Ident>,
        build: impl FnOnce(JoinClause) -> Result<JoinClause>,
    ) -> Result<Self> {
        let join = build(JoinClause::new(JoinKind::Inner, table.into(), self.new_query()))?;
        Ok(self.add_join(join))
    }

    /// Inner join constrained by a bound value comparison.
    pub fn join_where(
        self,
        table: impl Into<Ident>,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        let join = JoinClause::new(JoinKind::Inner, table.into(), self.new_query())
            .where_(column, operator, value)?;
        Ok(self.add_join(join))
    }

    /// Left join with a single `on` comparison.
    pub fn left_join(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.join_with(JoinKind::Left, table.into(), first.into(), operator, second.into())
    }

    /// Left join with a freely built condition list.
    pub fn left_join_on(
        self,
        table: impl Into<Ident>,
        build: impl FnOnce(JoinClause) -> Result<JoinClause>,
    ) -> Result<Self> {
        let join = build(JoinClause::new(JoinKind::Left, table.into(), self.new_query()))?;
        Ok(self.add_join(join))
    }

    /// Right join with a single `on` comparison.
    pub fn right_join(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.join_with(JoinKind::Right, table.into(), first.into(), operator, second.into())
    }

    /// Cross join against a table.
    pub fn cross_join(self, table: impl Into<Ident>) -> Self {
        let join = JoinClause::new(JoinKind::Cross, table.into(), self.new_query());
        self.add_join(join)
    }

    fn sub_join_table(&mut self, sub: &Builder, alias: &str) -> Result<Ident> {
        let sql = self.grammar.compile_select(sub)?;
        let alias_sql = self.grammar.wrap_table(&Ident::from(alias))?;
        self.bindings
            .extend(BindingKind::Join, sub.bindings.flatten());
        Ok(Ident::raw(format!("({sql}) as {alias_sql}")))
    }

    fn join_sub_with(
        mut self,
        kind: JoinKind,
        build: impl FnOnce(Builder) -> Result<Builder>,
        alias: &str,
        first: Ident,
        operator: &str,
        second: Ident,
    ) -> Result<Self> {
        let sub = build(self.new_query())?;
        let table = self.sub_join_table(&sub, alias)?;
        self.join_with(kind, table, first, operator, second)
    }

    /// Inner join against an aliased sub-query.
    pub fn join_sub(
        self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        alias: &str,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.join_sub_with(JoinKind::Inner, build, alias, first.into(), operator, second.into())
    }

    /// Left join against an aliased sub-query.
    pub fn left_join_sub(
        self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        alias: &str,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.join_sub_with(JoinKind::Left, build, alias, first.into(), operator, second.into())
    }

    /// Right join against an aliased sub-query.
    pub fn right_join_sub(
        self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        alias: &str,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.join_sub_with(JoinKind::Right, build, alias, first.into(), operator, second.into())
    }

    /// Cross join against an aliased sub-query.
    pub fn cross_join_sub(
        mut self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        alias: &str,
    ) -> Result<Self> {
        let sub = build(self.new_query())?;
        let table = self.sub_join_table(&sub, alias)?;
        let join = JoinClause::new(JoinKind::Cross, table, self.new_query());
        Ok(self.add_join(join))
    }

    // ---- where -----------------------------------------------------------

    fn where_with(
        mut self,
        column: Ident,
        operator: &str,
        value: Operand,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let operator = self.prepare_operator(operator)?;
        if matches!(value, Operand::Value(Value::Null)) {
            return match operator.as_str() {
                "=" => Ok(self.where_null_with(column, false, conjunction)),
                "!=" | "<>" => Ok(self.where_null_with(column, true, conjunction)),
                _ => Err(Error::invalid_argument(
                    "illegal operator and value combination",
                )),
            };
        }
        self.bind_operand(BindingKind::Where, &value);
        self.wheres.push(WhereClause::Basic {
            column,
            operator,
            value,
            conjunction,
        });
        Ok(self)
    }

    /// Add an `and`-joined comparison against a bound value.
    ///
    /// A null value with `=` becomes `is null`; with `!=`/`<>` it
    /// becomes `is not null`; any other operator with null is rejected.
    pub fn where_(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.where_with(column.into(), operator, value.into(), Conjunction::And)
    }

    /// Add an `or`-joined comparison against a bound value.
    pub fn or_where_(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.where_with(column.into(), operator, value.into(), Conjunction::Or)
    }

    /// Shorthand for `where_(column, "=", value)`.
    pub fn where_eq(self, column: impl Into<Ident>, value: impl Into<Operand>) -> Result<Self> {
        self.where_with(column.into(), "=", value.into(), Conjunction::And)
    }

    /// Shorthand for `or_where_(column, "=", value)`.
    pub fn or_where_eq(self, column: impl Into<Ident>, value: impl Into<Operand>) -> Result<Self> {
        self.where_with(column.into(), "=", value.into(), Conjunction::Or)
    }

    /// Add an `and`-joined equality for each pair.
    pub fn where_pairs<K, V, I>(mut self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Ident>,
        V: Into<Operand>,
    {
        for (column, value) in pairs {
            self = self.where_eq(column, value)?;
        }
        Ok(self)
    }

    fn where_in_with(
        mut self,
        column: Ident,
        values: Vec<Operand>,
        not: bool,
        conjunction: Conjunction,
    ) -> Self {
        for operand in &values {
            self.bind_operand(BindingKind::Where, operand);
        }
        self.wheres.push(WhereClause::In {
            column,
            values,
            not,
            conjunction,
        });
        self
    }

    /// `column in (values)`. An empty list compiles to `0 = 1`.
    pub fn where_in<I>(self, column: impl Into<Ident>, values: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Operand>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Ok(self.where_in_with(column.into(), values, false, Conjunction::And))
    }

    /// `or column in (values)`.
    pub fn or_where_in<I>(self, column: impl Into<Ident>, values: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Operand>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Ok(self.where_in_with(column.into(), values, false, Conjunction::Or))
    }

    /// `column not in (values)`. An empty list compiles to `1 = 1`.
    pub fn where_not_in<I>(self, column: impl Into<Ident>, values: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Operand>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Ok(self.where_in_with(column.into(), values, true, Conjunction::And))
    }

    /// `or column not in (values)`.
    pub fn or_where_not_in<I>(self, column: impl Into<Ident>, values: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Operand>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Ok(self.where_in_with(column.into(), values, true, Conjunction::Or))
    }

    fn where_in_sub_with(
        mut self,
        column: Ident,
        build: impl FnOnce(Builder) -> Result<Builder>,
        not: bool,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let mut sub = build(self.new_query())?;
        let params = std::mem::take(&mut sub.bindings);
        self.bindings.extend(BindingKind::Where, params.flatten());
        self.wheres.push(WhereClause::InSub {
            column,
            query: Box::new(sub),
            not,
            conjunction,
        });
        Ok(self)
    }

    /// `column in (select …)`.
    pub fn where_in_sub(
        self,
        column: impl Into<Ident>,
        build: impl FnOnce(Builder) -> Result<Builder>,
    ) -> Result<Self> {
        self.where_in_sub_with(column.into(), build, false, Conjunction::And)
    }

    /// `column not in (select …)`.
    pub fn where_not_in_sub(
        self,
        column: impl Into<Ident>,
        build: impl FnOnce(Builder) -> Result<Builder>,
    ) -> Result<Self> {
        self.where_in_sub_with(column.into(), build, true, Conjunction::And)
    }

    fn where_null_with(mut self, column: Ident, not: bool, conjunction: Conjunction) -> Self {
        self.wheres.push(WhereClause::Null {
            column,
            not,
            conjunction,
        });
        self
    }

    /// `column is null`.
    pub fn where_null(self, column: impl Into<Ident>) -> Self {
        self.where_null_with(column.into(), false, Conjunction::And)
    }

    /// `or column is null`.
    pub fn or_where_null(self, column: impl Into<Ident>) -> Self {
        self.where_null_with(column.into(), false, Conjunction::Or)
    }

    /// `column is not null`.
    pub fn where_not_null(self, column: impl Into<Ident>) -> Self {
        self.where_null_with(column.into(), true, Conjunction::And)
    }

    /// `or column is not null`.
    pub fn or_where_not_null(self, column: impl Into<Ident>) -> Self {
        self.where_null_with(column.into(), true, Conjunction::Or)
    }

    fn where_between_with(
        mut self,
        column: Ident,
        low: Operand,
        high: Operand,
        not: bool,
        conjunction: Conjunction,
    ) -> Self {
        self.bind_operand(BindingKind::Where, &low);
        self.bind_operand(BindingKind::Where, &high);
        self.wheres.push(WhereClause::Between {
            column,
            low,
            high,
            not,
            conjunction,
        });
        self
    }

    /// `column between low and high`.
    pub fn where_between(
        self,
        column: impl Into<Ident>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.where_between_with(column.into(), low.into(), high.into(), false, Conjunction::And)
    }

    /// `or column between low and high`.
    pub fn or_where_between(
        self,
        column: impl Into<Ident>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.where_between_with(column.into(), low.into(), high.into(), false, Conjunction::Or)
    }

    /// `column not between low and high`.
    pub fn where_not_between(
        self,
        column: impl Into<Ident>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.where_between_with(column.into(), low.into(), high.into(), true, Conjunction::And)
    }

    /// `or column not between low and high`.
    pub fn or_where_not_between(
        self,
        column: impl Into<Ident>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.where_between_with(column.into(), low.into(), high.into(), true, Conjunction::Or)
    }

    /// `column between low_column and high_column`, no bindings.
    pub fn where_between_columns(
        mut self,
        column: impl Into<Ident>,
        low: impl Into<Ident>,
        high: impl Into<Ident>,
    ) -> Self {
        self.wheres.push(WhereClause::BetweenColumns {
            column: column.into(),
            low: low.into(),
            high: high.into(),
            not: false,
            conjunction: Conjunction::And,
        });
        self
    }

    fn where_column_with(
        mut self,
        first: Ident,
        operator: &str,
        second: Ident,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let operator = self.prepare_operator(operator)?;
        self.wheres.push(WhereClause::Column {
            first,
            operator,
            second,
            conjunction,
        });
        Ok(self)
    }

    /// Compare two columns, no bindings.
    pub fn where_column(
        self,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.where_column_with(first.into(), operator, second.into(), Conjunction::And)
    }

    /// `or`-joined column comparison.
    pub fn or_where_column(
        self,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Result<Self> {
        self.where_column_with(first.into(), operator, second.into(), Conjunction::Or)
    }

    fn where_exists_with(
        mut self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        not: bool,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let mut sub = build(self.new_query())?;
        let params = std::mem::take(&mut sub.bindings);
        self.bindings.extend(BindingKind::Where, params.flatten());
        self.wheres.push(WhereClause::Exists {
            query: Box::new(sub),
            not,
            conjunction,
        });
        Ok(self)
    }

    /// `exists (select …)`.
    pub fn where_exists(self, build: impl FnOnce(Builder) -> Result<Builder>) -> Result<Self> {
        self.where_exists_with(build, false, Conjunction::And)
    }

    /// `or exists (select …)`.
    pub fn or_where_exists(self, build: impl FnOnce(Builder) -> Result<Builder>) -> Result<Self> {
        self.where_exists_with(build, false, Conjunction::Or)
    }

    /// `not exists (select …)`.
    pub fn where_not_exists(self, build: impl FnOnce(Builder) -> Result<Builder>) -> Result<Self> {
        self.where_exists_with(build, true, Conjunction::And)
    }

    /// `or not exists (select …)`.
    pub fn or_where_not_exists(
        self,
        build: impl FnOnce(Builder) -> Result<Builder>,
    ) -> Result<Self> {
        self.where_exists_with(build, true, Conjunction::Or)
    }

    /// `column operator (select …)`.
    pub fn where_sub(
        mut self,
        column: impl Into<Ident>,
        operator: &str,
        build: impl FnOnce(Builder) -> Result<Builder>,
    ) -> Result<Self> {
        let operator = self.prepare_operator(operator)?;
        let mut sub = build(self.new_query())?;
        let params = std::mem::take(&mut sub.bindings);
        self.bindings.extend(BindingKind::Where, params.flatten());
        self.wheres.push(WhereClause::Sub {
            column: column.into(),
            operator,
            query: Box::new(sub),
            conjunction: Conjunction::And,
        });
        Ok(self)
    }

    fn where_nested_with(
        mut self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let mut sub = build(self.new_query())?;
        if sub.wheres.is_empty() {
            return Ok(self);
        }
        let params = std::mem::take(&mut sub.bindings);
        self.bindings.extend(BindingKind::Where, params.flatten());
        self.wheres.push(WhereClause::Nested {
            query: Box::new(sub),
            conjunction,
        });
        Ok(self)
    }

    /// Group predicates in parentheses: `… and (a or b)`.
    pub fn where_nested(self, build: impl FnOnce(Builder) -> Result<Builder>) -> Result<Self> {
        self.where_nested_with(build, Conjunction::And)
    }

    /// `or`-joined parenthesized group.
    pub fn or_where_nested(self, build: impl FnOnce(Builder) -> Result<Builder>) -> Result<Self> {
        self.where_nested_with(build, Conjunction::Or)
    }

    fn where_raw_with<B>(mut self, sql: &str, bindings: B, conjunction: Conjunction) -> Self
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        self.bindings
            .extend(BindingKind::Where, bindings.into_iter().map(Into::into));
        self.wheres.push(WhereClause::Raw {
            sql: sql.into(),
            conjunction,
        });
        self
    }

    /// Raw predicate fragment with optional bindings.
    pub fn where_raw<B>(self, sql: &str, bindings: B) -> Result<Self>
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        Ok(self.where_raw_with(sql, bindings, Conjunction::And))
    }

    /// `or`-joined raw predicate fragment.
    pub fn or_where_raw<B>(self, sql: &str, bindings: B) -> Result<Self>
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        Ok(self.where_raw_with(sql, bindings, Conjunction::Or))
    }

    fn where_date_part(
        mut self,
        part: DatePart,
        column: Ident,
        operator: &str,
        value: Value,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let operator = self.prepare_operator(operator)?;
        // Day/month are zero-padded so text-producing grammars (SQLite's
        // strftime) compare consistently with numeric input.
        let value = match (part, value) {
            (DatePart::Day | DatePart::Month, Value::Int(n)) => Value::Text(format!("{n:02}")),
            (DatePart::Day | DatePart::Month, Value::BigInt(n)) => Value::Text(format!("{n:02}")),
            (_, v) => v,
        };
        self.bindings.push(BindingKind::Where, value.clone());
        self.wheres.push(WhereClause::DateBased {
            part,
            column,
            operator,
            value,
            conjunction,
        });
        Ok(self)
    }

    /// Compare the date portion of a column.
    pub fn where_date(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<Self> {
        self.where_date_part(DatePart::Date, column.into(), operator, value.into(), Conjunction::And)
    }

    /// Compare the day-of-month of a column.
    pub fn where_day(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<Self> {
        self.where_date_part(DatePart::Day, column.into(), operator, value.into(), Conjunction::And)
    }

    /// Compare the month of a column.
    pub fn where_month(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<Self> {
        self.where_date_part(DatePart::Month, column.into(), operator, value.into(), Conjunction::And)
    }

    /// Compare the year of a column.
    pub fn where_year(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<Self> {
        self.where_date_part(DatePart::Year, column.into(), operator, value.into(), Conjunction::And)
    }

    /// Compare the time portion of a column.
    pub fn where_time(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<Self> {
        self.where_date_part(DatePart::Time, column.into(), operator, value.into(), Conjunction::And)
    }

    // ---- group / having --------------------------------------------------

    /// Append grouping columns.
    pub fn group_by<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append a raw grouping fragment with optional bindings.
    pub fn group_by_raw<B>(mut self, sql: &str, bindings: B) -> Self
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        self.groups.push(Ident::raw(sql));
        self.bindings
            .extend(BindingKind::GroupBy, bindings.into_iter().map(Into::into));
        self
    }

    fn having_with(
        mut self,
        column: Ident,
        operator: &str,
        value: Operand,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let operator = self.prepare_operator(operator)?;
        self.bind_operand(BindingKind::Having, &value);
        self.havings.push(Having::Basic {
            column,
            operator,
            value,
            conjunction,
        });
        Ok(self)
    }

    /// Add a having comparison.
    pub fn having(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.having_with(column.into(), operator, value.into(), Conjunction::And)
    }

    /// `or`-joined having comparison.
    pub fn or_having(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.having_with(column.into(), operator, value.into(), Conjunction::Or)
    }

    /// `having column between low and high`.
    pub fn having_between(
        mut self,
        column: impl Into<Ident>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let (low, high) = (low.into(), high.into());
        self.bindings.push(BindingKind::Having, low.clone());
        self.bindings.push(BindingKind::Having, high.clone());
        self.havings.push(Having::Between {
            column: column.into(),
            low,
            high,
            not: false,
            conjunction: Conjunction::And,
        });
        self
    }

    fn having_raw_with<B>(mut self, sql: &str, bindings: B, conjunction: Conjunction) -> Self
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        self.bindings
            .extend(BindingKind::Having, bindings.into_iter().map(Into::into));
        self.havings.push(Having::Raw {
            sql: sql.into(),
            conjunction,
        });
        self
    }

    /// Raw having fragment with optional bindings.
    pub fn having_raw<B>(self, sql: &str, bindings: B) -> Self
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        self.having_raw_with(sql, bindings, Conjunction::And)
    }

    /// `or`-joined raw having fragment.
    pub fn or_having_raw<B>(self, sql: &str, bindings: B) -> Self
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        self.having_raw_with(sql, bindings, Conjunction::Or)
    }

    // ---- order / paging --------------------------------------------------

    fn order_by_direction(mut self, column: Ident, direction: Direction) -> Self {
        let order = Order::By { column, direction };
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    /// Order by a column; direction must be `asc` or `desc` (any case).
    pub fn order_by(self, column: impl Into<Ident>, direction: &str) -> Result<Self> {
        let direction = Direction::parse(direction)?;
        Ok(self.order_by_direction(column.into(), direction))
    }

    /// Order by a column ascending.
    pub fn order_by_asc(self, column: impl Into<Ident>) -> Self {
        self.order_by_direction(column.into(), Direction::Asc)
    }

    /// Order by a column descending.
    pub fn order_by_desc(self, column: impl Into<Ident>) -> Self {
        self.order_by_direction(column.into(), Direction::Desc)
    }

    /// Raw order fragment with optional bindings.
    pub fn order_by_raw<B>(mut self, sql: &str, bindings: B) -> Self
    where
        B: IntoIterator,
        B::Item: Into<Value>,
    {
        let kind = if self.unions.is_empty() {
            BindingKind::Order
        } else {
            BindingKind::UnionOrder
        };
        self.bindings.extend(kind, bindings.into_iter().map(Into::into));
        let order = Order::Raw(sql.into());
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    /// Drop all ordering, including order bindings.
    pub fn reorder(mut self) -> Self {
        self.orders.clear();
        self.union_orders.clear();
        self.bindings.clear(BindingKind::Order);
        self.bindings.clear(BindingKind::UnionOrder);
        self
    }

    /// Replace all ordering with a single column order.
    pub fn reorder_by(self, column: impl Into<Ident>, direction: &str) -> Result<Self> {
        self.reorder().order_by(column, direction)
    }

    /// Cap the number of returned rows. Negative values are ignored and
    /// leave any previous limit in place.
    pub fn limit(mut self, value: i64) -> Self {
        if value >= 0 {
            let slot = if self.unions.is_empty() {
                &mut self.limit
            } else {
                &mut self.union_limit
            };
            *slot = Some(value as u64);
        }
        self
    }

    /// Alias for [`Builder::limit`].
    pub fn take(self, value: i64) -> Self {
        self.limit(value)
    }

    /// Skip rows before returning. Negative values clamp to zero.
    pub fn offset(mut self, value: i64) -> Self {
        let slot = if self.unions.is_empty() {
            &mut self.offset
        } else {
            &mut self.union_offset
        };
        *slot = Some(value.max(0) as u64);
        self
    }

    /// Alias for [`Builder::offset`].
    pub fn skip(self, value: i64) -> Self {
        self.offset(value)
    }

    /// Limit/offset for 1-based page numbering.
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let skipped = page.saturating_sub(1).saturating_mul(per_page);
        self.offset(skipped.min(i64::MAX as u64) as i64)
            .limit(per_page.min(i64::MAX as u64) as i64)
    }

    // ---- unions ----------------------------------------------------------

    fn union_with(
        mut self,
        build: impl FnOnce(Builder) -> Result<Builder>,
        all: bool,
    ) -> Result<Self> {
        let mut sub = build(self.new_query())?;
        let params = std::mem::take(&mut sub.bindings);
        self.bindings.extend(BindingKind::Union, params.flatten());
        self.unions.push(Union {
            query: Box::new(sub),
            all,
        });
        Ok(self)
    }

    /// Combine with another query via `union`.
    pub fn union(self, build: impl FnOnce(Builder) -> Result<Builder>) -> Result<Self> {
        self.union_with(build, false)
    }

    /// Combine with another query via `union all`.
    pub fn union_all(self, build: impl FnOnce(Builder) -> Result<Builder>) -> Result<Self> {
        self.union_with(build, true)
    }

    // ---- hooks -----------------------------------------------------------

    /// Register a callback to run against the builder right before any
    /// statement is compiled. Callbacks run on a private copy, so they
    /// observe and mutate the final query without altering the original.
    pub fn before_query(mut self, callback: impl Fn(&mut Builder) + Send + Sync + 'static) -> Self {
        self.before_query.push(Arc::new(callback));
        self
    }

    fn with_before_query<R>(&self, f: impl FnOnce(&Builder) -> R) -> R {
        if self.before_query.is_empty() {
            return f(self);
        }
        let mut query = self.clone();
        let hooks = std::mem::take(&mut query.before_query);
        for hook in &hooks {
            hook(&mut query);
        }
        f(&query)
    }

    // ---- cloning ---------------------------------------------------------

    /// Deep copy with the given parts reset.
    pub fn clone_without(&self, parts: &[Part]) -> Self {
        let mut clone = self.clone();
        for part in parts {
            match part {
                Part::Columns => clone.columns.clear(),
                Part::Wheres => clone.wheres.clear(),
                Part::Orders => {
                    clone.orders.clear();
                    clone.union_orders.clear();
                }
                Part::Limit => {
                    clone.limit = None;
                    clone.union_limit = None;
                }
                Part::Offset => {
                    clone.offset = None;
                    clone.union_offset = None;
                }
                Part::Unions => clone.unions.clear(),
            }
        }
        clone
    }

    /// Deep copy with the given binding buckets emptied.
    pub fn clone_without_bindings(&self, kinds: &[BindingKind]) -> Self {
        let mut clone = self.clone();
        for kind in kinds {
            clone.bindings.clear(*kind);
        }
        clone
    }

    /// Copy prepared for a pagination total: ordering and paging removed.
    pub fn clone_for_pagination_count(&self) -> Self {
        let mut clone = self.clone_without(&[Part::Orders, Part::Limit, Part::Offset]);
        clone.bindings.clear(BindingKind::Order);
        clone.bindings.clear(BindingKind::UnionOrder);
        clone
    }

    // ---- compilation -----------------------------------------------------

    /// Compile the select statement to SQL text.
    pub fn to_sql(&self) -> Result<String> {
        self.with_before_query(|q| q.grammar.compile_select(q))
    }

    /// All bound parameters flattened in placeholder order.
    pub fn bindings(&self) -> Vec<Value> {
        self.with_before_query(|q| q.bindings.flatten())
    }

    /// The raw binding buckets, before any pre-query hooks run.
    pub fn raw_bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// SQL text plus flattened bindings in one call.
    pub fn to_sql_with_bindings(&self) -> Result<(String, Vec<Value>)> {
        self.with_before_query(|q| Ok((q.grammar.compile_select(q)?, q.bindings.flatten())))
    }

    /// The select rewritten as an existence probe.
    pub fn exists_statement(&self) -> Result<(String, Vec<Value>)> {
        self.with_before_query(|q| Ok((q.grammar.compile_exists(q)?, q.bindings.flatten())))
    }

    /// The select rewritten around an aggregate function.
    ///
    /// The receiving query is not mutated; the aggregate is installed on
    /// an internal copy whose plain column list is dropped.
    pub fn aggregate_statement<I>(&self, function: &str, columns: I) -> Result<(String, Vec<Value>)>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        let columns: Vec<Ident> = columns.into_iter().map(Into::into).collect();
        self.with_before_query(|q| {
            let mut target = if q.unions.is_empty() && q.havings.is_empty() {
                let mut c = q.clone_without(&[Part::Columns]);
                c.bindings.clear(BindingKind::Select);
                c
            } else {
                q.clone()
            };
            target.aggregate = Some(Aggregate {
                function: function.to_ascii_lowercase(),
                columns,
            });
            let sql = q.grammar.compile_select(&target)?;
            Ok((sql, target.bindings.flatten()))
        })
    }

    fn normalize_records<R, S, O, I>(records: I) -> Result<(Vec<String>, Vec<Vec<Operand>>)>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<Operand>> = Vec::new();
        for (index, record) in records.into_iter().enumerate() {
            let mut record: Vec<(String, Operand)> = record
                .into_iter()
                .map(|(c, v)| (c.into(), v.into()))
                .collect();
            if index == 0 {
                columns = record.iter().map(|(c, _)| c.clone()).collect();
                for (i, column) in columns.iter().enumerate() {
                    if columns[..i].contains(column) {
                        return Err(Error::invalid_argument(format!(
                            "record 0 lists column \"{column}\" more than once"
                        )));
                    }
                }
                rows.push(record.into_iter().map(|(_, v)| v).collect());
            } else {
                // Later records may list columns in any order, but the
                // column set must match the first record exactly.
                let mut row = Vec::with_capacity(columns.len());
                for column in &columns {
                    let pos = record
                        .iter()
                        .position(|(c, _)| c == column)
                        .ok_or_else(|| {
                            Error::invalid_argument(format!(
                                "record {index} is missing column \"{column}\""
                            ))
                        })?;
                    row.push(record.swap_remove(pos).1);
                }
                if let Some((name, _)) = record.first() {
                    return Err(Error::invalid_argument(format!(
                        "record {index} has unexpected column \"{name}\""
                    )));
                }
                rows.push(row);
            }
        }
        Ok((columns, rows))
    }

    fn row_params(rows: &[Vec<Operand>]) -> Vec<Value> {
        rows.iter()
            .flat_map(|row| row.iter().filter_map(Operand::as_value).cloned())
            .collect()
    }

    /// Compile a multi-row insert.
    pub fn insert_statement<R, S, O, I>(&self, records: I) -> Result<(String, Vec<Value>)>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (columns, rows) = Self::normalize_records(records)?;
        if rows.is_empty() {
            return Err(Error::invalid_argument("insert requires at least one record"));
        }
        self.with_before_query(|q| {
            let sql = q.grammar.compile_insert(q, &columns, &rows)?;
            Ok((sql, Self::row_params(&rows)))
        })
    }

    /// Compile an insert that skips conflicting rows, where the grammar
    /// supports one.
    pub fn insert_or_ignore_statement<R, S, O, I>(&self, records: I) -> Result<(String, Vec<Value>)>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (columns, rows) = Self::normalize_records(records)?;
        if rows.is_empty() {
            return Err(Error::invalid_argument("insert requires at least one record"));
        }
        self.with_before_query(|q| {
            let sql = q.grammar.compile_insert_or_ignore(q, &columns, &rows)?;
            Ok((sql, Self::row_params(&rows)))
        })
    }

    /// Compile a single-row insert that yields the generated key.
    pub fn insert_get_id_statement<R, S, O>(
        &self,
        record: R,
        sequence: Option<&str>,
    ) -> Result<(String, Vec<Value>)>
    where
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (columns, rows) = Self::normalize_records(std::iter::once(record))?;
        let row = rows.first().ok_or_else(|| {
            Error::invalid_argument("insert requires at least one record")
        })?;
        self.with_before_query(|q| {
            let sql = q
                .grammar
                .compile_insert_get_id(q, &columns, row, sequence.unwrap_or("id"))?;
            Ok((sql, Self::row_params(&rows)))
        })
    }

    /// Compile `insert into … select …` from a sub-query.
    pub fn insert_using_statement(
        &self,
        columns: &[&str],
        build: impl FnOnce(Builder) -> Result<Builder>,
    ) -> Result<(String, Vec<Value>)> {
        let sub = build(self.new_query())?;
        self.with_before_query(|q| {
            let select_sql = q.grammar.compile_select(&sub)?;
            let sql = q.grammar.compile_insert_using(q, columns, &select_sql)?;
            Ok((sql, sub.bindings.flatten()))
        })
    }

    /// Compile an update constrained by this query's wheres and joins.
    pub fn update_statement<S, O, I>(&self, assignments: I) -> Result<(String, Vec<Value>)>
    where
        I: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let assignments: Vec<(String, Operand)> = assignments
            .into_iter()
            .map(|(c, v)| (c.into(), v.into()))
            .collect();
        self.with_before_query(|q| {
            let sql = q.grammar.compile_update(q, &assignments)?;
            let values: Vec<Value> = assignments
                .iter()
                .filter_map(|(_, v)| v.as_value().cloned())
                .collect();
            Ok((sql, q.grammar.prepare_update_bindings(q, values)))
        })
    }

    /// Compile an insert-or-update on key conflict.
    ///
    /// `update` defaults to refreshing every inserted column; an
    /// explicitly empty list degrades to insert-or-ignore.
    pub fn upsert_statement<R, S, O, I>(
        &self,
        records: I,
        unique_by: &[&str],
        update: Option<Vec<Assignment>>,
    ) -> Result<(String, Vec<Value>)>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (columns, rows) = Self::normalize_records(records)?;
        if rows.is_empty() {
            return Err(Error::invalid_argument("upsert requires at least one record"));
        }
        let update = match update {
            Some(update) if update.is_empty() => {
                return self.with_before_query(|q| {
                    let sql = q.grammar.compile_insert_or_ignore(q, &columns, &rows)?;
                    Ok((sql, Self::row_params(&rows)))
                });
            }
            Some(update) => update,
            None => columns.iter().map(|c| Assignment::Column(c.clone())).collect(),
        };
        let unique_by: Vec<String> = unique_by.iter().map(|c| (*c).to_string()).collect();
        self.with_before_query(|q| {
            let sql = q
                .grammar
                .compile_upsert(q, &columns, &rows, &unique_by, &update)?;
            let mut params = Self::row_params(&rows);
            for assignment in &update {
                if let Assignment::Pair(_, Operand::Value(v)) = assignment {
                    params.push(v.clone());
                }
            }
            Ok((sql, params))
        })
    }

    /// Compile a delete constrained by this query's wheres.
    pub fn delete_statement(&self) -> Result<(String, Vec<Value>)> {
        self.with_before_query(|q| {
            let sql = q.grammar.compile_delete(q)?;
            Ok((sql, q.grammar.prepare_delete_bindings(q)))
        })
    }

    /// Compile the statement sequence that empties the table.
    pub fn truncate_statements(&self) -> Result<Vec<(String, Vec<Value>)>> {
        self.with_before_query(|q| q.grammar.compile_truncate(q))
    }

    // ---- execution -------------------------------------------------------

    fn result_key(column: &str) -> &str {
        let lower = column.to_ascii_lowercase();
        if let Some(pos) = lower.find(" as ") {
            &column[pos + 4..]
        } else {
            column.rsplit('.').next().unwrap_or(column)
        }
    }

    /// Run the select and return all rows.
    pub async fn get<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<Vec<Row>, Error> {
        let (sql, params) = match self.to_sql_with_bindings() {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, params = params.len(), "select");
        conn.query(cx, &sql, &params)
            .await
            .map(|rows| conn.post_processor().process_select(rows))
    }

    /// Run the select capped to one row.
    pub async fn first<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<Option<Row>, Error> {
        let query = self.clone().take(1);
        let (sql, params) = match query.to_sql_with_bindings() {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, params = params.len(), "select first");
        conn.query_one(cx, &sql, &params)
            .await
            .map(|row| row.and_then(|r| conn.post_processor().process_select(vec![r]).pop()))
    }

    /// Fetch a single row by its `id` column.
    pub async fn find<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        id: impl Into<Value>,
    ) -> Outcome<Option<Row>, Error> {
        match self.clone().where_eq("id", Operand::Value(id.into())) {
            Ok(query) => query.first(cx, conn).await,
            Err(e) => Outcome::Err(e),
        }
    }

    /// Fetch a single column value from the first row.
    pub async fn value<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        column: &str,
    ) -> Outcome<Option<Value>, Error> {
        let query = self.clone().select([column]);
        query.first(cx, conn).await.map(|row| {
            row.and_then(|r| r.get_by_name(Self::result_key(column)).cloned())
        })
    }

    /// Fetch one column across all rows.
    pub async fn pluck<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        column: &str,
    ) -> Outcome<Vec<Value>, Error> {
        let query = self.clone().select([column]);
        query.get(cx, conn).await.map(|rows| {
            let key = Self::result_key(column);
            rows.iter()
                .map(|r| r.get_by_name(key).cloned().unwrap_or(Value::Null))
                .collect()
        })
    }

    /// Fetch one column and join its text values with a separator.
    pub async fn implode<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        column: &str,
        glue: &str,
    ) -> Outcome<String, Error> {
        self.pluck(cx, conn, column).await.map(|values| {
            values
                .iter()
                .map(|v| v.to_text())
                .collect::<Vec<_>>()
                .join(glue)
        })
    }

    /// True if at least one row matches.
    pub async fn exists<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<bool, Error> {
        let (sql, params) = match self.exists_statement() {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, "exists probe");
        conn.query_one(cx, &sql, &params).await.map(|row| {
            row.is_some_and(|r| match r.get_by_name("exists") {
                Some(Value::Bool(b)) => *b,
                Some(v) => v.as_i64().is_some_and(|n| n != 0),
                None => false,
            })
        })
    }

    /// True if no rows match.
    pub async fn doesnt_exist<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<bool, Error> {
        self.exists(cx, conn).await.map(|found| !found)
    }

    /// Run an aggregate function and return its value.
    pub async fn aggregate<C, I>(
        &self,
        cx: &Cx,
        conn: &C,
        function: &str,
        columns: I,
    ) -> Outcome<Option<Value>, Error>
    where
        C: Connection,
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        let (sql, params) = match self.aggregate_statement(function, columns) {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, function, "aggregate");
        conn.query_one(cx, &sql, &params)
            .await
            .map(|row| row.and_then(|r| r.get_by_name("aggregate").cloned()))
    }

    /// Count matching rows.
    pub async fn count<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<u64, Error> {
        self.aggregate(cx, conn, "count", ["*"]).await.map(|value| {
            value.and_then(|v| v.as_i64()).map_or(0, |n| n.max(0) as u64)
        })
    }

    /// Minimum of a column, or none when no rows match.
    pub async fn min<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        column: &str,
    ) -> Outcome<Option<Value>, Error> {
        self.aggregate(cx, conn, "min", [column]).await
    }

    /// Maximum of a column, or none when no rows match.
    pub async fn max<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        column: &str,
    ) -> Outcome<Option<Value>, Error> {
        self.aggregate(cx, conn, "max", [column]).await
    }

    /// Sum of a column; an empty result sums to zero.
    pub async fn sum<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        column: &str,
    ) -> Outcome<Value, Error> {
        self.aggregate(cx, conn, "sum", [column]).await.map(|value| {
            match value {
                None | Some(Value::Null) => Value::Int(0),
                Some(v) => v,
            }
        })
    }

    /// Average of a column, or none when no rows match.
    pub async fn avg<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        column: &str,
    ) -> Outcome<Option<Value>, Error> {
        self.aggregate(cx, conn, "avg", [column]).await
    }

    /// Insert one or more records. Inserting nothing is a no-op.
    pub async fn insert<C, R, S, O, I>(&self, cx: &Cx, conn: &C, records: I) -> Outcome<u64, Error>
    where
        C: Connection,
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (columns, rows) = match Self::normalize_records(records) {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        if rows.is_empty() {
            return Outcome::Ok(0);
        }
        let compiled = self.with_before_query(|q| {
            let sql = q.grammar.compile_insert(q, &columns, &rows)?;
            Ok::<_, Error>((sql, Self::row_params(&rows)))
        });
        let (sql, params) = match compiled {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, rows = rows.len(), "insert");
        conn.execute(cx, &sql, &params).await
    }

    /// Insert records, skipping conflicts where the grammar supports it.
    pub async fn insert_or_ignore<C, R, S, O, I>(
        &self,
        cx: &Cx,
        conn: &C,
        records: I,
    ) -> Outcome<u64, Error>
    where
        C: Connection,
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (sql, params) = match self.insert_or_ignore_statement(records) {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, "insert or ignore");
        conn.execute(cx, &sql, &params).await
    }

    /// Insert one record and return its generated key.
    pub async fn insert_get_id<C, R, S, O>(
        &self,
        cx: &Cx,
        conn: &C,
        record: R,
        sequence: Option<&str>,
    ) -> Outcome<i64, Error>
    where
        C: Connection,
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (sql, params) = match self.insert_get_id_statement(record, sequence) {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, "insert returning id");
        if self.grammar.insert_get_id_uses_returning() {
            conn.query(cx, &sql, &params).await.and_then(|rows| {
                let sequence = sequence.unwrap_or("id");
                match conn
                    .post_processor()
                    .process_insert_get_id(rows.first(), sequence)
                {
                    Ok(id) => Outcome::Ok(id),
                    Err(e) => Outcome::Err(e),
                }
            })
        } else {
            conn.insert(cx, &sql, &params).await
        }
    }

    /// Insert rows produced by a sub-query.
    pub async fn insert_using<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        columns: &[&str],
        build: impl FnOnce(Builder) -> Result<Builder>,
    ) -> Outcome<u64, Error> {
        let (sql, params) = match self.insert_using_statement(columns, build) {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, "insert from select");
        conn.execute(cx, &sql, &params).await
    }

    /// Update matching rows and return the affected count.
    pub async fn update<C, S, O, I>(&self, cx: &Cx, conn: &C, assignments: I) -> Outcome<u64, Error>
    where
        C: Connection,
        I: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (sql, params) = match self.update_statement(assignments) {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, params = params.len(), "update");
        conn.execute(cx, &sql, &params).await
    }

    /// Insert-or-update records on key conflict.
    pub async fn upsert<C, R, S, O, I>(
        &self,
        cx: &Cx,
        conn: &C,
        records: I,
        unique_by: &[&str],
        update: Option<Vec<Assignment>>,
    ) -> Outcome<u64, Error>
    where
        C: Connection,
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (S, O)>,
        S: Into<String>,
        O: Into<Operand>,
    {
        let (sql, params) = match self.upsert_statement(records, unique_by, update) {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, "upsert");
        conn.execute(cx, &sql, &params).await
    }

    /// Delete matching rows and return the affected count.
    pub async fn delete<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<u64, Error> {
        let (sql, params) = match self.delete_statement() {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, params = params.len(), "delete");
        conn.execute(cx, &sql, &params).await
    }

    /// Empty the table, resetting any auto-increment state the grammar
    /// knows how to reset.
    pub async fn truncate<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<(), Error> {
        let statements = match self.truncate_statements() {
            Ok(v) => v,
            Err(e) => return Outcome::Err(e),
        };
        for (sql, params) in statements {
            tracing::debug!(sql = %sql, "truncate");
            match conn.statement(cx, &sql, &params).await {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }
        Outcome::Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(builder: &Builder) -> String {
        builder.to_sql().unwrap()
    }

    #[test]
    fn bare_select() {
        let q = Builder::generic().from("users");
        assert_eq!(sql(&q), "select * from \"users\"");
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn basic_where_binds_value() {
        let q = Builder::generic().from("users").where_eq("id", 1).unwrap();
        assert_eq!(sql(&q), "select * from \"users\" where \"id\" = ?");
        assert_eq!(q.bindings(), vec![Value::Int(1)]);
    }

    #[test]
    fn compilation_is_idempotent() {
        let q = Builder::generic()
            .from("users")
            .where_eq("id", 1)
            .unwrap()
            .order_by_desc("name")
            .take(5);
        let first = (sql(&q), q.bindings());
        let second = (sql(&q), q.bindings());
        assert_eq!(first, second);
    }

    #[test]
    fn select_columns_and_aliases() {
        let q = Builder::generic()
            .from("users")
            .select(["id", "name as full_name", "users.email"]);
        assert_eq!(
            sql(&q),
            "select \"id\", \"name\" as \"full_name\", \"users\".\"email\" from \"users\""
        );
    }

    #[test]
    fn select_replaces_and_clears_select_bindings() {
        let q = Builder::generic()
            .from("users")
            .select_raw("price * ? as taxed", [Value::Double(1.2)])
            .select(["id"]);
        assert_eq!(sql(&q), "select \"id\" from \"users\"");
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn empty_where_in_short_circuits_false() {
        let q = Builder::generic()
            .from("users")
            .where_in("id", Vec::<i32>::new())
            .unwrap();
        assert_eq!(sql(&q), "select * from \"users\" where 0 = 1");
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn empty_where_not_in_short_circuits_true() {
        let q = Builder::generic()
            .from("users")
            .where_not_in("id", Vec::<i32>::new())
            .unwrap();
        assert_eq!(sql(&q), "select * from \"users\" where 1 = 1");
    }

    #[test]
    fn where_in_binds_each_value() {
        let q = Builder::generic()
            .from("users")
            .where_in("id", [1, 2, 3])
            .unwrap();
        assert_eq!(sql(&q), "select * from \"users\" where \"id\" in (?, ?, ?)");
        assert_eq!(
            q.bindings(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn null_value_redirects_to_where_null() {
        let q = Builder::generic()
            .from("users")
            .where_("deleted_at", "=", Value::Null)
            .unwrap();
        assert_eq!(sql(&q), "select * from \"users\" where \"deleted_at\" is null");

        let q = Builder::generic()
            .from("users")
            .where_("deleted_at", "!=", Value::Null)
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" where \"deleted_at\" is not null"
        );
    }

    #[test]
    fn null_with_inequality_operator_is_rejected() {
        let err = Builder::generic()
            .from("users")
            .where_("age", ">", Value::Null)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn invalid_operator_is_rejected_at_mutation_time() {
        let err = Builder::generic()
            .from("users")
            .where_("age", "<>>", 10)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn invalid_order_direction_is_rejected() {
        let err = Builder::generic()
            .from("users")
            .order_by("name", "sideways")
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn and_or_conjunctions() {
        let q = Builder::generic()
            .from("users")
            .where_eq("active", true)
            .unwrap()
            .or_where_("age", ">", 65)
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" where \"active\" = ? or \"age\" > ?"
        );
    }

    #[test]
    fn nested_where_groups_parenthesize() {
        let q = Builder::generic()
            .from("users")
            .where_eq("active", true)
            .unwrap()
            .where_nested(|q| q.where_eq("role", "admin")?.or_where_eq("role", "owner"))
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" where \"active\" = ? and (\"role\" = ? or \"role\" = ?)"
        );
        assert_eq!(
            q.bindings(),
            vec![
                Value::Bool(true),
                Value::Text("admin".into()),
                Value::Text("owner".into()),
            ]
        );
    }

    #[test]
    fn empty_nested_group_is_dropped() {
        let q = Builder::generic()
            .from("users")
            .where_nested(Ok)
            .unwrap();
        assert_eq!(sql(&q), "select * from \"users\"");
    }

    #[test]
    fn where_exists_compiles_sub_query() {
        let q = Builder::generic()
            .from("users")
            .where_exists(|q| {
                q.from("orders")
                    .where_column("orders.user_id", "=", "users.id")
            })
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" where exists (select * from \"orders\" \
             where \"orders\".\"user_id\" = \"users\".\"id\")"
        );
    }

    #[test]
    fn where_in_sub_carries_sub_bindings() {
        let q = Builder::generic()
            .from("users")
            .where_in_sub("id", |q| {
                q.from("orders")
                    .select(["user_id"])
                    .where_("total", ">", 100)
            })
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" where \"id\" in \
             (select \"user_id\" from \"orders\" where \"total\" > ?)"
        );
        assert_eq!(q.bindings(), vec![Value::Int(100)]);
    }

    #[test]
    fn between_and_between_columns() {
        let q = Builder::generic()
            .from("users")
            .where_between("age", 18, 65);
        assert_eq!(sql(&q), "select * from \"users\" where \"age\" between ? and ?");

        let q = Builder::generic()
            .from("events")
            .where_between_columns("created_at", "starts_at", "ends_at");
        assert_eq!(
            sql(&q),
            "select * from \"events\" where \"created_at\" between \"starts_at\" and \"ends_at\""
        );
    }

    #[test]
    fn basic_join() {
        let q = Builder::generic()
            .from("users")
            .join("contacts", "users.id", "=", "contacts.user_id")
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" inner join \"contacts\" \
             on \"users\".\"id\" = \"contacts\".\"user_id\""
        );
    }

    #[test]
    fn join_with_extra_value_condition_binds_into_join_bucket() {
        let q = Builder::generic()
            .from("users")
            .join_on("contacts", |j| {
                j.on("users.id", "=", "contacts.user_id")?
                    .where_("contacts.kind", "=", "primary")
            })
            .unwrap()
            .where_eq("active", true)
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" inner join \"contacts\" \
             on \"users\".\"id\" = \"contacts\".\"user_id\" and \"contacts\".\"kind\" = ? \
             where \"active\" = ?"
        );
        // join bindings precede where bindings in the flat list
        assert_eq!(
            q.bindings(),
            vec![Value::Text("primary".into()), Value::Bool(true)]
        );
    }

    #[test]
    fn join_with_null_conditions() {
        let q = Builder::generic()
            .from("users")
            .join_on("contacts", |j| {
                j.on("users.id", "=", "contacts.user_id")?
                    .where_null("contacts.deleted_at")?
                    .where_not_null("contacts.email")
            })
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" inner join \"contacts\" \
             on \"users\".\"id\" = \"contacts\".\"user_id\" \
             and \"contacts\".\"deleted_at\" is null \
             and \"contacts\".\"email\" is not null"
        );
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn left_and_cross_joins() {
        let q = Builder::generic()
            .from("users")
            .left_join("posts", "users.id", "=", "posts.user_id")
            .unwrap()
            .cross_join("settings");
        assert_eq!(
            sql(&q),
            "select * from \"users\" left join \"posts\" \
             on \"users\".\"id\" = \"posts\".\"user_id\" cross join \"settings\""
        );
    }

    #[test]
    fn group_by_and_having() {
        let q = Builder::generic()
            .from("orders")
            .select(["user_id"])
            .group_by(["user_id"])
            .having("user_id", ">", 10)
            .unwrap();
        assert_eq!(
            sql(&q),
            "select \"user_id\" from \"orders\" group by \"user_id\" having \"user_id\" > ?"
        );
        assert_eq!(q.bindings(), vec![Value::Int(10)]);
    }

    #[test]
    fn order_limit_offset() {
        let q = Builder::generic()
            .from("users")
            .order_by_asc("name")
            .order_by_desc("age")
            .limit(10)
            .offset(5);
        assert_eq!(
            sql(&q),
            "select * from \"users\" order by \"name\" asc, \"age\" desc limit 10 offset 5"
        );
    }

    #[test]
    fn negative_limit_is_ignored_negative_offset_clamps() {
        let q = Builder::generic().from("users").limit(10).limit(-1).offset(-3);
        assert_eq!(sql(&q), "select * from \"users\" limit 10 offset 0");
    }

    #[test]
    fn negative_limit_leaves_an_unset_limit_unset() {
        let q = Builder::generic().from("users").limit(-1);
        assert_eq!(sql(&q), "select * from \"users\"");
    }

    #[test]
    fn for_page_computes_offset() {
        let q = Builder::generic().from("users").for_page(3, 15);
        assert_eq!(sql(&q), "select * from \"users\" limit 15 offset 30");
    }

    #[test]
    fn for_page_saturates_on_huge_pages() {
        let q = Builder::generic().from("users").for_page(u64::MAX, u64::MAX);
        assert_eq!(
            sql(&q),
            format!("select * from \"users\" limit {n} offset {n}", n = i64::MAX)
        );
    }

    #[test]
    fn reorder_drops_ordering_and_its_bindings() {
        let q = Builder::generic()
            .from("users")
            .order_by_raw("case when id = ? then 0 else 1 end", [Value::Int(1)])
            .reorder_by("name", "asc")
            .unwrap();
        assert_eq!(sql(&q), "select * from \"users\" order by \"name\" asc");
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn union_wraps_both_sides_and_orders_at_the_end() {
        let q = Builder::generic()
            .from("users")
            .where_eq("id", 1)
            .unwrap()
            .union(|q| q.from("users").where_eq("id", 2))
            .unwrap()
            .order_by("name", "desc")
            .unwrap();
        assert_eq!(
            sql(&q),
            "(select * from \"users\" where \"id\" = ?) \
             union (select * from \"users\" where \"id\" = ?) order by \"name\" desc"
        );
        assert_eq!(q.bindings(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn union_all_keeps_duplicates_keyword() {
        let q = Builder::generic()
            .from("a")
            .union_all(|q| Ok(q.from("b")))
            .unwrap()
            .limit(10);
        assert_eq!(
            sql(&q),
            "(select * from \"a\") union all (select * from \"b\") limit 10"
        );
    }

    #[test]
    fn select_sub_and_from_sub() {
        let q = Builder::generic()
            .from("users")
            .select(["id"])
            .select_sub(
                |q| {
                    q.from("orders")
                        .select_raw("count(*)", Vec::<Value>::new())
                        .where_column("orders.user_id", "=", "users.id")
                },
                "order_count",
            )
            .unwrap();
        assert_eq!(
            sql(&q),
            "select \"id\", (select count(*) from \"orders\" \
             where \"orders\".\"user_id\" = \"users\".\"id\") as \"order_count\" \
             from \"users\""
        );

        let q = Builder::generic()
            .from_sub(|q| q.from("users").where_("age", ">", 21), "adults")
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from (select * from \"users\" where \"age\" > ?) as \"adults\""
        );
        assert_eq!(q.bindings(), vec![Value::Int(21)]);
    }

    #[test]
    fn raw_expressions_are_never_quoted_or_bound() {
        let q = Builder::generic()
            .from("users")
            .where_("created_at", "<", crate::Expression::new("now()"))
            .unwrap();
        assert_eq!(sql(&q), "select * from \"users\" where \"created_at\" < now()");
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn clone_isolation() {
        let base = Builder::generic().from("users").where_eq("active", true).unwrap();
        let page = base.clone().order_by_asc("name").limit(10);
        // base is unchanged by mutations on the clone
        assert_eq!(sql(&base), "select * from \"users\" where \"active\" = ?");
        assert_eq!(
            sql(&page),
            "select * from \"users\" where \"active\" = ? order by \"name\" asc limit 10"
        );
    }

    #[test]
    fn aggregate_statement_does_not_leak_into_builder() {
        let q = Builder::generic()
            .from("users")
            .select(["id", "name"])
            .where_eq("active", true)
            .unwrap();
        let (agg_sql, agg_params) = q.aggregate_statement("count", ["*"]).unwrap();
        assert_eq!(
            agg_sql,
            "select count(*) as aggregate from \"users\" where \"active\" = ?"
        );
        assert_eq!(agg_params, vec![Value::Bool(true)]);
        // the original still selects its columns
        assert_eq!(
            sql(&q),
            "select \"id\", \"name\" from \"users\" where \"active\" = ?"
        );
    }

    #[test]
    fn pagination_count_clone_strips_ordering_and_paging() {
        let q = Builder::generic()
            .from("users")
            .where_eq("active", true)
            .unwrap()
            .order_by_asc("name")
            .for_page(2, 25);
        let count = q.clone_for_pagination_count();
        assert_eq!(sql(&count), "select * from \"users\" where \"active\" = ?");
    }

    #[test]
    fn placeholder_count_matches_binding_count() {
        let q = Builder::generic()
            .from("users")
            .select_raw("price * ? as taxed", [Value::Double(1.08)])
            .join_on("contacts", |j| {
                j.on("users.id", "=", "contacts.user_id")?
                    .where_("contacts.kind", "=", "primary")
            })
            .unwrap()
            .where_eq("active", true)
            .unwrap()
            .where_in("role", ["admin", "owner"])
            .unwrap()
            .having_raw("count(*) > ?", [Value::Int(3)])
            .group_by(["users.id"])
            .union(|q| q.from("archived_users").where_eq("active", true))
            .unwrap();
        let text = sql(&q);
        let placeholders = text.matches('?').count();
        assert_eq!(placeholders, q.bindings().len());
    }

    #[test]
    fn before_query_hook_runs_on_compile_without_mutating_original() {
        let q = Builder::generic().from("users").before_query(|query| {
            let patched = std::mem::replace(query, Builder::generic());
            if let Ok(patched) = patched.where_eq("tenant_id", 7) {
                *query = patched;
            }
        });
        assert_eq!(sql(&q), "select * from \"users\" where \"tenant_id\" = ?");
        assert_eq!(q.bindings(), vec![Value::Int(7)]);
        // the hook is still pending on the original, not consumed
        assert_eq!(sql(&q), "select * from \"users\" where \"tenant_id\" = ?");
        assert!(q.raw_bindings().is_empty());
    }

    #[test]
    fn where_date_parts() {
        let q = Builder::generic()
            .from("logs")
            .where_date("created_at", "=", "2026-08-31")
            .unwrap();
        assert_eq!(sql(&q), "select * from \"logs\" where date(\"created_at\") = ?");

        let q = Builder::generic()
            .from("logs")
            .where_month("created_at", "=", 8)
            .unwrap();
        assert_eq!(sql(&q), "select * from \"logs\" where month(\"created_at\") = ?");
        // month values zero-pad for text-based grammars
        assert_eq!(q.bindings(), vec![Value::Text("08".into())]);
    }

    #[test]
    fn where_pairs_adds_conjoined_equalities() {
        let q = Builder::generic()
            .from("users")
            .where_pairs([("active", Operand::from(true)), ("role", Operand::from("admin"))])
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" where \"active\" = ? and \"role\" = ?"
        );
    }

    #[test]
    fn insert_statement_single_and_multi_row() {
        let q = Builder::generic().from("users");
        let (sql, params) = q
            .insert_statement([[("name", Operand::from("alice")), ("age", Operand::from(30))]])
            .unwrap();
        assert_eq!(sql, "insert into \"users\" (\"name\", \"age\") values (?, ?)");
        assert_eq!(params, vec![Value::Text("alice".into()), Value::Int(30)]);

        let (sql, params) = q
            .insert_statement([
                vec![("name", Operand::from("alice")), ("age", Operand::from(30))],
                // columns may arrive in a different order in later rows
                vec![("age", Operand::from(41)), ("name", Operand::from("bob"))],
            ])
            .unwrap();
        assert_eq!(
            sql,
            "insert into \"users\" (\"name\", \"age\") values (?, ?), (?, ?)"
        );
        assert_eq!(
            params,
            vec![
                Value::Text("alice".into()),
                Value::Int(30),
                Value::Text("bob".into()),
                Value::Int(41),
            ]
        );
    }

    #[test]
    fn insert_statement_rejects_mismatched_records() {
        let q = Builder::generic().from("users");
        let err = q
            .insert_statement([
                vec![("name", Operand::from("alice"))],
                vec![("age", Operand::from(41))],
            ])
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn insert_statement_rejects_duplicate_columns() {
        let q = Builder::generic().from("users");
        let err = q
            .insert_statement([vec![
                ("name", Operand::from("alice")),
                ("name", Operand::from("bob")),
            ]])
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn update_statement_orders_join_values_then_wheres() {
        let q = Builder::generic()
            .from("users")
            .join_on("contacts", |j| {
                j.on("users.id", "=", "contacts.user_id")?
                    .where_("contacts.kind", "=", "primary")
            })
            .unwrap()
            .where_("age", ">", 40)
            .unwrap();
        let (sql, params) = q
            .update_statement([("active", Operand::from(false))])
            .unwrap();
        assert_eq!(
            sql,
            "update \"users\" inner join \"contacts\" \
             on \"users\".\"id\" = \"contacts\".\"user_id\" and \"contacts\".\"kind\" = ? \
             set \"active\" = ? where \"age\" > ?"
        );
        assert_eq!(
            params,
            vec![
                Value::Text("primary".into()),
                Value::Bool(false),
                Value::Int(40),
            ]
        );
    }

    #[test]
    fn delete_statement_keeps_where_bindings() {
        let q = Builder::generic()
            .from("users")
            .where_("age", "<", 18)
            .unwrap();
        let (sql, params) = q.delete_statement().unwrap();
        assert_eq!(sql, "delete from \"users\" where \"age\" < ?");
        assert_eq!(params, vec![Value::Int(18)]);
    }

    #[test]
    fn exists_statement_wraps_the_select() {
        let q = Builder::generic().from("users").where_eq("id", 5).unwrap();
        let (sql, params) = q.exists_statement().unwrap();
        assert_eq!(
            sql,
            "select exists(select * from \"users\" where \"id\" = ?) as \"exists\""
        );
        assert_eq!(params, vec![Value::Int(5)]);
    }

    #[test]
    fn distinct_select() {
        let q = Builder::generic().from("users").select(["email"]).distinct();
        assert_eq!(sql(&q), "select distinct \"email\" from \"users\"");
    }
}
