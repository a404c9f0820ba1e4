//! SQL compilation.
//!
//! [`Grammar`] turns a [`Builder`] into SQL text. The trait's default
//! methods are a complete ANSI-flavored compiler; each dialect overrides
//! only the pieces where its SQL differs (identifier quoting, paging,
//! conflict handling, JSON paths). Compilation never touches the
//! builder's binding buckets, so text and parameters always stay in
//! sync no matter how often a query is compiled.

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use sqlite::SqliteGrammar;
pub use sqlserver::SqlServerGrammar;

use quill_core::{Error, Result, Value};

use crate::builder::Builder;
use crate::clause::{
    Aggregate, Assignment, DatePart, Distinct, Having, Operand, Order, WhereClause,
};
use crate::expression::Ident;

/// Comparison operators every dialect accepts.
pub const BASE_OPERATORS: &[&str] = &[
    "=", "<", ">", "<=", ">=", "<>", "!=", "<=>", "like", "not like", "&", "|", "^", "<<", ">>",
    "is", "is not",
];

/// A SQL dialect compiler.
///
/// Implementations are stateless; a single grammar instance is shared by
/// a builder and all of its sub-builders through an `Arc`.
pub trait Grammar: Send + Sync {
    /// Short dialect name, used in unsupported-operation errors.
    fn name(&self) -> &'static str;

    /// The operators [`Builder`] accepts in comparison positions.
    fn operators(&self) -> &[&'static str] {
        BASE_OPERATORS
    }

    /// Whether `insert_get_id` compiles a `returning` clause whose result
    /// row carries the generated key.
    fn insert_get_id_uses_returning(&self) -> bool {
        false
    }

    // ---- identifier wrapping ---------------------------------------------

    /// Quote one bare identifier segment.
    fn quote_ident(&self, part: &str) -> String {
        format!("\"{}\"", part.replace('"', "\"\""))
    }

    /// Quote a segment, leaving `*` untouched.
    fn wrap_segment(&self, part: &str) -> String {
        if part == "*" {
            "*".to_string()
        } else {
            self.quote_ident(part)
        }
    }

    /// Wrap a column reference: alias splitting, dot-qualified segments,
    /// JSON path routing. Raw expressions pass through verbatim.
    fn wrap(&self, ident: &Ident) -> Result<String> {
        match ident {
            Ident::Raw(e) => Ok(e.as_str().to_string()),
            Ident::Plain(name) => self.wrap_plain(name),
        }
    }

    fn wrap_plain(&self, name: &str) -> Result<String> {
        let lower = name.to_ascii_lowercase();
        if let Some(pos) = lower.find(" as ") {
            let (column, alias) = (&name[..pos], name[pos + 4..].trim());
            return Ok(format!(
                "{} as {}",
                self.wrap_plain(column)?,
                self.wrap_segment(alias)
            ));
        }
        if name.contains("->") {
            return self.wrap_json_selector(name);
        }
        Ok(name
            .split('.')
            .map(|part| self.wrap_segment(part))
            .collect::<Vec<_>>()
            .join("."))
    }

    /// Wrap a table reference. Like [`Grammar::wrap`] but without JSON
    /// path routing.
    fn wrap_table(&self, ident: &Ident) -> Result<String> {
        match ident {
            Ident::Raw(e) => Ok(e.as_str().to_string()),
            Ident::Plain(name) => {
                let lower = name.to_ascii_lowercase();
                if let Some(pos) = lower.find(" as ") {
                    let (table, alias) = (&name[..pos], name[pos + 4..].trim());
                    return Ok(format!(
                        "{} as {}",
                        self.wrap_table(&Ident::from(table))?,
                        self.wrap_segment(alias)
                    ));
                }
                Ok(name
                    .split('.')
                    .map(|part| self.wrap_segment(part))
                    .collect::<Vec<_>>()
                    .join("."))
            }
        }
    }

    /// Translate a `column->path->leaf` reference into the dialect's JSON
    /// extraction expression.
    fn wrap_json_selector(&self, _column: &str) -> Result<String> {
        Err(Error::unsupported(self.name(), "json paths"))
    }

    /// Comma-join wrapped column references.
    fn columnize(&self, columns: &[Ident]) -> Result<String> {
        let wrapped: Result<Vec<String>> = columns.iter().map(|c| self.wrap(c)).collect();
        Ok(wrapped?.join(", "))
    }

    /// Placeholder text for one operand: `?`, or the raw expression.
    fn placeholder(&self, operand: &Operand) -> String {
        match operand {
            Operand::Value(_) => "?".to_string(),
            Operand::Raw(e) => e.as_str().to_string(),
        }
    }

    /// Comma-join placeholders for a value list.
    fn placeholders(&self, operands: &[Operand]) -> String {
        operands
            .iter()
            .map(|o| self.placeholder(o))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn table_sql(&self, query: &Builder) -> Result<String> {
        let from = query
            .from
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("query has no table"))?;
        self.wrap_table(from)
    }

    // ---- select ----------------------------------------------------------

    /// Compile the full select statement.
    fn compile_select(&self, query: &Builder) -> Result<String> {
        if let Some(aggregate) = &query.aggregate {
            if !query.unions.is_empty() || !query.havings.is_empty() {
                return self.compile_wrapped_aggregate(query, aggregate);
            }
        }
        let mut sql = self.compile_components(query)?;
        if !query.unions.is_empty() {
            sql = self.wrap_union(&sql);
            sql.push_str(&self.compile_unions(query)?);
        }
        Ok(sql)
    }

    /// Compile the component list of a plain (non-union-wrapped) select.
    fn compile_components(&self, query: &Builder) -> Result<String> {
        let mut parts = vec![self.compile_columns(query)?];
        if let Some(from) = &query.from {
            parts.push(format!("from {}", self.wrap_table(from)?));
        }
        if !query.joins.is_empty() {
            parts.push(self.compile_joins(query)?);
        }
        let wheres = self.compile_wheres(query)?;
        if !wheres.is_empty() {
            parts.push(wheres);
        }
        if !query.groups.is_empty() {
            parts.push(format!("group by {}", self.columnize(&query.groups)?));
        }
        if !query.havings.is_empty() {
            parts.push(self.compile_havings(query)?);
        }
        if !query.orders.is_empty() {
            parts.push(self.compile_orders(&query.orders)?);
        }
        if let Some(limit) = query.limit {
            let limit = self.compile_limit(limit);
            if !limit.is_empty() {
                parts.push(limit);
            }
        }
        if let Some(offset) = query.offset {
            let offset = self.compile_offset(offset);
            if !offset.is_empty() {
                parts.push(offset);
            }
        }
        Ok(parts.join(" "))
    }

    fn compile_columns(&self, query: &Builder) -> Result<String> {
        if let Some(aggregate) = &query.aggregate {
            return self.compile_aggregate(query, aggregate);
        }
        let prefix = self.select_prefix(&query.distinct)?;
        if query.columns.is_empty() {
            Ok(format!("{prefix} *"))
        } else {
            Ok(format!("{prefix} {}", self.columnize(&query.columns)?))
        }
    }

    fn select_prefix(&self, distinct: &Distinct) -> Result<String> {
        Ok(match distinct {
            Distinct::Off => "select".to_string(),
            Distinct::All | Distinct::Columns(_) => "select distinct".to_string(),
        })
    }

    fn compile_aggregate(&self, query: &Builder, aggregate: &Aggregate) -> Result<String> {
        let column = if aggregate.columns.is_empty() {
            "*".to_string()
        } else {
            self.columnize(&aggregate.columns)?
        };
        let column = if matches!(query.distinct, Distinct::All) && column != "*" {
            format!("distinct {column}")
        } else {
            column
        };
        Ok(format!("select {}({column}) as aggregate", aggregate.function))
    }

    /// An aggregate over a query that itself has unions or havings wraps
    /// the whole query as a derived table.
    fn compile_wrapped_aggregate(&self, query: &Builder, aggregate: &Aggregate) -> Result<String> {
        let mut inner = query.clone();
        inner.aggregate = None;
        let inner_sql = self.compile_select(&inner)?;
        let column = if aggregate.columns.is_empty() {
            "*".to_string()
        } else {
            self.columnize(&aggregate.columns)?
        };
        Ok(format!(
            "select {}({column}) as aggregate from ({inner_sql}) as {}",
            aggregate.function,
            self.wrap_table(&Ident::from("temp_table"))?
        ))
    }

    fn compile_joins(&self, query: &Builder) -> Result<String> {
        let mut parts = Vec::with_capacity(query.joins.len());
        for join in &query.joins {
            let table = self.wrap_table(&join.table)?;
            if join.query.wheres.is_empty() {
                parts.push(format!("{} {table}", join.kind.as_str()));
            } else {
                parts.push(format!(
                    "{} {table} on {}",
                    join.kind.as_str(),
                    self.compile_where_constraints(&join.query)?
                ));
            }
        }
        Ok(parts.join(" "))
    }

    fn compile_wheres(&self, query: &Builder) -> Result<String> {
        if query.wheres.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("where {}", self.compile_where_constraints(query)?))
    }

    /// The predicate list without its `where` keyword, as used by both
    /// where clauses and join `on` lists.
    fn compile_where_constraints(&self, query: &Builder) -> Result<String> {
        let mut out = String::new();
        for (i, clause) in query.wheres.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(clause.conjunction().as_str());
                out.push(' ');
            }
            out.push_str(&self.compile_where_clause(query, clause)?);
        }
        Ok(out)
    }

    fn compile_where_clause(&self, _query: &Builder, clause: &WhereClause) -> Result<String> {
        match clause {
            WhereClause::Basic {
                column,
                operator,
                value,
                ..
            } => Ok(format!(
                "{} {operator} {}",
                self.wrap(column)?,
                self.placeholder(value)
            )),
            WhereClause::In {
                column,
                values,
                not,
                ..
            } => {
                if values.is_empty() {
                    // tautologies keep the statement valid for empty lists
                    return Ok(if *not { "1 = 1" } else { "0 = 1" }.to_string());
                }
                let keyword = if *not { "not in" } else { "in" };
                Ok(format!(
                    "{} {keyword} ({})",
                    self.wrap(column)?,
                    self.placeholders(values)
                ))
            }
            WhereClause::InSub {
                column, query, not, ..
            } => {
                let keyword = if *not { "not in" } else { "in" };
                Ok(format!(
                    "{} {keyword} ({})",
                    self.wrap(column)?,
                    self.compile_select(query)?
                ))
            }
            WhereClause::Null { column, not, .. } => self.compile_where_null(column, *not),
            WhereClause::Between {
                column,
                low,
                high,
                not,
                ..
            } => {
                let keyword = if *not { "not between" } else { "between" };
                Ok(format!(
                    "{} {keyword} {} and {}",
                    self.wrap(column)?,
                    self.placeholder(low),
                    self.placeholder(high)
                ))
            }
            WhereClause::BetweenColumns {
                column,
                low,
                high,
                not,
                ..
            } => {
                let keyword = if *not { "not between" } else { "between" };
                Ok(format!(
                    "{} {keyword} {} and {}",
                    self.wrap(column)?,
                    self.wrap(low)?,
                    self.wrap(high)?
                ))
            }
            WhereClause::Column {
                first,
                operator,
                second,
                ..
            } => Ok(format!(
                "{} {operator} {}",
                self.wrap(first)?,
                self.wrap(second)?
            )),
            WhereClause::Exists { query, not, .. } => {
                let keyword = if *not { "not exists" } else { "exists" };
                Ok(format!("{keyword} ({})", self.compile_select(query)?))
            }
            WhereClause::Sub {
                column,
                operator,
                query,
                ..
            } => Ok(format!(
                "{} {operator} ({})",
                self.wrap(column)?,
                self.compile_select(query)?
            )),
            WhereClause::Nested { query, .. } => {
                Ok(format!("({})", self.compile_where_constraints(query)?))
            }
            WhereClause::Raw { sql, .. } => Ok(sql.as_str().to_string()),
            WhereClause::DateBased {
                part,
                column,
                operator,
                ..
            } => {
                let column = self.wrap(column)?;
                Ok(self.compile_date_based(*part, &column, operator))
            }
        }
    }

    fn compile_where_null(&self, column: &Ident, not: bool) -> Result<String> {
        let keyword = if not { "is not null" } else { "is null" };
        Ok(format!("{} {keyword}", self.wrap(column)?))
    }

    /// Date-part comparison; the default uses SQL date functions named
    /// after the part.
    fn compile_date_based(&self, part: DatePart, column: &str, operator: &str) -> String {
        format!("{}({column}) {operator} ?", part.as_str())
    }

    fn compile_havings(&self, query: &Builder) -> Result<String> {
        let mut out = String::from("having ");
        for (i, having) in query.havings.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(having.conjunction().as_str());
                out.push(' ');
            }
            out.push_str(&self.compile_having(having)?);
        }
        Ok(out)
    }

    fn compile_having(&self, having: &Having) -> Result<String> {
        match having {
            Having::Basic {
                column,
                operator,
                value,
                ..
            } => Ok(format!(
                "{} {operator} {}",
                self.wrap(column)?,
                self.placeholder(value)
            )),
            Having::Between {
                column, not, ..
            } => {
                let keyword = if *not { "not between" } else { "between" };
                Ok(format!("{} {keyword} ? and ?", self.wrap(column)?))
            }
            Having::Raw { sql, .. } => Ok(sql.as_str().to_string()),
        }
    }

    fn compile_orders(&self, orders: &[Order]) -> Result<String> {
        let mut parts = Vec::with_capacity(orders.len());
        for order in orders {
            match order {
                Order::By { column, direction } => {
                    parts.push(format!("{} {}", self.wrap(column)?, direction.as_str()));
                }
                Order::Raw(sql) => parts.push(sql.as_str().to_string()),
            }
        }
        Ok(format!("order by {}", parts.join(", ")))
    }

    fn compile_limit(&self, limit: u64) -> String {
        format!("limit {limit}")
    }

    fn compile_offset(&self, offset: u64) -> String {
        format!("offset {offset}")
    }

    /// Parenthesize one side of a set operation.
    fn wrap_union(&self, sql: &str) -> String {
        format!("({sql})")
    }

    /// The trailing union segments, starting with a space.
    fn compile_unions(&self, query: &Builder) -> Result<String> {
        let mut sql = String::new();
        for union in &query.unions {
            sql.push_str(if union.all { " union all " } else { " union " });
            sql.push_str(&self.wrap_union(&self.compile_select(&union.query)?));
        }
        if !query.union_orders.is_empty() {
            sql.push(' ');
            sql.push_str(&self.compile_orders(&query.union_orders)?);
        }
        if let Some(limit) = query.union_limit {
            let limit = self.compile_limit(limit);
            if !limit.is_empty() {
                sql.push(' ');
                sql.push_str(&limit);
            }
        }
        if let Some(offset) = query.union_offset {
            let offset = self.compile_offset(offset);
            if !offset.is_empty() {
                sql.push(' ');
                sql.push_str(&offset);
            }
        }
        Ok(sql)
    }

    /// Rewrite the select as an existence probe returning one boolean-ish
    /// column named `exists`.
    fn compile_exists(&self, query: &Builder) -> Result<String> {
        Ok(format!(
            "select exists({}) as {}",
            self.compile_select(query)?,
            self.wrap(&Ident::from("exists"))?
        ))
    }

    // ---- writes ----------------------------------------------------------

    fn compile_insert(
        &self,
        query: &Builder,
        columns: &[String],
        rows: &[Vec<Operand>],
    ) -> Result<String> {
        let table = self.table_sql(query)?;
        let columns = self.columnize_names(columns)?;
        let values = rows
            .iter()
            .map(|row| format!("({})", self.placeholders(row)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("insert into {table} ({columns}) values {values}"))
    }

    fn columnize_names(&self, columns: &[String]) -> Result<String> {
        let wrapped: Result<Vec<String>> = columns
            .iter()
            .map(|c| self.wrap(&Ident::from(c.as_str())))
            .collect();
        Ok(wrapped?.join(", "))
    }

    /// Insert that silently skips rows violating a unique constraint.
    fn compile_insert_or_ignore(
        &self,
        _query: &Builder,
        _columns: &[String],
        _rows: &[Vec<Operand>],
    ) -> Result<String> {
        Err(Error::unsupported(self.name(), "insert or ignore"))
    }

    /// Single-row insert whose generated key is retrievable afterwards.
    fn compile_insert_get_id(
        &self,
        query: &Builder,
        columns: &[String],
        row: &[Operand],
        _sequence: &str,
    ) -> Result<String> {
        self.compile_insert(query, columns, &[row.to_vec()])
    }

    fn compile_insert_using(
        &self,
        query: &Builder,
        columns: &[&str],
        select: &str,
    ) -> Result<String> {
        let table = self.table_sql(query)?;
        let columns: Result<Vec<String>> = columns
            .iter()
            .map(|c| self.wrap(&Ident::from(*c)))
            .collect();
        Ok(format!(
            "insert into {table} ({}) {select}",
            columns?.join(", ")
        ))
    }

    fn compile_update(
        &self,
        query: &Builder,
        assignments: &[(String, Operand)],
    ) -> Result<String> {
        let table = self.table_sql(query)?;
        let columns = self.compile_update_assignments(assignments)?;
        let mut sql = format!("update {table}");
        if !query.joins.is_empty() {
            sql.push(' ');
            sql.push_str(&self.compile_joins(query)?);
        }
        sql.push_str(" set ");
        sql.push_str(&columns);
        let wheres = self.compile_wheres(query)?;
        if !wheres.is_empty() {
            sql.push(' ');
            sql.push_str(&wheres);
        }
        Ok(sql)
    }

    fn compile_update_assignments(&self, assignments: &[(String, Operand)]) -> Result<String> {
        let parts: Result<Vec<String>> = assignments
            .iter()
            .map(|(column, value)| self.compile_update_assignment(column, value))
            .collect();
        Ok(parts?.join(", "))
    }

    fn compile_update_assignment(&self, column: &str, value: &Operand) -> Result<String> {
        Ok(format!(
            "{} = {}",
            self.wrap(&Ident::from(column))?,
            self.placeholder(value)
        ))
    }

    /// Flat parameter order for an update: join bindings, assignment
    /// values, then every remaining bucket except select and join.
    fn prepare_update_bindings(&self, query: &Builder, values: Vec<Value>) -> Vec<Value> {
        let b = &query.bindings;
        let mut out = Vec::new();
        out.extend(b.join.iter().cloned());
        out.extend(values);
        out.extend(b.from.iter().cloned());
        out.extend(b.wheres.iter().cloned());
        out.extend(b.group_by.iter().cloned());
        out.extend(b.having.iter().cloned());
        out.extend(b.order.iter().cloned());
        out.extend(b.union.iter().cloned());
        out.extend(b.union_order.iter().cloned());
        out
    }

    /// Insert-or-update on conflict with the given unique key.
    fn compile_upsert(
        &self,
        _query: &Builder,
        _columns: &[String],
        _rows: &[Vec<Operand>],
        _unique_by: &[String],
        _update: &[Assignment],
    ) -> Result<String> {
        Err(Error::unsupported(self.name(), "upsert"))
    }

    fn compile_delete(&self, query: &Builder) -> Result<String> {
        let table = self.table_sql(query)?;
        let wheres = self.compile_wheres(query)?;
        let mut sql = if query.joins.is_empty() {
            format!("delete from {table}")
        } else {
            format!("delete {table} from {table} {}", self.compile_joins(query)?)
        };
        if !wheres.is_empty() {
            sql.push(' ');
            sql.push_str(&wheres);
        }
        Ok(sql)
    }

    /// Flat parameter order for a delete: every bucket except select.
    fn prepare_delete_bindings(&self, query: &Builder) -> Vec<Value> {
        let b = &query.bindings;
        let mut out = Vec::new();
        out.extend(b.from.iter().cloned());
        out.extend(b.join.iter().cloned());
        out.extend(b.wheres.iter().cloned());
        out.extend(b.group_by.iter().cloned());
        out.extend(b.having.iter().cloned());
        out.extend(b.order.iter().cloned());
        out.extend(b.union.iter().cloned());
        out.extend(b.union_order.iter().cloned());
        out
    }

    /// The statement sequence that empties the table.
    fn compile_truncate(&self, query: &Builder) -> Result<Vec<(String, Vec<Value>)>> {
        Ok(vec![(
            format!("truncate table {}", self.table_sql(query)?),
            Vec::new(),
        )])
    }
}

/// Split a `column->a->b` reference into its base column and path
/// segments.
pub(crate) fn split_json_path(column: &str) -> (&str, Vec<&str>) {
    let mut parts = column.split("->");
    let base = parts.next().unwrap_or(column);
    (base, parts.collect())
}

/// Update form for dialects whose `update` cannot carry joins.
pub(crate) fn update_without_joins<G: Grammar + ?Sized>(
    grammar: &G,
    query: &Builder,
    assignments: &[(String, Operand)],
) -> Result<String> {
    if !query.joins.is_empty() {
        return Err(Error::unsupported(grammar.name(), "update with joins"));
    }
    let table = grammar.table_sql(query)?;
    let columns = grammar.compile_update_assignments(assignments)?;
    let wheres = grammar.compile_wheres(query)?;
    Ok(if wheres.is_empty() {
        format!("update {table} set {columns}")
    } else {
        format!("update {table} set {columns} {wheres}")
    })
}

/// Delete form for dialects whose `delete` cannot carry joins.
pub(crate) fn delete_without_joins<G: Grammar + ?Sized>(
    grammar: &G,
    query: &Builder,
) -> Result<String> {
    if !query.joins.is_empty() {
        return Err(Error::unsupported(grammar.name(), "delete with joins"));
    }
    let table = grammar.table_sql(query)?;
    let wheres = grammar.compile_wheres(query)?;
    Ok(if wheres.is_empty() {
        format!("delete from {table}")
    } else {
        format!("delete from {table} {wheres}")
    })
}

/// The ANSI-flavored fallback dialect: double-quoted identifiers,
/// `limit`/`offset` paging, no conflict-handling extensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericGrammar;

impl Grammar for GenericGrammar {
    fn name(&self) -> &'static str {
        "generic"
    }
}
