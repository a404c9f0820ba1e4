//! SQL Server dialect: bracket quoting, `top`/row_number paging, `merge`
//! upserts, `json_value` paths.

use quill_core::{Error, Result};

use super::{delete_without_joins, split_json_path, update_without_joins, Grammar};
use crate::builder::Builder;
use crate::clause::{Assignment, DatePart, Operand};
use crate::expression::Ident;

const SQLSERVER_OPERATORS: &[&str] = &[
    "=", "<", ">", "<=", ">=", "<>", "!=", "!<", "!>", "like", "not like", "&", "|", "^", "is",
    "is not",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerGrammar;

fn json_path(segments: &[&str]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        path.push_str(&format!(".\"{segment}\""));
    }
    path
}

impl SqlServerGrammar {
    /// Pre-2012 compatible paging: number the rows in a derived table and
    /// filter on the computed `row_num`.
    fn compile_row_number_select(&self, query: &Builder) -> Result<String> {
        let offset = query.offset.unwrap_or(0);
        let order = if query.orders.is_empty() {
            // row_number requires an over-clause ordering
            "order by (select 0)".to_string()
        } else {
            self.compile_orders(&query.orders)?
        };
        let mut inner = query.clone();
        inner.orders.clear();
        inner.limit = None;
        inner.offset = None;
        if inner.columns.is_empty() {
            inner.columns.push(Ident::from("*"));
        }
        inner
            .columns
            .push(Ident::raw(format!("row_number() over ({order}) as row_num")));
        let inner_sql = self.compile_components(&inner)?;
        let start = offset + 1;
        let constraint = match query.limit {
            Some(limit) => format!("between {start} and {}", offset + limit),
            None => format!(">= {start}"),
        };
        Ok(format!(
            "select * from ({inner_sql}) as {} where row_num {constraint} order by row_num",
            self.wrap_table(&Ident::from("temp_table"))?
        ))
    }
}

impl Grammar for SqlServerGrammar {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn operators(&self) -> &[&'static str] {
        SQLSERVER_OPERATORS
    }

    fn quote_ident(&self, part: &str) -> String {
        format!("[{}]", part.replace(']', "]]"))
    }

    fn wrap_json_selector(&self, column: &str) -> Result<String> {
        let (base, path) = split_json_path(column);
        Ok(format!(
            "json_value({}, '{}')",
            self.wrap(&Ident::from(base))?,
            json_path(&path)
        ))
    }

    fn compile_date_based(&self, part: DatePart, column: &str, operator: &str) -> String {
        match part {
            DatePart::Date => format!("cast({column} as date) {operator} ?"),
            DatePart::Time => format!("cast({column} as time) {operator} ?"),
            DatePart::Day | DatePart::Month | DatePart::Year => {
                format!("{}({column}) {operator} ?", part.as_str())
            }
        }
    }

    fn compile_select(&self, query: &Builder) -> Result<String> {
        if let Some(aggregate) = &query.aggregate {
            if !query.unions.is_empty() || !query.havings.is_empty() {
                return self.compile_wrapped_aggregate(query, aggregate);
            }
        }
        if query.offset.is_some() && query.unions.is_empty() {
            return self.compile_row_number_select(query);
        }
        let mut sql = self.compile_components(query)?;
        if !query.unions.is_empty() {
            sql = self.wrap_union(&sql);
            for union in &query.unions {
                sql.push_str(if union.all { " union all " } else { " union " });
                sql.push_str(&self.wrap_union(&self.compile_select(&union.query)?));
            }
            if query.union_offset.is_some() {
                return Err(Error::unsupported(self.name(), "union offset"));
            }
            // No limit keyword; cap the whole set from an outer select.
            if let Some(limit) = query.union_limit {
                sql = format!(
                    "select top {limit} * from ({sql}) as {}",
                    self.wrap_table(&Ident::from("temp_table"))?
                );
            }
            if !query.union_orders.is_empty() {
                sql.push(' ');
                sql.push_str(&self.compile_orders(&query.union_orders)?);
            }
        }
        Ok(sql)
    }

    /// A plain limit becomes `select top n`; the limit keyword position
    /// emits nothing.
    fn compile_columns(&self, query: &Builder) -> Result<String> {
        if let Some(aggregate) = &query.aggregate {
            return self.compile_aggregate(query, aggregate);
        }
        let mut prefix = self.select_prefix(&query.distinct)?;
        if let Some(limit) = query.limit {
            if query.offset.is_none() {
                prefix.push_str(&format!(" top {limit}"));
            }
        }
        if query.columns.is_empty() {
            Ok(format!("{prefix} *"))
        } else {
            Ok(format!("{prefix} {}", self.columnize(&query.columns)?))
        }
    }

    fn compile_limit(&self, _limit: u64) -> String {
        String::new()
    }

    fn compile_offset(&self, _offset: u64) -> String {
        String::new()
    }

    fn wrap_union(&self, sql: &str) -> String {
        format!("select * from ({sql}) as [temp_table]")
    }

    fn compile_exists(&self, query: &Builder) -> Result<String> {
        let mut probe = query.clone();
        probe.columns = vec![Ident::raw("1 as [exists]")];
        probe.limit = Some(1);
        self.compile_select(&probe)
    }

    fn compile_update(
        &self,
        query: &Builder,
        assignments: &[(String, Operand)],
    ) -> Result<String> {
        update_without_joins(self, query, assignments)
    }

    fn compile_delete(&self, query: &Builder) -> Result<String> {
        delete_without_joins(self, query)
    }

    fn compile_update_assignment(&self, column: &str, value: &Operand) -> Result<String> {
        if column.contains("->") {
            let (base, path) = split_json_path(column);
            let base = self.wrap(&Ident::from(base))?;
            return Ok(format!(
                "{base} = json_modify({base}, '{}', {})",
                json_path(&path),
                self.placeholder(value)
            ));
        }
        Ok(format!(
            "{} = {}",
            self.wrap(&Ident::from(column))?,
            self.placeholder(value)
        ))
    }

    fn compile_upsert(
        &self,
        query: &Builder,
        columns: &[String],
        rows: &[Vec<Operand>],
        unique_by: &[String],
        update: &[Assignment],
    ) -> Result<String> {
        if unique_by.is_empty() {
            return Err(Error::invalid_argument(
                "upsert requires at least one unique-by column",
            ));
        }
        let table = self.table_sql(query)?;
        let values = rows
            .iter()
            .map(|row| format!("({})", self.placeholders(row)))
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = self.columnize_names(columns)?;
        let on: Result<Vec<String>> = unique_by
            .iter()
            .map(|c| {
                let c = self.wrap(&Ident::from(c.as_str()))?;
                Ok(format!("{table}.{c} = [source].{c}"))
            })
            .collect();
        let mut assignments = Vec::with_capacity(update.len());
        for entry in update {
            match entry {
                Assignment::Column(column) => {
                    let wrapped = self.wrap(&Ident::from(column.as_str()))?;
                    assignments.push(format!("{wrapped} = [source].{wrapped}"));
                }
                Assignment::Pair(column, value) => {
                    assignments.push(format!(
                        "{} = {}",
                        self.wrap(&Ident::from(column.as_str()))?,
                        self.placeholder(value)
                    ));
                }
            }
        }
        let insert_columns: Result<Vec<String>> = columns
            .iter()
            .map(|c| self.wrap(&Ident::from(c.as_str())))
            .collect();
        let insert_columns = insert_columns?;
        let source_columns = insert_columns
            .iter()
            .map(|c| format!("[source].{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "merge {table} using (values {values}) as [source] ({column_list}) \
             on {} when matched then update set {} \
             when not matched then insert ({}) values ({source_columns});",
            on?.join(" and "),
            assignments.join(", "),
            insert_columns.join(", ")
        ))
    }
}
