//! MySQL dialect: backtick quoting, `insert ignore`, duplicate-key
//! upserts, `json_extract` paths.

use quill_core::Result;

use super::{split_json_path, Grammar};
use crate::builder::Builder;
use crate::clause::{Assignment, Operand};
use crate::expression::Ident;

const MYSQL_OPERATORS: &[&str] = &[
    "=", "<", ">", "<=", ">=", "<>", "!=", "<=>", "like", "like binary", "not like", "&", "|",
    "^", "<<", ">>", "is", "is not", "rlike", "not rlike", "regexp", "not regexp", "sounds like",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlGrammar;

impl MySqlGrammar {
    /// `json_extract` expression without unquoting, used where the JSON
    /// type must survive (null probes).
    fn json_extract_sql(&self, column: &str) -> Result<String> {
        let (base, path) = split_json_path(column);
        Ok(format!(
            "json_extract({}, '{}')",
            self.wrap(&Ident::from(base))?,
            json_path(&path)
        ))
    }
}

fn json_path(segments: &[&str]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        path.push_str(&format!(".\"{segment}\""));
    }
    path
}

impl Grammar for MySqlGrammar {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn operators(&self) -> &[&'static str] {
        MYSQL_OPERATORS
    }

    fn quote_ident(&self, part: &str) -> String {
        format!("`{}`", part.replace('`', "``"))
    }

    fn wrap_json_selector(&self, column: &str) -> Result<String> {
        Ok(format!("json_unquote({})", self.json_extract_sql(column)?))
    }

    /// JSON null checks must treat a stored JSON `null` literal as null
    /// too; `json_extract` returns the non-null `'NULL'` type for those.
    fn compile_where_null(&self, column: &Ident, not: bool) -> Result<String> {
        if let Some(name) = column.as_plain() {
            if name.contains("->") {
                let field = self.json_extract_sql(name)?;
                return Ok(if not {
                    format!("({field} is not null AND json_type({field}) != 'NULL')")
                } else {
                    format!("({field} is null OR json_type({field}) = 'NULL')")
                });
            }
        }
        let keyword = if not { "is not null" } else { "is null" };
        Ok(format!("{} {keyword}", self.wrap(column)?))
    }

    fn compile_insert_or_ignore(
        &self,
        query: &Builder,
        columns: &[String],
        rows: &[Vec<Operand>],
    ) -> Result<String> {
        let sql = self.compile_insert(query, columns, rows)?;
        Ok(format!("insert ignore{}", &sql["insert".len()..]))
    }

    fn compile_update_assignment(&self, column: &str, value: &Operand) -> Result<String> {
        if column.contains("->") {
            let (base, path) = split_json_path(column);
            let base = self.wrap(&Ident::from(base))?;
            return Ok(format!(
                "{base} = json_set({base}, '{}', {})",
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
        _unique_by: &[String],
        update: &[Assignment],
    ) -> Result<String> {
        // MySQL infers the conflict target from the table's unique keys.
        let insert = self.compile_insert(query, columns, rows)?;
        let mut assignments = Vec::with_capacity(update.len());
        for entry in update {
            match entry {
                Assignment::Column(column) => {
                    let wrapped = self.wrap(&Ident::from(column.as_str()))?;
                    assignments.push(format!("{wrapped} = values({wrapped})"));
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
        Ok(format!(
            "{insert} on duplicate key update {}",
            assignments.join(", ")
        ))
    }
}
