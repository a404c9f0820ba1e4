//! SQLite dialect: `insert or ignore`, `on conflict` upserts, strftime
//! date parts, sequence-table truncation.

use quill_core::{Result, Value};

use super::{delete_without_joins, split_json_path, update_without_joins, Grammar};
use crate::builder::Builder;
use crate::clause::{Assignment, DatePart, Operand};
use crate::expression::Ident;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteGrammar;

fn json_path(segments: &[&str]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        path.push_str(&format!(".\"{segment}\""));
    }
    path
}

impl Grammar for SqliteGrammar {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn wrap_json_selector(&self, column: &str) -> Result<String> {
        let (base, path) = split_json_path(column);
        Ok(format!(
            "json_extract({}, '{}')",
            self.wrap(&Ident::from(base))?,
            json_path(&path)
        ))
    }

    /// strftime produces text, so the bound value is cast to text for a
    /// consistent comparison.
    fn compile_date_based(&self, part: DatePart, column: &str, operator: &str) -> String {
        let format = match part {
            DatePart::Date => "%Y-%m-%d",
            DatePart::Day => "%d",
            DatePart::Month => "%m",
            DatePart::Year => "%Y",
            DatePart::Time => "%H:%M:%S",
        };
        format!("strftime('{format}', {column}) {operator} cast(? as text)")
    }

    /// A union side keeps its own ordering/limit only when rewrapped as a
    /// plain select.
    fn wrap_union(&self, sql: &str) -> String {
        format!("select * from ({sql})")
    }

    fn compile_insert_or_ignore(
        &self,
        query: &Builder,
        columns: &[String],
        rows: &[Vec<Operand>],
    ) -> Result<String> {
        let sql = self.compile_insert(query, columns, rows)?;
        Ok(format!("insert or ignore{}", &sql["insert".len()..]))
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

    fn compile_upsert(
        &self,
        query: &Builder,
        columns: &[String],
        rows: &[Vec<Operand>],
        unique_by: &[String],
        update: &[Assignment],
    ) -> Result<String> {
        let insert = self.compile_insert(query, columns, rows)?;
        let conflict: Result<Vec<String>> = unique_by
            .iter()
            .map(|c| self.wrap(&Ident::from(c.as_str())))
            .collect();
        let mut assignments = Vec::with_capacity(update.len());
        for entry in update {
            match entry {
                Assignment::Column(column) => {
                    let wrapped = self.wrap(&Ident::from(column.as_str()))?;
                    assignments.push(format!("{wrapped} = excluded.{wrapped}"));
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
            "{insert} on conflict ({}) do update set {}",
            conflict?.join(", "),
            assignments.join(", ")
        ))
    }

    /// SQLite has no truncate; delete everything and reset the
    /// auto-increment counter in `sqlite_sequence`.
    fn compile_truncate(&self, query: &Builder) -> Result<Vec<(String, Vec<Value>)>> {
        let table = query
            .from
            .as_ref()
            .ok_or_else(|| quill_core::Error::invalid_argument("query has no table"))?;
        let name = match table {
            Ident::Plain(name) => name.clone(),
            Ident::Raw(e) => e.as_str().to_string(),
        };
        Ok(vec![
            (
                "delete from sqlite_sequence where name = ?".to_string(),
                vec![Value::Text(name)],
            ),
            (format!("delete from {}", self.table_sql(query)?), Vec::new()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn sql(builder: &Builder) -> String {
        builder.to_sql().unwrap()
    }

    #[test]
    fn strftime_date_parts_cast_bindings_to_text() {
        let q = Builder::sqlite()
            .from("logs")
            .where_month("created_at", "=", 8)
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"logs\" where strftime('%m', \"created_at\") = cast(? as text)"
        );
        // the builder zero-pads so the text comparison matches strftime
        assert_eq!(q.bindings(), vec![Value::Text("08".into())]);

        let q = Builder::sqlite()
            .from("logs")
            .where_time("created_at", ">=", "14:30:00")
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"logs\" where \
             strftime('%H:%M:%S', \"created_at\") >= cast(? as text)"
        );
    }

    #[test]
    fn union_sides_are_rewrapped_as_selects() {
        let q = Builder::sqlite()
            .from("a")
            .union(|q| Ok(q.from("b")))
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from (select * from \"a\") union select * from (select * from \"b\")"
        );
    }

    #[test]
    fn insert_or_ignore_keyword() {
        let q = Builder::sqlite().from("users");
        let (sql, _) = q
            .insert_or_ignore_statement([[("email", Operand::from("a@b.c"))]])
            .unwrap();
        assert_eq!(sql, "insert or ignore into \"users\" (\"email\") values (?)");
    }

    #[test]
    fn upsert_uses_on_conflict_clause() {
        let q = Builder::sqlite().from("users");
        let (sql, _) = q
            .upsert_statement(
                [[("email", Operand::from("a@b.c")), ("name", Operand::from("ada"))]],
                &["email"],
                None,
            )
            .unwrap();
        assert_eq!(
            sql,
            "insert into \"users\" (\"email\", \"name\") values (?, ?) \
             on conflict (\"email\") do update set \
             \"email\" = excluded.\"email\", \"name\" = excluded.\"name\""
        );
    }

    #[test]
    fn truncate_resets_the_sequence_then_deletes() {
        let q = Builder::sqlite().from("users");
        assert_eq!(
            q.truncate_statements().unwrap(),
            vec![
                (
                    "delete from sqlite_sequence where name = ?".to_string(),
                    vec![Value::Text("users".into())],
                ),
                ("delete from \"users\"".to_string(), Vec::new()),
            ]
        );
    }

    #[test]
    fn json_extract_selector() {
        let q = Builder::sqlite()
            .from("users")
            .where_eq("preferences->theme", "dark")
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" where \
             json_extract(\"preferences\", '$.\"theme\"') = ?"
        );
    }

    #[test]
    fn joined_delete_is_unsupported() {
        let q = Builder::sqlite()
            .from("users")
            .join("contacts", "users.id", "=", "contacts.user_id")
            .unwrap();
        assert!(q.delete_statement().unwrap_err().is_unsupported());
    }
}
