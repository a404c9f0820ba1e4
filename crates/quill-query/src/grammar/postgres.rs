//! PostgreSQL dialect: `distinct on`, `ilike`/regex operators, `->`/`->>`
//! JSON paths, `on conflict` upserts and `returning`-based key retrieval.

use quill_core::{Result, Value};

use super::{delete_without_joins, split_json_path, update_without_joins, Grammar};
use crate::builder::Builder;
use crate::clause::{Assignment, DatePart, Distinct, Operand};
use crate::expression::Ident;

const POSTGRES_OPERATORS: &[&str] = &[
    "=", "<", ">", "<=", ">=", "<>", "!=", "like", "not like", "ilike", "not ilike", "&", "|",
    "^", "<<", ">>", "is", "is not", "~", "~*", "!~", "!~*", "similar to", "not similar to",
    "@>", "<@", "&&",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresGrammar;

impl Grammar for PostgresGrammar {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn operators(&self) -> &[&'static str] {
        POSTGRES_OPERATORS
    }

    fn insert_get_id_uses_returning(&self) -> bool {
        true
    }

    fn select_prefix(&self, distinct: &Distinct) -> Result<String> {
        Ok(match distinct {
            Distinct::Off => "select".to_string(),
            Distinct::All => "select distinct".to_string(),
            Distinct::Columns(columns) => {
                format!("select distinct on ({})", self.columnize(columns)?)
            }
        })
    }

    /// `col->'a'->>'b'`: intermediate hops stay JSON, the final hop
    /// extracts text.
    fn wrap_json_selector(&self, column: &str) -> Result<String> {
        let (base, path) = split_json_path(column);
        let mut sql = self.wrap(&Ident::from(base))?;
        for (i, segment) in path.iter().enumerate() {
            let arrow = if i + 1 == path.len() { "->>" } else { "->" };
            sql.push_str(&format!("{arrow}'{segment}'"));
        }
        Ok(sql)
    }

    fn compile_date_based(&self, part: DatePart, column: &str, operator: &str) -> String {
        match part {
            DatePart::Date => format!("{column}::date {operator} ?"),
            DatePart::Time => format!("{column}::time {operator} ?"),
            DatePart::Day | DatePart::Month | DatePart::Year => {
                format!("extract({} from {column}) {operator} ?", part.as_str())
            }
        }
    }

    fn compile_insert_or_ignore(
        &self,
        query: &Builder,
        columns: &[String],
        rows: &[Vec<Operand>],
    ) -> Result<String> {
        let sql = self.compile_insert(query, columns, rows)?;
        Ok(format!("{sql} on conflict do nothing"))
    }

    fn compile_insert_get_id(
        &self,
        query: &Builder,
        columns: &[String],
        row: &[Operand],
        sequence: &str,
    ) -> Result<String> {
        let sql = self.compile_insert(query, columns, &[row.to_vec()])?;
        Ok(format!(
            "{sql} returning {}",
            self.wrap(&Ident::from(sequence))?
        ))
    }

    fn compile_update_assignment(&self, column: &str, value: &Operand) -> Result<String> {
        if column.contains("->") {
            let (base, path) = split_json_path(column);
            let base = self.wrap(&Ident::from(base))?;
            let path = path
                .iter()
                .map(|s| format!("\"{s}\""))
                .collect::<Vec<_>>()
                .join(",");
            return Ok(format!(
                "{base} = jsonb_set({base}::jsonb, '{{{path}}}', {})",
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

    fn compile_truncate(&self, query: &Builder) -> Result<Vec<(String, Vec<Value>)>> {
        Ok(vec![(
            format!(
                "truncate {} restart identity cascade",
                self.table_sql(query)?
            ),
            Vec::new(),
        )])
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
    fn distinct_on_columns() {
        let q = Builder::postgres()
            .from("logs")
            .select(["user_id", "created_at"])
            .distinct_on(["user_id"]);
        assert_eq!(
            sql(&q),
            "select distinct on (\"user_id\") \"user_id\", \"created_at\" from \"logs\""
        );
    }

    #[test]
    fn ilike_operator_is_accepted() {
        let q = Builder::postgres()
            .from("users")
            .where_("name", "ilike", "ada%")
            .unwrap();
        assert_eq!(sql(&q), "select * from \"users\" where \"name\" ilike ?");
    }

    #[test]
    fn ilike_is_rejected_by_generic_grammar() {
        let err = Builder::generic()
            .from("users")
            .where_("name", "ilike", "ada%")
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn json_selector_extracts_text_at_the_leaf() {
        let q = Builder::postgres()
            .from("users")
            .where_eq("preferences->notifications->email", true)
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"users\" where \
             \"preferences\"->'notifications'->>'email' = ?"
        );
    }

    #[test]
    fn date_based_wheres_cast_and_extract() {
        let q = Builder::postgres()
            .from("logs")
            .where_date("created_at", "=", "2026-08-31")
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"logs\" where \"created_at\"::date = ?"
        );

        let q = Builder::postgres()
            .from("logs")
            .where_year("created_at", ">=", 2026)
            .unwrap();
        assert_eq!(
            sql(&q),
            "select * from \"logs\" where extract(year from \"created_at\") >= ?"
        );
    }

    #[test]
    fn insert_or_ignore_uses_on_conflict_do_nothing() {
        let q = Builder::postgres().from("users");
        let (sql, _) = q
            .insert_or_ignore_statement([[("email", Operand::from("a@b.c"))]])
            .unwrap();
        assert_eq!(
            sql,
            "insert into \"users\" (\"email\") values (?) on conflict do nothing"
        );
    }

    #[test]
    fn insert_get_id_appends_returning() {
        let q = Builder::postgres().from("users");
        let (sql, _) = q
            .insert_get_id_statement([("email", Operand::from("a@b.c"))], None)
            .unwrap();
        assert_eq!(
            sql,
            "insert into \"users\" (\"email\") values (?) returning \"id\""
        );

        let (sql, _) = q
            .insert_get_id_statement([("email", Operand::from("a@b.c"))], Some("user_id"))
            .unwrap();
        assert_eq!(
            sql,
            "insert into \"users\" (\"email\") values (?) returning \"user_id\""
        );
    }

    #[test]
    fn upsert_updates_from_excluded() {
        let q = Builder::postgres().from("users");
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
    fn joined_update_and_delete_are_unsupported() {
        let q = Builder::postgres()
            .from("users")
            .join("contacts", "users.id", "=", "contacts.user_id")
            .unwrap();
        let err = q
            .update_statement([("active", Operand::from(false))])
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(q.delete_statement().unwrap_err().is_unsupported());
    }

    #[test]
    fn truncate_restarts_identity() {
        let q = Builder::postgres().from("users");
        assert_eq!(
            q.truncate_statements().unwrap(),
            vec![(
                "truncate \"users\" restart identity cascade".to_string(),
                Vec::new()
            )]
        );
    }

    #[test]
    fn jsonb_set_update() {
        let q = Builder::postgres().from("users");
        let (sql, _) = q
            .update_statement([("preferences->theme", Operand::from("dark"))])
            .unwrap();
        assert_eq!(
            sql,
            "update \"users\" set \"preferences\" = \
             jsonb_set(\"preferences\"::jsonb, '{\"theme\"}', ?)"
        );
    }
}
