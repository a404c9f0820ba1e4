//! Quill - fluent SQL query building for Rust, designed to be intuitive
//! and dialect-aware.
//!
//! Quill separates *describing* a query from *rendering* it. A mutable
//! [`Builder`] records clauses and captures parameter bindings as its
//! fluent methods are called; a per-dialect [`Grammar`] then compiles the
//! recorded state into SQL text with `?` placeholders and a flat,
//! ordered parameter list. Compilation never mutates the builder, so the
//! same builder can be compiled repeatedly or cloned and extended.
//!
//! # Quick Start
//!
//! ```ignore
//! use quill::prelude::*;
//!
//! async fn main_example(cx: &Cx, conn: &impl Connection) {
//!     // Describe a query
//!     let query = Builder::postgres()
//!         .from("users")
//!         .where_("age", ">", 18)
//!         .unwrap()
//!         .order_by("name", "asc")
//!         .unwrap()
//!         .limit(10);
//!
//!     // Inspect what will run
//!     let (sql, params) = query.to_sql_with_bindings().unwrap();
//!     assert_eq!(
//!         sql,
//!         "select * from \"users\" where \"age\" > ? order by \"name\" asc limit 10"
//!     );
//!     assert_eq!(params, vec![Value::Int(18)]);
//!
//!     // Or run it
//!     let rows = query.get(cx, conn).await.unwrap();
//!
//!     // Writes share the same surface
//!     let id = Builder::postgres()
//!         .from("users")
//!         .insert_get_id(cx, conn, [("name", "Ada")], None)
//!         .await
//!         .unwrap();
//!
//!     Builder::postgres()
//!         .from("users")
//!         .where_eq("id", id)
//!         .unwrap()
//!         .delete(cx, conn)
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! # Features
//!
//! - **Dialect grammars**: MySQL, PostgreSQL, SQLite and SQL Server
//!   compilers plus an ANSI generic, all behind one trait
//! - **Early validation**: operators, sort directions and null
//!   comparisons are checked when a clause is added, not at compile time
//! - **Structured concurrency**: execution is built on asupersync for
//!   cancel-correct operations
//! - **Sub-queries and joins**: nested builders share their parent's
//!   grammar so every fragment renders in the same dialect

// Re-export all public types from sub-crates
pub use quill_core::{
    // asupersync re-exports
    Cx,
    Outcome,
    // Core types
    ColumnInfo,
    Connection,
    ConnectionError,
    ConnectionErrorKind,
    DefaultProcessor,
    Error,
    FromValue,
    Processor,
    QueryError,
    QueryErrorKind,
    Result,
    Row,
    TypeError,
    Value,
};

pub use quill_query::{
    Assignment, BindingKind, Bindings, Builder, Conjunction, DatePart, Direction, Distinct,
    Expression, GenericGrammar, Grammar, Having, Ident, JoinClause, JoinKind, MySqlGrammar,
    Operand, Order, Part, PostgresGrammar, SqlServerGrammar, SqliteGrammar, Union, WhereClause,
};

/// Convenience prelude importing the types most queries touch.
///
/// ```ignore
/// use quill::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Query building
        Builder,
        // Core traits and types
        Connection,
        // asupersync
        Cx,
        Error,
        Expression,
        Grammar,
        Ident,
        Operand,
        Outcome,
        Processor,
        Result,
        Row,
        Value,
    };
}
