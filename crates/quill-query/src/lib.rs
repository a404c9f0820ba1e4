//! Fluent query building and dialect-aware SQL compilation for Quill.
//!
//! `quill-query` is the **query construction layer**. It provides the
//! mutable [`Builder`] that accumulates a statement description and the
//! [`Grammar`] compilers that turn it into SQL text plus an ordered
//! parameter list.
//!
//! # Role In The Architecture
//!
//! - **Builder**: fluent mutators record structured clauses and capture
//!   parameter bindings as they are called.
//! - **Grammar**: one compiler per dialect (MySQL, Postgres, SQLite,
//!   SQL Server, plus an ANSI generic) renders the recorded clauses.
//! - **Joins and sub-queries**: nested builders share their parent's
//!   grammar so every fragment compiles in the same dialect.
//!
//! Compiled statements execute through the `Connection` trait from
//! `quill-core`. Most users access the builder via the `quill` facade
//! crate.

pub mod builder;
pub mod clause;
pub mod expression;
pub mod grammar;
pub mod join;

pub use builder::Builder;
pub use clause::{
    Assignment, BindingKind, Bindings, Conjunction, DatePart, Direction, Distinct, Having,
    Operand, Order, Part, Union, WhereClause,
};
pub use expression::{Expression, Ident};
pub use grammar::{
    GenericGrammar, Grammar, MySqlGrammar, PostgresGrammar, SqlServerGrammar, SqliteGrammar,
};
pub use join::{JoinClause, JoinKind};
