//! Core types and traits for Quill.
//!
//! This crate provides the foundational abstractions the query layer
//! builds on:
//!
//! - `Value` for dynamically-typed parameter binding
//! - `Row` for result access
//! - `Error`/`Result` for the workspace error taxonomy
//! - `Connection` trait for executing compiled statements
//! - `Processor` trait for driver result post-processing

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod error;
pub mod processor;
pub mod row;
pub mod value;

pub use connection::Connection;
pub use error::{
    ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Result, TypeError,
};
pub use processor::{DefaultProcessor, Processor};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
