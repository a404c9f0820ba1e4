//! Database connection trait.
//!
//! The query layer is a pure compiler; execution happens through this
//! narrow interface. Implementations live in driver crates and must be
//! `Send + Sync`. All operations are async and take a `Cx` context for
//! cancellation/timeout support via asupersync.

use crate::processor::{DefaultProcessor, Processor};
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};

static DEFAULT_PROCESSOR: DefaultProcessor = DefaultProcessor;

/// A database connection capable of executing compiled statements.
///
/// The query builder hands every statement over as SQL text plus a flat,
/// ordered parameter list; the connection never sees builder internals.
/// Driver errors propagate unchanged through the returned `Outcome`.
pub trait Connection: Send + Sync {
    /// Execute a select and return all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send;

    /// Execute a select and return the first row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, crate::Error>> + Send;

    /// Execute an affecting statement (UPDATE, DELETE) and return rows affected.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, crate::Error>> + Send;

    /// Execute an INSERT and return the last inserted ID.
    fn insert(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<i64, crate::Error>> + Send;

    /// Execute a statement where no result is expected (e.g. truncate).
    fn statement(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<(), crate::Error>> + Send;

    /// The result post-processor paired with this connection.
    ///
    /// Drivers with driver-specific result shaping override this; the
    /// default is a passthrough.
    fn post_processor(&self) -> &dyn Processor {
        &DEFAULT_PROCESSOR
    }
}
