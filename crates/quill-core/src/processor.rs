//! Result post-processing collaborator.

use crate::Result;
use crate::error::Error;
use crate::row::Row;

/// Post-processes raw driver results before they reach the caller.
///
/// The query layer calls these hooks but implements neither; drivers with
/// quirky result shapes (e.g. string-typed integers) supply their own.
pub trait Processor: Send + Sync {
    /// Shape a select result set.
    fn process_select(&self, rows: Vec<Row>) -> Vec<Row> {
        rows
    }

    /// Extract the inserted ID from an insert-returning result.
    ///
    /// `sequence` names the key column the caller asked for; falls back
    /// to the first column of the returned row.
    fn process_insert_get_id(&self, row: Option<&Row>, sequence: &str) -> Result<i64> {
        let row = row.ok_or_else(|| Error::Custom("insert returned no row".to_string()))?;
        if row.contains_column(sequence) {
            row.get_named::<i64>(sequence)
        } else {
            row.get_as::<i64>(0)
        }
    }
}

/// Passthrough processor used when a driver needs no shaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessor;

impl Processor for DefaultProcessor {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn insert_get_id_prefers_named_sequence() {
        let row = Row::new(
            vec!["other".into(), "id".into()],
            vec![Value::BigInt(1), Value::BigInt(42)],
        );
        let id = DefaultProcessor
            .process_insert_get_id(Some(&row), "id")
            .unwrap();
        assert_eq!(id, 42);
    }

    #[test]
    fn insert_get_id_falls_back_to_first_column() {
        let row = Row::new(vec!["seq".into()], vec![Value::BigInt(9)]);
        let id = DefaultProcessor
            .process_insert_get_id(Some(&row), "id")
            .unwrap();
        assert_eq!(id, 9);
    }

    #[test]
    fn insert_get_id_errors_without_row() {
        assert!(DefaultProcessor.process_insert_get_id(None, "id").is_err());
    }
}
