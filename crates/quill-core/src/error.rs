//! Error types for query building and execution.

use std::fmt;

/// The primary error type for all Quill operations.
#[derive(Debug)]
pub enum Error {
    /// An illegal argument handed to a fluent mutator.
    ///
    /// Raised synchronously at mutation time: invalid order direction,
    /// an operator outside the grammar allow-list, or a NULL value paired
    /// with a comparator other than `=`/`<>`/`!=`.
    InvalidArgument(String),

    /// The active grammar cannot express the requested operation.
    ///
    /// Raised at compile time so callers can select a dialect-specific
    /// fallback instead of receiving best-effort, possibly-wrong SQL.
    UnsupportedGrammar {
        /// Grammar name (e.g. `sqlserver`)
        grammar: &'static str,
        /// Operation name (e.g. `insert or ignore`)
        operation: &'static str,
    },

    /// Query execution errors reported by the driver
    Query(QueryError),
    /// Connection-related errors reported by the driver
    Connection(ConnectionError),
    /// Type conversion errors when reading result rows
    Type(TypeError),
    /// I/O errors
    Io(std::io::Error),
    /// Operation was cancelled via asupersync
    Cancelled,
    /// Custom error with message
    Custom(String),
}

/// A query error as reported by a database driver.
#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Permission denied
    Permission,
    /// Statement timeout
    Timeout,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Authentication failed
    Authentication,
    /// Connection lost during operation
    Disconnected,
    /// Connection refused
    Refused,
}

/// A failed conversion from a dynamic value to a Rust type.
#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl Error {
    /// Shorthand for an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Shorthand for an unsupported-grammar error.
    pub fn unsupported(grammar: &'static str, operation: &'static str) -> Self {
        Error::UnsupportedGrammar { grammar, operation }
    }

    /// True if this is a mutation-time invalid-argument error.
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// True if this is a compile-time unsupported-operation error.
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedGrammar { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::UnsupportedGrammar { grammar, operation } => {
                write!(f, "the {grammar} grammar does not support {operation}")
            }
            Error::Query(e) => {
                write!(f, "query error: {}", e.message)?;
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, " (sqlstate {sqlstate})")?;
                }
                if let Some(sql) = &e.sql {
                    write!(f, " in: {sql}")?;
                }
                Ok(())
            }
            Error::Connection(e) => write!(f, "connection error: {}", e.message),
            Error::Type(e) => {
                write!(f, "type error: expected {}, got {}", e.expected, e.actual)?;
                if let Some(column) = &e.column {
                    write!(f, " for column `{column}`")?;
                }
                Ok(())
            }
            Error::Io(e) => write!(f, "i/o error: {e}"),
            Error::Cancelled => write!(f, "operation cancelled"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e.source.as_deref().map(|s| s as _),
            Error::Connection(e) => e.source.as_deref().map(|s| s as _),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient result alias using the Quill [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_display() {
        let e = Error::invalid_argument("order direction must be asc or desc");
        assert!(e.is_invalid_argument());
        assert_eq!(
            e.to_string(),
            "invalid argument: order direction must be asc or desc"
        );
    }

    #[test]
    fn unsupported_display() {
        let e = Error::unsupported("sqlserver", "insert or ignore");
        assert!(e.is_unsupported());
        assert_eq!(
            e.to_string(),
            "the sqlserver grammar does not support insert or ignore"
        );
    }

    #[test]
    fn error_kinds_are_distinct() {
        assert!(!Error::invalid_argument("x").is_unsupported());
        assert!(!Error::unsupported("mysql", "x").is_invalid_argument());
    }
}
