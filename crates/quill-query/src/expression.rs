//! Raw SQL expressions and identifier fragments.

use std::fmt;

/// An opaque wrapper marking a string as raw SQL.
///
/// Raw expressions are exempt from identifier quoting and from parameter
/// binding: the wrapped text is emitted verbatim into compiled SQL.
/// `clean_bindings` strips them out of bound-value lists before values
/// reach a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression(String);

impl Expression {
    /// Wrap a raw SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// The raw SQL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Expression {
    fn from(sql: &str) -> Self {
        Self(sql.to_string())
    }
}

impl From<String> for Expression {
    fn from(sql: String) -> Self {
        Self(sql)
    }
}

/// An identifier position in a query: either a plain name the grammar
/// quotes (with `table.column`, alias, and JSON-path handling) or a raw
/// expression emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ident {
    /// A plain identifier, subject to dialect quoting.
    Plain(String),
    /// A raw fragment, emitted as-is.
    Raw(Expression),
}

impl Ident {
    /// Create a raw identifier fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Ident::Raw(Expression::new(sql))
    }

    /// The plain name, if this is not a raw fragment.
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Ident::Plain(name) => Some(name),
            Ident::Raw(_) => None,
        }
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::Plain(name.to_string())
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Ident::Plain(name)
    }
}

impl From<Expression> for Ident {
    fn from(expr: Expression) -> Self {
        Ident::Raw(expr)
    }
}
