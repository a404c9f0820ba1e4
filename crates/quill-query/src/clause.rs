//! Structured clause records and the parameter binding store.
//!
//! Every fluent mutation appends one of these records to the owning
//! [`Builder`](crate::builder::Builder). The grammar compiles them by
//! exhaustive `match` dispatch, so a new clause kind cannot be forgotten
//! in any dialect.

use crate::builder::Builder;
use crate::expression::{Expression, Ident};
use quill_core::{Error, Result, Value};

/// Boolean connector between consecutive clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    /// The SQL keyword for this connector.
    pub const fn as_str(self) -> &'static str {
        match self {
            Conjunction::And => "and",
            Conjunction::Or => "or",
        }
    }
}

/// Sort direction for an order clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// The SQL keyword for this direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    /// Parse a direction case-insensitively.
    ///
    /// Anything but `asc`/`desc` is an invalid-argument error, detected
    /// at mutation time.
    pub fn parse(direction: &str) -> Result<Self> {
        match direction.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(Error::invalid_argument(format!(
                "order direction must be \"asc\" or \"desc\", got \"{other}\""
            ))),
        }
    }
}

/// Date component targeted by the date-part where variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Date,
    Day,
    Month,
    Year,
    Time,
}

impl DatePart {
    /// The lowercase SQL function name used by grammars with native
    /// date-part functions.
    pub const fn as_str(self) -> &'static str {
        match self {
            DatePart::Date => "date",
            DatePart::Day => "day",
            DatePart::Month => "month",
            DatePart::Year => "year",
            DatePart::Time => "time",
        }
    }
}

/// A value position in a clause: either a bindable [`Value`] (compiled to
/// a `?` placeholder) or a raw [`Expression`] emitted verbatim with no
/// binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Raw(Expression),
}

impl Operand {
    /// True if this operand is a raw expression.
    pub const fn is_raw(&self) -> bool {
        matches!(self, Operand::Raw(_))
    }

    /// The bindable value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Raw(_) => None,
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Expression> for Operand {
    fn from(e: Expression) -> Self {
        Operand::Raw(e)
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Operand {
            fn from(v: $ty) -> Self {
                Operand::Value(Value::from(v))
            }
        })+
    };
}

operand_from_value!(bool, i32, i64, f32, f64, &str, String);

/// One predicate in a `where` list (or a join's `on` list).
#[derive(Debug, Clone)]
pub enum WhereClause {
    /// `column operator ?`
    Basic {
        column: Ident,
        operator: String,
        value: Operand,
        conjunction: Conjunction,
    },
    /// `column [not] in (?, ?, …)`; an empty list compiles to a
    /// tautological `0 = 1` (or `1 = 1` when negated).
    In {
        column: Ident,
        values: Vec<Operand>,
        not: bool,
        conjunction: Conjunction,
    },
    /// `column [not] in (select …)`
    InSub {
        column: Ident,
        query: Box<Builder>,
        not: bool,
        conjunction: Conjunction,
    },
    /// `column is [not] null`
    Null {
        column: Ident,
        not: bool,
        conjunction: Conjunction,
    },
    /// `column [not] between ? and ?`
    Between {
        column: Ident,
        low: Operand,
        high: Operand,
        not: bool,
        conjunction: Conjunction,
    },
    /// `column [not] between low_column and high_column`
    BetweenColumns {
        column: Ident,
        low: Ident,
        high: Ident,
        not: bool,
        conjunction: Conjunction,
    },
    /// `first operator second`, both sides columns (no binding)
    Column {
        first: Ident,
        operator: String,
        second: Ident,
        conjunction: Conjunction,
    },
    /// `[not] exists (select …)`
    Exists {
        query: Box<Builder>,
        not: bool,
        conjunction: Conjunction,
    },
    /// `column operator (select …)`
    Sub {
        column: Ident,
        operator: String,
        query: Box<Builder>,
        conjunction: Conjunction,
    },
    /// `(…nested predicate group…)`
    Nested {
        query: Box<Builder>,
        conjunction: Conjunction,
    },
    /// Raw predicate fragment
    Raw {
        sql: Expression,
        conjunction: Conjunction,
    },
    /// Date-part comparison (`whereDate`/`Day`/`Month`/`Year`/`Time`)
    DateBased {
        part: DatePart,
        column: Ident,
        operator: String,
        value: Value,
        conjunction: Conjunction,
    },
}

impl WhereClause {
    /// The boolean connector recorded with this clause.
    pub const fn conjunction(&self) -> Conjunction {
        match self {
            WhereClause::Basic { conjunction, .. }
            | WhereClause::In { conjunction, .. }
            | WhereClause::InSub { conjunction, .. }
            | WhereClause::Null { conjunction, .. }
            | WhereClause::Between { conjunction, .. }
            | WhereClause::BetweenColumns { conjunction, .. }
            | WhereClause::Column { conjunction, .. }
            | WhereClause::Exists { conjunction, .. }
            | WhereClause::Sub { conjunction, .. }
            | WhereClause::Nested { conjunction, .. }
            | WhereClause::Raw { conjunction, .. }
            | WhereClause::DateBased { conjunction, .. } => *conjunction,
        }
    }
}

/// One predicate in a `having` list.
#[derive(Debug, Clone)]
pub enum Having {
    /// `column operator ?`
    Basic {
        column: Ident,
        operator: String,
        value: Operand,
        conjunction: Conjunction,
    },
    /// `column [not] between ? and ?`
    Between {
        column: Ident,
        low: Value,
        high: Value,
        not: bool,
        conjunction: Conjunction,
    },
    /// Raw having fragment
    Raw {
        sql: Expression,
        conjunction: Conjunction,
    },
}

impl Having {
    /// The boolean connector recorded with this clause.
    pub const fn conjunction(&self) -> Conjunction {
        match self {
            Having::Basic { conjunction, .. }
            | Having::Between { conjunction, .. }
            | Having::Raw { conjunction, .. } => *conjunction,
        }
    }
}

/// One entry in an `order by` list.
#[derive(Debug, Clone)]
pub enum Order {
    /// `column asc|desc`
    By { column: Ident, direction: Direction },
    /// Raw order fragment
    Raw(Expression),
}

/// A query combined into this one via `union [all]`.
#[derive(Debug, Clone)]
pub struct Union {
    pub query: Box<Builder>,
    pub all: bool,
}

/// Transient aggregate descriptor installed while compiling
/// `count`/`min`/`max`/`sum`/`avg`.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub function: String,
    pub columns: Vec<Ident>,
}

/// Distinct state: off, plain `distinct`, or `distinct on (columns)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Distinct {
    #[default]
    Off,
    All,
    Columns(Vec<Ident>),
}

/// One entry in an upsert's update-assignment list.
#[derive(Debug, Clone)]
pub enum Assignment {
    /// Set the column to the value from the inserted row (no binding).
    Column(String),
    /// Set the column to an explicit value.
    Pair(String, Operand),
}

/// The named binding buckets, in their fixed flatten order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Select,
    From,
    Join,
    Where,
    GroupBy,
    Having,
    Order,
    Union,
    UnionOrder,
}

/// The per-query binding store.
///
/// Each mutation that binds a runtime value pushes it into the bucket for
/// the clause family it belongs to. [`Bindings::flatten`] concatenates the
/// buckets in the fixed order `select, from, join, where, group_by,
/// having, order, union, union_order`, which must equal the left-to-right
/// order of `?` placeholders in the compiled SQL text. That alignment is
/// the safety-critical property of the whole subsystem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    pub select: Vec<Value>,
    pub from: Vec<Value>,
    pub join: Vec<Value>,
    pub wheres: Vec<Value>,
    pub group_by: Vec<Value>,
    pub having: Vec<Value>,
    pub order: Vec<Value>,
    pub union: Vec<Value>,
    pub union_order: Vec<Value>,
}

impl Bindings {
    /// Mutable access to one bucket.
    pub fn bucket_mut(&mut self, kind: BindingKind) -> &mut Vec<Value> {
        match kind {
            BindingKind::Select => &mut self.select,
            BindingKind::From => &mut self.from,
            BindingKind::Join => &mut self.join,
            BindingKind::Where => &mut self.wheres,
            BindingKind::GroupBy => &mut self.group_by,
            BindingKind::Having => &mut self.having,
            BindingKind::Order => &mut self.order,
            BindingKind::Union => &mut self.union,
            BindingKind::UnionOrder => &mut self.union_order,
        }
    }

    /// Read access to one bucket.
    pub fn bucket(&self, kind: BindingKind) -> &[Value] {
        match kind {
            BindingKind::Select => &self.select,
            BindingKind::From => &self.from,
            BindingKind::Join => &self.join,
            BindingKind::Where => &self.wheres,
            BindingKind::GroupBy => &self.group_by,
            BindingKind::Having => &self.having,
            BindingKind::Order => &self.order,
            BindingKind::Union => &self.union,
            BindingKind::UnionOrder => &self.union_order,
        }
    }

    /// Append one value to a bucket.
    pub fn push(&mut self, kind: BindingKind, value: Value) {
        self.bucket_mut(kind).push(value);
    }

    /// Append many values to a bucket, preserving their order.
    pub fn extend(&mut self, kind: BindingKind, values: impl IntoIterator<Item = Value>) {
        self.bucket_mut(kind).extend(values);
    }

    /// Empty one bucket.
    pub fn clear(&mut self, kind: BindingKind) {
        self.bucket_mut(kind).clear();
    }

    /// Flatten all buckets in the fixed order.
    pub fn flatten(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.select.iter().cloned());
        out.extend(self.from.iter().cloned());
        out.extend(self.join.iter().cloned());
        out.extend(self.wheres.iter().cloned());
        out.extend(self.group_by.iter().cloned());
        out.extend(self.having.iter().cloned());
        out.extend(self.order.iter().cloned());
        out.extend(self.union.iter().cloned());
        out.extend(self.union_order.iter().cloned());
        out
    }

    /// Total number of bound values across all buckets.
    pub fn len(&self) -> usize {
        self.select.len()
            + self.from.len()
            + self.join.len()
            + self.wheres.len()
            + self.group_by.len()
            + self.having.len()
            + self.order.len()
            + self.union.len()
            + self.union_order.len()
    }

    /// True if no values are bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resettable query parts, used by `clone_without`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Columns,
    Wheres,
    Orders,
    Limit,
    Offset,
    Unions,
}
