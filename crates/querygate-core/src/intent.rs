//! Structured request intent
//!
//! A [`QueryIntent`] is what every translator produces and what the SQL
//! builder consumes. It names catalog entities but is not trusted until the
//! builder has validated it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A value bound as a statement parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Borrow the text if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Equals,
    Like,
    Greater,
    Less,
    Between,
}

impl FilterOp {
    /// Number of values the operator takes
    pub fn arity(&self) -> usize {
        match self {
            Self::Between => 2,
            _ => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Like => "like",
            Self::Greater => "greater",
            Self::Less => "less",
            Self::Between => "between",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for operator names that are not part of the intent vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown filter operator: {0}")]
pub struct UnknownOperator(pub String);

impl FromStr for FilterOp {
    type Err = UnknownOperator;

    /// Accepts the operator names and their usual SQL spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" | "eq" | "=" | "==" => Ok(Self::Equals),
            "like" => Ok(Self::Like),
            "greater" | "gt" | ">" => Ok(Self::Greater),
            "less" | "lt" | "<" => Ok(Self::Less),
            "between" => Ok(Self::Between),
            _ => Err(UnknownOperator(s.to_string())),
        }
    }
}

/// A single predicate on one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub values: Vec<ParamValue>,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, values: Vec<ParamValue>) -> Self {
        Self {
            column: column.into(),
            op,
            values,
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self::new(column, FilterOp::Equals, vec![value.into()])
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(column, FilterOp::Like, vec![ParamValue::Text(pattern.into())])
    }

    pub fn greater(column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self::new(column, FilterOp::Greater, vec![value.into()])
    }

    pub fn less(column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self::new(column, FilterOp::Less, vec![value.into()])
    }

    pub fn between(
        column: impl Into<String>,
        low: impl Into<ParamValue>,
        high: impl Into<ParamValue>,
    ) -> Self {
        Self::new(column, FilterOp::Between, vec![low.into(), high.into()])
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// ORDER BY request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub column: String,
    pub direction: SortDirection,
}

impl Ordering {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Structured representation of a request prior to SQL generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    /// Target table
    pub table: String,

    /// Requested columns; empty means every column of the table
    #[serde(default)]
    pub columns: Vec<String>,

    /// Predicates, joined with AND
    #[serde(default)]
    pub filters: Vec<Filter>,

    #[serde(default)]
    pub order_by: Option<Ordering>,

    #[serde(default)]
    pub limit: Option<u32>,
}

impl QueryIntent {
    /// Intent selecting every column of `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_order(mut self, ordering: Ordering) -> Self {
        self.order_by = Some(ordering);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filters on `column`, in order
    pub fn filters_on<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Filter> + 'a {
        self.filters.iter().filter(move |f| f.column == column)
    }
}
