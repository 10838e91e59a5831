//! Query descriptors handed to [`crate::DurableStore::query`].

use crate::error::BackendResult;
use crate::key::Key;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use storm_codec::{decode_value, Value};

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Operator {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Operator::Eq => ord == Ordering::Equal,
            Operator::Ne => ord != Ordering::Equal,
            Operator::Lt => ord == Ordering::Less,
            Operator::Le => ord != Ordering::Greater,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Ge => ord != Ordering::Less,
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            other => Err(format!("unknown operator {other:?}")),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// A single field predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name as it appears in the encoded record.
    pub field: String,
    /// Comparison operator.
    pub op: Operator,
    /// Right-hand side of the comparison.
    pub value: Value,
}

impl Filter {
    /// Returns true if the decoded record satisfies this filter.
    ///
    /// A record without the field never matches.
    pub fn matches(&self, record: &Value) -> bool {
        record
            .get(&self.field)
            .is_some_and(|field| self.op.accepts(field.cmp_total(&self.value)))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// A sort order on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Field name as it appears in the encoded record.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

/// An enumeration request against one collection.
///
/// Filters are combined with AND. Orders apply in the order they were
/// added; ties fall back to key order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// Collection to enumerate.
    pub kind: String,
    /// Predicates every result must satisfy.
    pub filters: Vec<Filter>,
    /// Sort orders, most significant first.
    pub orders: Vec<Order>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl QueryDescriptor {
    /// Creates an unfiltered, unordered query over a collection.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
        }
    }

    /// Evaluates this query over raw entries of its collection.
    ///
    /// Reference backends use this after collecting every entry of
    /// `self.kind`. Entries are expected in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored record cannot be decoded.
    pub fn evaluate<I>(&self, entries: I) -> BackendResult<Vec<(Key, Vec<u8>)>>
    where
        I: IntoIterator<Item = (Key, Vec<u8>)>,
    {
        let mut rows = Vec::new();
        for (key, bytes) in entries {
            let record = decode_value(&bytes)?;
            if self.filters.iter().all(|f| f.matches(&record)) {
                rows.push((key, record, bytes));
            }
        }

        if !self.orders.is_empty() {
            rows.sort_by(|a, b| self.compare(&a.1, &b.1));
        }

        let limit = self.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(key, _, bytes)| (key, bytes))
            .collect())
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for order in &self.orders {
            let ord = match (a.get(&order.field), b.get(&order.field)) {
                (Some(x), Some(y)) => x.cmp_total(y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ord = match order.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
