//! Query façade.
//!
//! A [`Query`] builds a [`QueryDescriptor`] for one record type and runs
//! it against the durable store. Tests can inject a [`MockQueryResult`]
//! that answers the next `get_all` instead of the store.

use crate::entity::Model;
use crate::error::{CoreError, CoreResult};
use crate::resolver::collection_name;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use storm_backend::{
    Context, Direction, DurableStore, Filter, Key, Operator, Order, QueryDescriptor,
};
use storm_codec::{from_cbor, Value};
use tracing::debug;

/// A filtered, ordered enumeration of one collection.
///
/// Builder methods never fail; a malformed predicate is remembered and
/// reported by the next `count` or `get_all`.
pub struct Query<M: Model> {
    store: Arc<dyn DurableStore>,
    descriptor: QueryDescriptor,
    mock: Option<Arc<MockQueryResult<M>>>,
    error: Option<String>,
}

impl<M: Model> Query<M> {
    /// Starts a query over the collection `record` belongs to.
    pub fn new(store: Arc<dyn DurableStore>, record: &M) -> Self {
        Self {
            store,
            descriptor: QueryDescriptor::new(collection_name(record)),
            mock: None,
            error: None,
        }
    }

    /// Starts a query for an optional record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NilModel`] if `record` is `None`.
    pub fn try_for(store: Arc<dyn DurableStore>, record: Option<&M>) -> CoreResult<Self> {
        record
            .map(|record| Self::new(store, record))
            .ok_or(CoreError::NilModel)
    }

    /// Answers the next `get_all` from `mock` while it holds a result.
    #[must_use]
    pub fn with_mock(mut self, mock: Arc<MockQueryResult<M>>) -> Self {
        self.mock = Some(mock);
        self
    }

    /// Adds a predicate.
    ///
    /// `predicate` is a field name optionally followed by an operator:
    /// `"Age >="`, `"Name !="`. A bare field name means equality.
    #[must_use]
    pub fn filter(mut self, predicate: &str, value: impl Into<Value>) -> Self {
        match parse_predicate(predicate) {
            Ok((field, op)) => self.descriptor.filters.push(Filter {
                field,
                op,
                value: value.into(),
            }),
            Err(message) => self.fail(message),
        }
        self
    }

    /// Adds a sort order. A leading `-` sorts descending.
    #[must_use]
    pub fn order(mut self, field: &str) -> Self {
        let (field, direction) = match field.strip_prefix('-') {
            Some(rest) => (rest, Direction::Descending),
            None => (field, Direction::Ascending),
        };
        let field = field.trim();
        if field.is_empty() {
            self.fail("order field is empty".to_string());
        } else {
            self.descriptor.orders.push(Order {
                field: field.to_string(),
                direction,
            });
        }
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.descriptor.limit = Some(limit);
        self
    }

    /// Returns the descriptor that will be sent to the store.
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Counts matching entities. Never answered by the mock.
    ///
    /// # Errors
    ///
    /// Returns a deferred [`CoreError::InvalidQuery`] or a backend error.
    pub fn count(&self, ctx: &Context) -> CoreResult<usize> {
        self.check()?;
        debug!(collection = %self.descriptor.kind, "count");
        Ok(self.store.count(ctx, &self.descriptor)?)
    }

    /// Appends matching records to `out` and returns their keys.
    ///
    /// If a mock holds a pending result, that result is consumed instead:
    /// its records are appended and its keys returned, or its error.
    ///
    /// # Errors
    ///
    /// Returns a deferred [`CoreError::InvalidQuery`], the mock's error,
    /// a backend error, or a decoding error.
    pub fn get_all(&self, ctx: &Context, out: &mut Vec<M>) -> CoreResult<Vec<Key>> {
        self.check()?;

        if let Some(pending) = self.mock.as_ref().and_then(|mock| mock.take()) {
            debug!(collection = %self.descriptor.kind, "answered by mock");
            out.extend(pending.data);
            return match pending.error {
                Some(err) => Err(err),
                None => Ok(pending.keys),
            };
        }

        debug!(collection = %self.descriptor.kind, "get_all");
        let rows = self.store.query(ctx, &self.descriptor)?;
        let mut keys = Vec::with_capacity(rows.len());
        out.reserve(rows.len());
        for (key, bytes) in rows {
            out.push(from_cbor(&bytes)?);
            keys.push(key);
        }
        Ok(keys)
    }

    fn fail(&mut self, message: String) {
        self.error.get_or_insert(message);
    }

    fn check(&self) -> CoreResult<()> {
        match &self.error {
            Some(message) => Err(CoreError::invalid_query(message.clone())),
            None => Ok(()),
        }
    }
}

impl<M: Model> fmt::Debug for Query<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("descriptor", &self.descriptor)
            .field("mocked", &self.mock.is_some())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

fn parse_predicate(predicate: &str) -> Result<(String, Operator), String> {
    let mut parts = predicate.split_whitespace();
    let field = parts
        .next()
        .ok_or_else(|| "filter field is empty".to_string())?;
    let op = match parts.next() {
        Some(op) => op
            .parse::<Operator>()
            .map_err(|_| format!("unknown operator {op:?} in filter {predicate:?}"))?,
        None => Operator::Eq,
    };
    if parts.next().is_some() {
        return Err(format!("malformed filter {predicate:?}"));
    }
    Ok((field.to_string(), op))
}

/// A canned result for the next `get_all` of a query.
///
/// Holds at most one pending result. `get_all` consumes it, after which
/// queries using this handle run against the store again.
pub struct MockQueryResult<M> {
    pending: Mutex<Option<PendingResult<M>>>,
}

struct PendingResult<M> {
    data: Vec<M>,
    error: Option<CoreError>,
    keys: Vec<Key>,
}

impl<M> MockQueryResult<M> {
    /// Creates a handle with nothing pending.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Sets the result for the next `get_all`, replacing any pending one.
    pub fn set(&self, data: Vec<M>, error: Option<CoreError>, keys: Vec<Key>) {
        *self.pending.lock() = Some(PendingResult { data, error, keys });
    }

    /// Returns true if a result is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Drops any pending result.
    pub fn clear(&self) {
        self.pending.lock().take();
    }

    fn take(&self) -> Option<PendingResult<M>> {
        self.pending.lock().take()
    }
}

impl<M> Default for MockQueryResult<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for MockQueryResult<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockQueryResult")
            .field("pending", &self.is_pending())
            .finish()
    }
}
