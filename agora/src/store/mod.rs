//! Document-store seam consumed by every aggregator.
//!
//! The aggregation layer only needs a handful of primitives: equality and
//! `in` queries with an optional single-field sort, point reads, and a few
//! write shapes. Two backends implement them: [`MemoryStore`] for tests and
//! fixtures, and [`RedisStore`] for RedisJSON deployments.

mod memory;
mod redis_store;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::errors::StoreError;

pub use memory::MemoryStore;
pub use redis_store::{RedisStore, cleanup_prefix};

/// A stored document: a JSON object that always carries its `id`.
pub type Document = Map<String, Value>;

/// Default ceiling on the number of values in one `in` predicate.
pub const DEFAULT_MAX_IN_VALUES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

impl Predicate {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Predicate::Eq { field, value } => lookup(doc, field).is_some_and(|found| values_equal(found, value)),
            Predicate::In { field, values } => {
                lookup(doc, field).is_some_and(|found| values.iter().any(|candidate| values_equal(found, candidate)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

/// Query against one collection. Predicates are AND-combined.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            predicates: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.predicates.push(Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            order,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.predicates.iter().all(|predicate| predicate.matches(doc))
    }

    /// Largest `in` predicate carried by this query.
    pub fn in_values_len(&self) -> usize {
        self.predicates
            .iter()
            .map(|predicate| match predicate {
                Predicate::In { values, .. } => values.len(),
                Predicate::Eq { .. } => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// Rejects queries a backend with the given `in` ceiling would refuse.
    pub fn check_in_ceiling(&self, max_in_values: usize) -> Result<(), StoreError> {
        let len = self.in_values_len();
        if len > max_in_values {
            return Err(StoreError::InvalidRequest {
                message: format!(
                    "'in' predicate on {} carries {len} values (limit {max_in_values})",
                    self.collection
                ),
            });
        }
        Ok(())
    }

    /// Filters, sorts and truncates candidate documents.
    pub fn apply<I>(&self, candidates: I) -> Vec<Document>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut docs: Vec<Document> = candidates.into_iter().filter(|doc| self.matches(doc)).collect();
        self.sort(&mut docs);
        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }

    fn sort(&self, docs: &mut [Document]) {
        if let Some(order_by) = &self.order_by {
            // Stable: documents with equal keys keep their candidate order.
            docs.sort_by(|a, b| {
                let ordering = match (lookup(a, &order_by.field), lookup(b, &order_by.field)) {
                    (Some(left), Some(right)) => compare_values(left, right),
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match order_by.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }
    }
}

/// Resolves a (possibly dotted) field path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => {
            // Timestamps with differing sub-second precision do not sort lexicographically.
            match (a.parse::<DateTime<Utc>>(), b.parse::<DateTime<Utc>>()) {
                (Ok(a_time), Ok(b_time)) => a_time.cmp(&b_time),
                _ => a.cmp(b),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Counter adjustment applied in the same atomic step as a [`Transition`].
#[derive(Debug, Clone, PartialEq)]
pub struct CounterUpdate {
    pub collection: String,
    pub id: String,
    pub field: String,
    pub delta: i64,
    /// Document created when the counter does not exist yet.
    pub seed: Document,
}

/// Conditional write keyed on one field.
///
/// The patch is merged into the document only when the document's `field`
/// does not already hold `patch[field]`. When it is merged, the optional
/// counter moves in the same step, so the counter only ever tracks real
/// state changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub collection: String,
    pub id: String,
    pub field: String,
    pub patch: Document,
    /// Create the document from `patch` when it is missing.
    pub create: bool,
    pub counter: Option<CounterUpdate>,
}

impl Transition {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, field: impl Into<String>, patch: Document) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            field: field.into(),
            patch,
            create: false,
            counter: None,
        }
    }

    pub fn or_create(mut self) -> Self {
        self.create = true;
        self
    }

    pub fn with_counter(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        field: impl Into<String>,
        delta: i64,
        seed: Document,
    ) -> Self {
        self.counter = Some(CounterUpdate {
            collection: collection.into(),
            id: id.into(),
            field: field.into(),
            delta,
            seed,
        });
        self
    }

    /// Target value of the guarded field.
    pub fn target(&self) -> &Value {
        self.patch.get(&self.field).unwrap_or(&Value::Null)
    }

    /// Whether `current` already holds the target value.
    pub fn is_settled(&self, current: Option<&Document>) -> bool {
        current
            .and_then(|doc| doc.get(&self.field))
            .is_some_and(|value| values_equal(value, self.target()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The patch was written. Carries the new counter value when one was attached.
    Applied { counter: Option<i64> },
    /// The field already held the target value; nothing was written.
    Unchanged,
    /// The document does not exist and the transition may not create it.
    Missing,
}

/// Primitive read/write operations of a hosted document database.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Inserts a document under a generated id and returns that id.
    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError>;

    /// Writes the whole document under `id`, replacing any previous version.
    async fn set(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Shallow-merges `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Atomically adds `delta` to a numeric field, creating the document from
    /// `seed` when it does not exist yet. Returns the new value.
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
        seed: Document,
    ) -> Result<i64, StoreError>;

    /// Applies a [`Transition`] atomically: the guard check, the patch and the
    /// counter change happen as one step.
    async fn transition(&self, transition: &Transition) -> Result<TransitionOutcome, StoreError>;

    /// Ceiling on the number of values accepted by one `in` predicate.
    fn max_in_values(&self) -> usize;
}

/// Typed helpers layered over the raw primitives.
#[allow(async_fn_in_trait)]
pub trait DocumentStoreExt: DocumentStore {
    async fn query_as<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        self.query(query).await?.into_iter().map(from_document).collect()
    }

    async fn get_as<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>, StoreError> {
        self.get(collection, id).await?.map(from_document).transpose()
    }

    async fn set_as<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> Result<(), StoreError> {
        let mut doc = to_document(value)?;
        doc.insert("id".to_string(), Value::String(id.to_string()));
        self.set(collection, id, doc).await
    }

    async fn add_as<T: Serialize>(&self, collection: &str, value: &T) -> Result<String, StoreError> {
        let mut doc = to_document(value)?;
        doc.remove("id");
        self.add(collection, doc).await
    }

    /// Runs `base` with an added `field in values` predicate, split into
    /// chunks that respect [`DocumentStore::max_in_values`]. Chunks run
    /// concurrently; the merged result honours the base query's ordering.
    async fn query_in_chunks(&self, base: &Query, field: &str, values: &[String]) -> Result<Vec<Document>, StoreError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let chunk_size = self.max_in_values().max(1);
        let mut unique: Vec<&String> = Vec::with_capacity(values.len());
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        let queries: Vec<Query> = unique
            .chunks(chunk_size)
            .map(|chunk| {
                let mut query = base.clone();
                query.limit = None;
                query.is_in(field, chunk.iter().map(|value| Value::String((*value).clone())))
            })
            .collect();
        let batches = try_join_all(queries.iter().map(|query| self.query(query))).await?;
        let merged = Query {
            collection: base.collection.clone(),
            predicates: Vec::new(),
            order_by: base.order_by.clone(),
            limit: base.limit,
        };
        Ok(merged.apply(batches.into_iter().flatten()))
    }

    async fn query_in_chunks_as<T: DeserializeOwned>(
        &self,
        base: &Query,
        field: &str,
        values: &[String],
    ) -> Result<Vec<T>, StoreError> {
        self.query_in_chunks(base, field, values)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }
}

impl<S: DocumentStore> DocumentStoreExt for S {}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidRequest {
            message: format!("documents must be JSON objects, got {other}"),
        }),
    }
}

/// Builds a patch or seed document from a `json!` object literal.
pub fn patch(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn predicates_are_and_combined() {
        let query = Query::collection("friendships")
            .eq("userId1", "alice")
            .eq("friendshipStatus", "accepted");
        assert!(query.matches(&doc(json!({"userId1": "alice", "friendshipStatus": "accepted"}))));
        assert!(!query.matches(&doc(json!({"userId1": "alice", "friendshipStatus": "pending"}))));
        assert!(!query.matches(&doc(json!({"userId2": "alice", "friendshipStatus": "accepted"}))));
    }

    #[test]
    fn in_predicate_and_numeric_equality() {
        let query = Query::collection("variants").is_in("productId", ["p1", "p2"]).eq("price", 15);
        assert!(query.matches(&doc(json!({"productId": "p2", "price": 15.0}))));
        assert!(!query.matches(&doc(json!({"productId": "p3", "price": 15}))));
        assert_eq!(query.in_values_len(), 2);
        assert!(query.check_in_ceiling(1).is_err());
    }

    #[test]
    fn ordering_handles_timestamps_and_missing_fields() {
        let query = Query::collection("posts").order_by("createdAt", SortOrder::Desc);
        let docs = query.apply(vec![
            doc(json!({"id": "a", "createdAt": "2024-01-01T00:00:00Z"})),
            doc(json!({"id": "b"})),
            doc(json!({"id": "c", "createdAt": "2024-01-01T00:00:00.500Z"})),
        ]);
        let ids: Vec<&str> = docs.iter().filter_map(|d| d["id"].as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn transition_settles_on_matching_field() {
        let leave = Transition::new("memberships", "u1_cv1", "isMember", doc(json!({"isMember": false})));
        assert!(!leave.is_settled(None));
        assert!(!leave.is_settled(Some(&doc(json!({"isMember": true})))));
        assert!(leave.is_settled(Some(&doc(json!({"isMember": false})))));
        assert!(!leave.is_settled(Some(&doc(json!({"userId": "u1"})))));
    }

    #[test]
    fn dotted_paths_resolve_nested_fields() {
        let business = doc(json!({"profile": {"name": "Acme"}}));
        assert_eq!(lookup(&business, "profile.name"), Some(&json!("Acme")));
        assert_eq!(lookup(&business, "profile.location"), None);
    }
}
