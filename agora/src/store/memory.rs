use std::{
    borrow::Cow,
    collections::BTreeMap,
    sync::{
        RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

use serde_json::{Number, Value};

use super::{DEFAULT_MAX_IN_VALUES, Document, DocumentStore, Query, Transition, TransitionOutcome};
use crate::{errors::StoreError, id::generate_document_id};

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// In-process document store.
///
/// Unordered queries return documents in id order. Every write is applied
/// under one lock, so `set`, `increment` and `transition` are atomic.
#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    max_in_values: usize,
    reads: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_in_values(DEFAULT_MAX_IN_VALUES)
    }

    pub fn with_max_in_values(max_in_values: usize) -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            max_in_values,
            reads: AtomicUsize::new(0),
        }
    }

    /// Number of `query` and `get` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of documents currently stored in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.read_lock()
            .map(|collections| collections.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.collections.read().map_err(|_| poisoned())
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.collections.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Other {
        message: Cow::Borrowed("memory store lock poisoned"),
    }
}

impl DocumentStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        query.check_in_ceiling(self.max_in_values)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let collections = self.read_lock()?;
        let candidates = collections
            .get(&query.collection)
            .map(|docs| docs.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(query.apply(candidates))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let collections = self.read_lock()?;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let id = generate_document_id();
        self.set(collection, &id, fields).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, mut fields: Document) -> Result<(), StoreError> {
        fields.insert("id".to_string(), Value::String(id.to_string()));
        let mut collections = self.write_lock()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        let mut collections = self.write_lock()?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        for (key, value) in patch {
            if key != "id" {
                doc.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.write_lock()?;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
        seed: Document,
    ) -> Result<i64, StoreError> {
        let mut collections = self.write_lock()?;
        Ok(bump(&mut collections, collection, id, field, delta, seed))
    }

    async fn transition(&self, transition: &Transition) -> Result<TransitionOutcome, StoreError> {
        let mut collections = self.write_lock()?;
        let docs = collections.entry(transition.collection.clone()).or_default();
        if transition.is_settled(docs.get(&transition.id)) {
            return Ok(TransitionOutcome::Unchanged);
        }
        if let Some(doc) = docs.get_mut(&transition.id) {
            for (key, value) in &transition.patch {
                if key != "id" {
                    doc.insert(key.clone(), value.clone());
                }
            }
        } else if transition.create {
            let mut created = transition.patch.clone();
            created.insert("id".to_string(), Value::String(transition.id.clone()));
            docs.insert(transition.id.clone(), created);
        } else {
            return Ok(TransitionOutcome::Missing);
        }
        let counter = transition.counter.as_ref().map(|counter| {
            bump(
                &mut collections,
                &counter.collection,
                &counter.id,
                &counter.field,
                counter.delta,
                counter.seed.clone(),
            )
        });
        Ok(TransitionOutcome::Applied { counter })
    }

    fn max_in_values(&self) -> usize {
        self.max_in_values
    }
}

fn bump(collections: &mut Collections, collection: &str, id: &str, field: &str, delta: i64, seed: Document) -> i64 {
    let docs = collections.entry(collection.to_string()).or_default();
    let doc = docs.entry(id.to_string()).or_insert_with(|| {
        let mut seeded = seed;
        seeded.insert("id".to_string(), Value::String(id.to_string()));
        seeded
    });
    let next = doc.get(field).and_then(Value::as_i64).unwrap_or(0) + delta;
    doc.insert(field.to_string(), Value::Number(Number::from(next)));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStoreExt, SortOrder};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn set_replaces_and_update_merges() {
        let store = MemoryStore::new();
        store.set("users", "u1", doc(json!({"userName": "ada", "bio": "hi"}))).await.unwrap();
        store.set("users", "u1", doc(json!({"userName": "ada"}))).await.unwrap();
        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert!(stored.get("bio").is_none());
        assert_eq!(stored["id"], json!("u1"));

        store.update("users", "u1", doc(json!({"bio": "back"}))).await.unwrap();
        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(stored["bio"], json!("back"));
        assert_eq!(stored["userName"], json!("ada"));
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update("users", "ghost", Document::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn increment_seeds_then_adds() {
        let store = MemoryStore::new();
        let seed = doc(json!({"communityVariantId": "cv1", "likeCount": 0}));
        let first = store
            .increment("counters", "cv1", "membershipCount", 1, seed.clone())
            .await
            .unwrap();
        let second = store.increment("counters", "cv1", "membershipCount", 1, seed).await.unwrap();
        assert_eq!((first, second), (1, 2));
        assert_eq!(store.len("counters"), 1);
    }

    #[tokio::test]
    async fn transition_moves_counter_only_on_change() {
        let store = MemoryStore::new();
        let join = Transition::new("memberships", "u1_cv1", "isMember", doc(json!({"isMember": true})))
            .or_create()
            .with_counter("counters", "cv1", "membershipCount", 1, Document::new());
        assert_eq!(
            store.transition(&join).await.unwrap(),
            TransitionOutcome::Applied { counter: Some(1) }
        );
        assert_eq!(store.transition(&join).await.unwrap(), TransitionOutcome::Unchanged);

        let leave = Transition::new("memberships", "u1_cv1", "isMember", doc(json!({"isMember": false})))
            .with_counter("counters", "cv1", "membershipCount", -1, Document::new());
        assert_eq!(
            store.transition(&leave).await.unwrap(),
            TransitionOutcome::Applied { counter: Some(0) }
        );
        assert_eq!(store.transition(&leave).await.unwrap(), TransitionOutcome::Unchanged);

        let stranger = Transition::new("memberships", "u2_cv1", "isMember", doc(json!({"isMember": false})));
        assert_eq!(store.transition(&stranger).await.unwrap(), TransitionOutcome::Missing);
        assert_eq!(store.len("memberships"), 1);
    }

    #[tokio::test]
    async fn in_ceiling_is_enforced_and_chunking_respects_it() {
        let store = MemoryStore::with_max_in_values(2);
        for idx in 0..5 {
            store
                .set("products", &format!("p{idx}"), doc(json!({"rank": 5 - idx})))
                .await
                .unwrap();
        }
        let ids: Vec<String> = (0..5).map(|idx| format!("p{idx}")).collect();
        let direct = Query::collection("products").is_in("id", ids.iter().map(String::as_str));
        assert!(store.query(&direct).await.is_err());

        let base = Query::collection("products").order_by("rank", SortOrder::Asc);
        let docs = store.query_in_chunks(&base, "id", &ids).await.unwrap();
        let order: Vec<&str> = docs.iter().filter_map(|d| d["id"].as_str()).collect();
        assert_eq!(order, vec!["p4", "p3", "p2", "p1", "p0"]);
    }
}
