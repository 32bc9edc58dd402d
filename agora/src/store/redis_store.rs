use std::sync::LazyLock;

use redis::{Script, aio::ConnectionManager, cmd};
use serde_json::Value;

use super::{DEFAULT_MAX_IN_VALUES, Document, DocumentStore, Predicate, Query, Transition, TransitionOutcome};
use crate::{errors::StoreError, id::generate_document_id, keys::KeyContext};

pub const DOCUMENT_UPDATE_SCRIPT_BODY: &str = include_str!("../../lua/document_update.lua");
pub const DOCUMENT_INCREMENT_SCRIPT_BODY: &str = include_str!("../../lua/document_increment.lua");
pub const DOCUMENT_TRANSITION_SCRIPT_BODY: &str = include_str!("../../lua/document_transition.lua");

static DOCUMENT_UPDATE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_UPDATE_SCRIPT_BODY));
static DOCUMENT_INCREMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_INCREMENT_SCRIPT_BODY));
static DOCUMENT_TRANSITION_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_TRANSITION_SCRIPT_BODY));

const SCAN_COUNT: usize = 1000;
const MGET_BATCH: usize = 256;

/// RedisJSON-backed document store.
///
/// Each document lives at `{prefix}:{collection}:{id}`. Queries scan the
/// collection's keyspace and evaluate predicates client-side, except for
/// predicates on `id`, which become direct key reads.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    max_in_values: usize,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            max_in_values: DEFAULT_MAX_IN_VALUES,
        }
    }

    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn, prefix))
    }

    pub fn with_max_in_values(mut self, max_in_values: usize) -> Self {
        self.max_in_values = max_in_values;
        self
    }

    /// Deletes every document under this store's prefix.
    pub async fn reset(&self) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        cleanup_prefix(&mut conn, &self.prefix).await
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix)
    }

    async fn scan_collection(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let pattern = self.keys().collection_pattern(collection);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            // The pattern also matches keys of nested collections sharing the prefix.
            keys.extend(
                batch
                    .into_iter()
                    .filter(|key| self.keys().document_id(collection, key).is_some()),
            );
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }

    async fn fetch_keys(&self, keys: &[String]) -> Result<Vec<Document>, StoreError> {
        let mut conn = self.conn.clone();
        let mut docs = Vec::with_capacity(keys.len());
        for batch in keys.chunks(MGET_BATCH) {
            let raw: Vec<Option<String>> = cmd("JSON.MGET").arg(batch).arg(".").query_async(&mut conn).await?;
            for json in raw.into_iter().flatten() {
                docs.push(parse_document(&json)?);
            }
        }
        Ok(docs)
    }

    /// Keys addressed directly by an `id` predicate, if the query carries one.
    fn id_keys(&self, query: &Query) -> Option<Vec<String>> {
        query.predicates.iter().find_map(|predicate| match predicate {
            Predicate::Eq { field, value } if field == "id" => Some(
                value
                    .as_str()
                    .map(|id| vec![self.keys().document(&query.collection, id)])
                    .unwrap_or_default(),
            ),
            Predicate::In { field, values } if field == "id" => Some(
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|id| self.keys().document(&query.collection, id))
                    .collect(),
            ),
            _ => None,
        })
    }
}

fn parse_document(json: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Other {
            message: format!("stored value is not a document: {other}").into(),
        }),
    }
}

fn script_response(raw: &str) -> Result<Value, StoreError> {
    let value: Value = serde_json::from_str(raw)?;
    if let Some(code) = value.get("error").and_then(Value::as_str) {
        return Err(StoreError::Other {
            message: code.to_string().into(),
        });
    }
    Ok(value)
}

impl DocumentStore for RedisStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        query.check_in_ceiling(self.max_in_values)?;
        let mut keys = match self.id_keys(query) {
            Some(keys) => keys,
            None => self.scan_collection(&query.collection).await?,
        };
        // SCAN order is arbitrary; id order keeps unordered queries stable.
        keys.sort();
        let docs = self.fetch_keys(&keys).await?;
        Ok(query.apply(docs))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let mut conn = self.conn.clone();
        let key = self.keys().document(collection, id);
        let result: Option<String> = cmd("JSON.GET").arg(&key).query_async(&mut conn).await?;
        result.as_deref().map(parse_document).transpose()
    }

    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let id = generate_document_id();
        self.set(collection, &id, fields).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, mut fields: Document) -> Result<(), StoreError> {
        fields.insert("id".to_string(), Value::String(id.to_string()));
        let mut conn = self.conn.clone();
        let key = self.keys().document(collection, id);
        let payload = serde_json::to_string(&fields)?;
        let _: () = cmd("JSON.SET").arg(&key).arg("$").arg(payload).query_async(&mut conn).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = self.keys().document(collection, id);
        let payload = serde_json::to_string(&patch)?;
        let raw: String = DOCUMENT_UPDATE_SCRIPT
            .key(&key)
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;
        match script_response(&raw) {
            Err(StoreError::Other { message }) if message == "document_not_found" => Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
            other => other.map(|_| ()),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = self.keys().document(collection, id);
        let _: u64 = cmd("DEL").arg(&key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
        mut seed: Document,
    ) -> Result<i64, StoreError> {
        seed.insert("id".to_string(), Value::String(id.to_string()));
        let mut conn = self.conn.clone();
        let key = self.keys().document(collection, id);
        let raw: String = DOCUMENT_INCREMENT_SCRIPT
            .key(&key)
            .arg(field)
            .arg(delta)
            .arg(serde_json::to_string(&seed)?)
            .invoke_async(&mut conn)
            .await?;
        let value = script_response(&raw)?;
        value
            .get("value")
            .and_then(Value::as_f64)
            .map(|value| value as i64)
            .ok_or_else(|| StoreError::Other {
                message: format!("unexpected increment response: {raw}").into(),
            })
    }

    async fn transition(&self, transition: &Transition) -> Result<TransitionOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let keys = self.keys();
        let mut invocation = DOCUMENT_TRANSITION_SCRIPT.prepare_invoke();
        invocation
            .key(keys.document(&transition.collection, &transition.id))
            .arg(&transition.field)
            .arg(serde_json::to_string(&transition.patch)?)
            .arg(if transition.create { "1" } else { "0" })
            .arg(&transition.id);
        if let Some(counter) = &transition.counter {
            let mut seed = counter.seed.clone();
            seed.insert("id".to_string(), Value::String(counter.id.clone()));
            invocation
                .key(keys.document(&counter.collection, &counter.id))
                .arg(&counter.field)
                .arg(counter.delta)
                .arg(serde_json::to_string(&seed)?);
        }
        let raw: String = invocation.invoke_async(&mut conn).await?;
        let reply = script_response(&raw)?;
        match reply.get("outcome").and_then(Value::as_str) {
            Some("applied") => Ok(TransitionOutcome::Applied {
                counter: reply.get("counter").and_then(Value::as_f64).map(|value| value as i64),
            }),
            Some("unchanged") => Ok(TransitionOutcome::Unchanged),
            Some("missing") => Ok(TransitionOutcome::Missing),
            _ => Err(StoreError::Other {
                message: format!("unexpected transition response: {raw}").into(),
            }),
        }
    }

    fn max_in_values(&self) -> usize {
        self.max_in_values
    }
}

/// Delete every document under a key prefix (test and seed cleanup).
///
/// This performs a SCAN + DEL operation to safely delete keys without blocking Redis.
pub async fn cleanup_prefix(conn: &mut ConnectionManager, prefix: &str) -> Result<u64, StoreError> {
    let pattern = format!("{prefix}:*");
    let mut cursor: u64 = 0;
    let mut total_deleted: u64 = 0;

    loop {
        let (next_cursor, keys): (u64, Vec<String>) = cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(&pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(conn)
            .await?;

        if !keys.is_empty() {
            let deleted: u64 = cmd("DEL").arg(&keys).query_async(conn).await?;
            total_deleted += deleted;
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }

    Ok(total_deleted)
}
