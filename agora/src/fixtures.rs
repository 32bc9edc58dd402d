//! JSON fixtures: a map from collection path to the documents it holds.
//!
//! ```json
//! {
//!   "users": [{ "id": "u1", "userName": "ada", "createdAt": "2024-01-01T00:00:00Z" }],
//!   "users/u1/about": [{ "type": "skill", "value": "rust" }]
//! }
//! ```

use std::{collections::BTreeMap, path::Path};

use log::info;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    errors::StoreError,
    store::{Document, DocumentStore},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Fixture(BTreeMap<String, Vec<Document>>);

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path).map_err(|err| StoreError::Other {
            message: format!("failed to read fixture {}: {err}", path.display()).into(),
        })?;
        Self::from_json(&json)
    }

    pub fn document_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Writes every document. Documents carrying a string `id` keep it;
    /// the rest get a generated one.
    pub async fn load<S: DocumentStore>(&self, store: &S) -> Result<usize, StoreError> {
        let mut written = 0;
        for (collection, docs) in &self.0 {
            for doc in docs {
                match doc.get("id").and_then(Value::as_str) {
                    Some(id) => store.set(collection, id, doc.clone()).await?,
                    None => {
                        store.add(collection, doc.clone()).await?;
                    }
                }
                written += 1;
            }
            info!("seeded {} documents into {collection}", docs.len());
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn load_keeps_explicit_ids_and_generates_missing_ones() {
        let fixture = Fixture::from_json(
            r#"{"colors": [{"id": "red", "name": "Red"}, {"name": "Blue"}], "sizes": []}"#,
        )
        .unwrap();
        assert_eq!(fixture.document_count(), 2);

        let store = MemoryStore::new();
        assert_eq!(fixture.load(&store).await.unwrap(), 2);
        assert_eq!(store.len("colors"), 2);
        assert!(store.get("colors", "red").await.unwrap().is_some());
    }
}
