use std::path::{Path, PathBuf};

use agora::{
    Backend, DocumentStore, MemoryStore, Query, RedisStore, Settings,
    errors::StoreError,
    fixtures::Fixture,
    store::{Document, Transition, TransitionOutcome},
};
use anyhow::{Context, Result};

use crate::output::OutputManager;

/// Store selected by the `[store]` section of the configuration.
pub enum AppStore {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl DocumentStore for AppStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        match self {
            AppStore::Memory(store) => store.query(query).await,
            AppStore::Redis(store) => store.query(query).await,
        }
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        match self {
            AppStore::Memory(store) => store.get(collection, id).await,
            AppStore::Redis(store) => store.get(collection, id).await,
        }
    }

    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        match self {
            AppStore::Memory(store) => store.add(collection, fields).await,
            AppStore::Redis(store) => store.add(collection, fields).await,
        }
    }

    async fn set(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        match self {
            AppStore::Memory(store) => store.set(collection, id, fields).await,
            AppStore::Redis(store) => store.set(collection, id, fields).await,
        }
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        match self {
            AppStore::Memory(store) => store.update(collection, id, patch).await,
            AppStore::Redis(store) => store.update(collection, id, patch).await,
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        match self {
            AppStore::Memory(store) => store.delete(collection, id).await,
            AppStore::Redis(store) => store.delete(collection, id).await,
        }
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
        seed: Document,
    ) -> Result<i64, StoreError> {
        match self {
            AppStore::Memory(store) => store.increment(collection, id, field, delta, seed).await,
            AppStore::Redis(store) => store.increment(collection, id, field, delta, seed).await,
        }
    }

    async fn transition(&self, transition: &Transition) -> Result<TransitionOutcome, StoreError> {
        match self {
            AppStore::Memory(store) => store.transition(transition).await,
            AppStore::Redis(store) => store.transition(transition).await,
        }
    }

    fn max_in_values(&self) -> usize {
        match self {
            AppStore::Memory(store) => store.max_in_values(),
            AppStore::Redis(store) => store.max_in_values(),
        }
    }
}

/// Settings and store shared by every command.
pub struct AppContext {
    pub settings: Settings,
    pub store: AppStore,
}

impl AppContext {
    /// Loads settings, connects the configured backend and applies `fixture` if given.
    pub async fn build(config_path: &Path, fixture: Option<&PathBuf>, output: &OutputManager) -> Result<Self> {
        let settings = Settings::load(config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

        let store = match settings.store.backend {
            Backend::Memory => AppStore::Memory(MemoryStore::with_max_in_values(settings.store.max_in_values)),
            Backend::Redis => {
                output.progress("Connecting to Redis");
                let store = RedisStore::connect(&settings.store.redis_url, settings.store.key_prefix.as_str())
                    .await
                    .context("Failed to connect to Redis")?
                    .with_max_in_values(settings.store.max_in_values);
                output.clear_line();
                AppStore::Redis(store)
            }
        };

        let context = Self { settings, store };
        if let Some(path) = fixture {
            let fixture = Fixture::from_file(path)?;
            let written = fixture.load(&context.store).await?;
            log::debug!("preloaded {written} documents from {}", path.display());
        }
        Ok(context)
    }
}
