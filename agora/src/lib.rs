//! Agora core library.
//!
//! Read-side aggregation services for a social marketplace whose data lives
//! in a schemaless document store: external profiles, relationship lists,
//! image roles and the product catalog, plus the write workflows that keep
//! those collections consistent.

use std::{future::Future, time::Duration};

pub mod accounts;
pub mod communities;
pub mod config;
pub mod errors;
pub mod fixtures;
pub mod id;
pub mod images;
pub mod keys;
pub mod market;
pub mod models;
pub mod profile;
pub mod relationships;
pub mod store;

pub use communities::CommunityService;
pub use config::{AggregationSettings, Backend, Settings};
pub use errors::*;
pub use images::{ImageRoleResolver, RoleImages};
pub use market::{CatalogSnapshot, FilteredCatalogSnapshot, MarketAggregationService, ProductFilters};
pub use profile::{ProfileAggregationService, ProfileView};
pub use relationships::{FriendWithDetails, RelatedUser, RelationshipAggregator};
pub use store::{DocumentStore, DocumentStoreExt, MemoryStore, Query, RedisStore, SortOrder};

pub use redis;

/// Runs `fut`, failing with [`AgoraError::Timeout`] once `timeout` elapses.
/// Without a timeout the future runs to completion.
pub(crate) async fn with_deadline<F, T>(timeout: Option<Duration>, fut: F) -> AgoraResult<T>
where
    F: Future<Output = AgoraResult<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| AgoraError::Timeout {
                millis: limit.as_millis() as u64,
            })?,
        None => fut.await,
    }
}
