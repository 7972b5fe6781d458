//! CatalogStore: the persistence boundary (§6). The core ships only the
//! trait plus a single in-memory reference implementation ([`memory`]);
//! a relational implementation is an external collaborator.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::article::Article;
use crate::auth::Principal;

/// Failure surfaced by a [`CatalogStore`] implementation. The dispatcher
/// maps every variant to [`crate::error::NntpError::StoreUnavailable`];
/// the underlying cause is logged, never echoed to the client (§7).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("catalog not found: {0}")]
    NoSuchCatalog(String),
    #[error("article not found")]
    NoSuchArticle,
    #[error("catalog already exists: {0}")]
    CatalogExists(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Newsgroup metadata (§3). `message_count`/`low_watermark`/`high_watermark`
/// are derived counters a store computes rather than materializes.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub name: String,
    pub description: String,
    pub moderated: bool,
    pub deny_local_posting: bool,
    pub deny_peer_posting: bool,
    pub create_date: DateTime<Utc>,
    pub creator_entity: String,
    pub low_watermark: u64,
    pub high_watermark: u64,
    pub message_count: u64,
}

/// The `(Article, Catalog, Number)` association (§3). Numbers are
/// catalog-local, strictly monotonic, and never reused after cancel.
#[derive(Debug, Clone)]
pub struct ArticleInCatalog {
    pub article: Arc<Article>,
    pub catalog: String,
    pub number: u64,
    pub cancelled: bool,
    pub pending: bool,
}

/// Selection flags shared by range and lookup queries, controlling whether
/// cancelled/pending rows are included (used to address the `.deleted` and
/// `.pending` virtual catalogs over the same underlying rows).
#[derive(Debug, Clone, Copy, Default)]
pub struct RowFlags {
    pub include_cancelled: bool,
    pub include_pending: bool,
}

/// The store interface every persistence backend must provide (§6).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Resolve a catalog name, honoring the `.deleted`/`.pending` virtual
    /// suffix convention, and excluding catalogs the principal cannot see.
    async fn lookup_catalog(
        &self,
        name: &str,
        principal: &Principal,
    ) -> StoreResult<Catalog>;

    /// List catalogs matching an optional wildmat, ordered by name.
    async fn list_catalogs(
        &self,
        wildmat: Option<&str>,
        principal: &Principal,
    ) -> StoreResult<Vec<Catalog>>;

    /// Fetch one article by catalog-local number.
    async fn get_article(
        &self,
        catalog: &str,
        number: u64,
        flags: RowFlags,
    ) -> StoreResult<ArticleInCatalog>;

    /// Fetch one article by message identifier, across all catalogs visible
    /// to `principal`.
    async fn get_article_by_id(
        &self,
        message_id: &str,
        principal: &Principal,
    ) -> StoreResult<ArticleInCatalog>;

    /// Fetch every row in `[low, high]`, ascending by number.
    async fn range_articles(
        &self,
        catalog: &str,
        low: u64,
        high: u64,
        flags: RowFlags,
    ) -> StoreResult<Vec<ArticleInCatalog>>;

    /// Every article accepted at or after `since`, for NEWNEWS.
    async fn articles_since(
        &self,
        since: DateTime<Utc>,
        wildmat: Option<&str>,
    ) -> StoreResult<Vec<ArticleInCatalog>>;

    /// Insert a newly-accepted article into each of `target_catalogs`,
    /// allocating a fresh per-catalog number for every target atomically.
    /// Returns the allocated `(catalog, number)` pairs in the same order.
    async fn insert_article(
        &self,
        article: Arc<Article>,
        target_catalogs: &[String],
        pending: bool,
    ) -> StoreResult<Vec<(String, u64)>>;

    /// Mark every row carrying `message_id` (across all cross-posted
    /// catalogs) as cancelled.
    async fn mark_cancelled(&self, message_id: &str) -> StoreResult<()>;

    /// Mark the row for `message_id` within `catalog` approved, clearing
    /// its pending flag.
    async fn mark_approved(
        &self,
        catalog: &str,
        message_id: &str,
        approved_by: &str,
    ) -> StoreResult<()>;

    /// Create a catalog (`newgroup` control message, or administrative
    /// action). Newsgroup names created this way must contain at least one
    /// dot (§3).
    async fn create_catalog(&self, catalog: Catalog) -> StoreResult<()>;

    /// Remove a catalog outright (`rmgroup` control message).
    async fn remove_catalog(&self, name: &str) -> StoreResult<()>;
}
