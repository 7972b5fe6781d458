//! An in-memory [`CatalogStore`] reference implementation: the shared state
//! every session's command processing goes through (§5). Intended for
//! tests and small deployments; a relational store is the production
//! persistence layer and is external to this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::article::Article;
use crate::auth::Principal;
use crate::catalog_view::{split_virtual_name, VirtualKind};
use crate::range::Wildmat;

use super::{ArticleInCatalog, Catalog, CatalogStore, RowFlags, StoreError, StoreResult};

struct CatalogEntry {
    meta: Catalog,
    next_number: AtomicU64,
    rows: Vec<ArticleInCatalog>,
}

/// The whole in-memory database: one [`CatalogEntry`] per real catalog
/// name, keyed without the `.deleted`/`.pending` virtual suffix.
#[derive(Default)]
struct Inner {
    catalogs: HashMap<String, CatalogEntry>,
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn visible_meta(meta: &Catalog, rows: &[ArticleInCatalog], kind: VirtualKind) -> Catalog {
        let filtered: Vec<&ArticleInCatalog> = rows
            .iter()
            .filter(|r| match kind {
                VirtualKind::Real => !r.cancelled && !r.pending,
                VirtualKind::Deleted => r.cancelled,
                VirtualKind::Pending => r.pending,
            })
            .collect();
        let (low, high) = watermarks(&filtered);
        Catalog {
            name: match kind {
                VirtualKind::Real => meta.name.clone(),
                VirtualKind::Deleted => format!("{}.deleted", meta.name),
                VirtualKind::Pending => format!("{}.pending", meta.name),
            },
            description: meta.description.clone(),
            moderated: meta.moderated,
            deny_local_posting: meta.deny_local_posting,
            deny_peer_posting: meta.deny_peer_posting,
            create_date: meta.create_date,
            creator_entity: meta.creator_entity.clone(),
            low_watermark: low,
            high_watermark: high,
            message_count: filtered.len() as u64,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn watermarks(rows: &[&ArticleInCatalog]) -> (u64, u64) {
    if rows.is_empty() {
        return (0, 0);
    }
    let low = rows.iter().map(|r| r.number).min().unwrap();
    let high = rows.iter().map(|r| r.number).max().unwrap();
    (low, high)
}

fn requires_cancel_or_approve(kind: VirtualKind, real_name: &str, principal: &Principal) -> bool {
    match kind {
        VirtualKind::Real => true,
        VirtualKind::Deleted => principal.has(crate::auth::Capability::CanCancel),
        VirtualKind::Pending => principal.can_approve(real_name),
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn lookup_catalog(&self, name: &str, principal: &Principal) -> StoreResult<Catalog> {
        let (real_name, kind) = split_virtual_name(name);
        let guard = self.inner.read().await;
        let entry = guard
            .catalogs
            .get(real_name)
            .ok_or_else(|| StoreError::NoSuchCatalog(name.to_string()))?;
        if !requires_cancel_or_approve(kind, real_name, principal) {
            return Err(StoreError::NoSuchCatalog(name.to_string()));
        }
        Ok(Self::visible_meta(&entry.meta, &entry.rows, kind))
    }

    async fn list_catalogs(
        &self,
        wildmat: Option<&str>,
        principal: &Principal,
    ) -> StoreResult<Vec<Catalog>> {
        let compiled = wildmat.map(Wildmat::compile);
        let guard = self.inner.read().await;
        let mut out: Vec<Catalog> = guard
            .catalogs
            .values()
            .filter(|entry| {
                compiled
                    .as_ref()
                    .is_none_or(|w| w.matches(&entry.meta.name))
            })
            .map(|entry| Self::visible_meta(&entry.meta, &entry.rows, VirtualKind::Real))
            .collect();
        let _ = principal;
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn get_article(
        &self,
        catalog: &str,
        number: u64,
        flags: RowFlags,
    ) -> StoreResult<ArticleInCatalog> {
        let (real_name, kind) = split_virtual_name(catalog);
        let guard = self.inner.read().await;
        let entry = guard
            .catalogs
            .get(real_name)
            .ok_or_else(|| StoreError::NoSuchCatalog(catalog.to_string()))?;
        entry
            .rows
            .iter()
            .find(|r| r.number == number && row_visible(r, kind, flags))
            .cloned()
            .ok_or(StoreError::NoSuchArticle)
    }

    async fn get_article_by_id(
        &self,
        message_id: &str,
        _principal: &Principal,
    ) -> StoreResult<ArticleInCatalog> {
        let guard = self.inner.read().await;
        for entry in guard.catalogs.values() {
            if let Some(row) = entry
                .rows
                .iter()
                .find(|r| r.article.headers.message_id == message_id)
            {
                return Ok(row.clone());
            }
        }
        Err(StoreError::NoSuchArticle)
    }

    async fn range_articles(
        &self,
        catalog: &str,
        low: u64,
        high: u64,
        flags: RowFlags,
    ) -> StoreResult<Vec<ArticleInCatalog>> {
        let (real_name, kind) = split_virtual_name(catalog);
        let guard = self.inner.read().await;
        let entry = guard
            .catalogs
            .get(real_name)
            .ok_or_else(|| StoreError::NoSuchCatalog(catalog.to_string()))?;
        let mut rows: Vec<ArticleInCatalog> = entry
            .rows
            .iter()
            .filter(|r| r.number >= low && r.number <= high && row_visible(r, kind, flags))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.number);
        Ok(rows)
    }

    async fn articles_since(
        &self,
        since: DateTime<Utc>,
        wildmat: Option<&str>,
    ) -> StoreResult<Vec<ArticleInCatalog>> {
        let compiled = wildmat.map(Wildmat::compile);
        let guard = self.inner.read().await;
        let mut out: Vec<ArticleInCatalog> = guard
            .catalogs
            .iter()
            .filter(|(name, _)| compiled.as_ref().is_none_or(|w| w.matches(name)))
            .flat_map(|(_, entry)| entry.rows.iter().cloned())
            .filter(|r| r.article.headers.date_parsed >= since && !r.cancelled)
            .collect();
        out.sort_by_key(|r| r.article.headers.date_parsed);
        Ok(out)
    }

    async fn insert_article(
        &self,
        article: Arc<Article>,
        target_catalogs: &[String],
        pending: bool,
    ) -> StoreResult<Vec<(String, u64)>> {
        let mut guard = self.inner.write().await;
        let mut allocated = Vec::with_capacity(target_catalogs.len());
        for name in target_catalogs {
            let Some(entry) = guard.catalogs.get_mut(name) else {
                continue;
            };
            let number = entry.next_number.fetch_add(1, Ordering::SeqCst);
            entry.rows.push(ArticleInCatalog {
                article: Arc::clone(&article),
                catalog: name.clone(),
                number,
                cancelled: false,
                pending,
            });
            allocated.push((name.clone(), number));
        }
        Ok(allocated)
    }

    async fn mark_cancelled(&self, message_id: &str) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let mut found = false;
        for entry in guard.catalogs.values_mut() {
            for row in entry.rows.iter_mut() {
                if row.article.headers.message_id == message_id {
                    row.cancelled = true;
                    found = true;
                }
            }
        }
        if found {
            Ok(())
        } else {
            Err(StoreError::NoSuchArticle)
        }
    }

    async fn mark_approved(
        &self,
        catalog: &str,
        message_id: &str,
        approved_by: &str,
    ) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let entry = guard
            .catalogs
            .get_mut(catalog)
            .ok_or_else(|| StoreError::NoSuchCatalog(catalog.to_string()))?;
        let row = entry
            .rows
            .iter_mut()
            .find(|r| r.article.headers.message_id == message_id)
            .ok_or(StoreError::NoSuchArticle)?;
        row.pending = false;
        let mut headers = row.article.headers.clone();
        headers.approved = Some(approved_by.to_string());
        let mut article = (*row.article).clone();
        article.headers = headers;
        row.article = Arc::new(article);
        Ok(())
    }

    async fn create_catalog(&self, catalog: Catalog) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        if guard.catalogs.contains_key(&catalog.name) {
            return Err(StoreError::CatalogExists(catalog.name));
        }
        guard.catalogs.insert(
            catalog.name.clone(),
            CatalogEntry {
                meta: catalog,
                next_number: AtomicU64::new(1),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn remove_catalog(&self, name: &str) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        guard
            .catalogs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NoSuchCatalog(name.to_string()))
    }
}

fn row_visible(row: &ArticleInCatalog, kind: VirtualKind, flags: RowFlags) -> bool {
    match kind {
        VirtualKind::Real => {
            (!row.cancelled || flags.include_cancelled) && (!row.pending || flags.include_pending)
        }
        VirtualKind::Deleted => row.cancelled,
        VirtualKind::Pending => row.pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::codec::Codec;

    fn sample_article() -> Arc<Article> {
        let raw = "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\n\r\nbody";
        Arc::new(Codec::decode(raw).unwrap().article)
    }

    async fn store_with_group(name: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_catalog(Catalog {
                name: name.to_string(),
                description: String::new(),
                moderated: false,
                deny_local_posting: false,
                deny_peer_posting: false,
                create_date: Utc::now(),
                creator_entity: "test".to_string(),
                low_watermark: 1,
                high_watermark: 0,
                message_count: 0,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn inserts_and_allocates_monotonic_numbers() {
        let store = store_with_group("misc.test").await;
        let principal = Principal::anonymous();
        let a1 = sample_article();
        let a2 = sample_article();
        let r1 = store
            .insert_article(a1, &["misc.test".to_string()], false)
            .await
            .unwrap();
        let r2 = store
            .insert_article(a2, &["misc.test".to_string()], false)
            .await
            .unwrap();
        assert_eq!(r1[0].1, 1);
        assert_eq!(r2[0].1, 2);

        let cat = store.lookup_catalog("misc.test", &principal).await.unwrap();
        assert_eq!(cat.high_watermark, 2);
        assert_eq!(cat.message_count, 2);
    }

    #[tokio::test]
    async fn cancel_never_reuses_number() {
        let store = store_with_group("misc.test").await;
        let a1 = sample_article();
        store
            .insert_article(a1.clone(), &["misc.test".to_string()], false)
            .await
            .unwrap();
        store.mark_cancelled(&a1.headers.message_id).await.unwrap();
        let a2 = sample_article();
        let r2 = store
            .insert_article(a2, &["misc.test".to_string()], false)
            .await
            .unwrap();
        assert_eq!(r2[0].1, 2);
    }

    #[tokio::test]
    async fn deleted_virtual_catalog_exposes_only_cancelled() {
        let store = store_with_group("misc.test").await;
        let principal = Principal::authenticated(
            "mod",
            None,
            [crate::auth::Capability::CanCancel],
            [],
        );
        let a1 = sample_article();
        store
            .insert_article(a1.clone(), &["misc.test".to_string()], false)
            .await
            .unwrap();
        store.mark_cancelled(&a1.headers.message_id).await.unwrap();

        let deleted = store
            .lookup_catalog("misc.test.deleted", &principal)
            .await
            .unwrap();
        assert_eq!(deleted.message_count, 1);
    }

    #[tokio::test]
    async fn get_article_by_id_finds_cross_posted_row() {
        let store = MemoryStore::new();
        for name in ["misc.a", "misc.b"] {
            store
                .create_catalog(Catalog {
                    name: name.to_string(),
                    description: String::new(),
                    moderated: false,
                    deny_local_posting: false,
                    deny_peer_posting: false,
                    create_date: Utc::now(),
                    creator_entity: "test".to_string(),
                    low_watermark: 1,
                    high_watermark: 0,
                    message_count: 0,
                })
                .await
                .unwrap();
        }
        let article = sample_article();
        store
            .insert_article(
                article.clone(),
                &["misc.a".to_string(), "misc.b".to_string()],
                false,
            )
            .await
            .unwrap();
        let principal = Principal::anonymous();
        let found = store
            .get_article_by_id(&article.headers.message_id, &principal)
            .await
            .unwrap();
        assert_eq!(found.article.headers.message_id, article.headers.message_id);
    }
}
