//! PostPipeline: the `POST` body accumulator plus the post-acceptance
//! pipeline and control-message dispatch (§4.5, §4.6).

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::article::{Article, Codec, ControlMessage};
use crate::auth::{Capability, Principal};
use crate::error::{NntpError, Result};
use crate::header::Headers;
use crate::response::Reply;
use crate::store::{Catalog, CatalogStore};

/// Accumulates lines sent after `POST`'s `340` until the terminating `.`
/// (§4.3). Dot-unstuffing happens here, one line at a time, so the codec
/// that runs afterward only ever sees an already-unstuffed message.
#[derive(Debug, Default)]
pub struct PostPipeline {
    buffer: String,
}

impl PostPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one CRLF-stripped input line. Returns the accumulated raw
    /// message once the lone-`.` terminator line is seen.
    pub fn feed_line(&mut self, line: &str) -> Option<String> {
        if line == "." {
            return Some(std::mem::take(&mut self.buffer));
        }
        if let Some(rest) = line.strip_prefix('.') {
            self.buffer.push('.');
            self.buffer.push_str(rest);
        } else {
            self.buffer.push_str(line);
        }
        self.buffer.push_str("\r\n");
        None
    }
}

/// Run the full post-acceptance pipeline on a just-terminated raw message
/// (§4.5): decode, identity-driven header mutation, control-message
/// gating, the moderation/approval shortcut, then per-group insertion.
pub async fn accept_post(
    raw: &str,
    principal: &Principal,
    store: &Arc<dyn CatalogStore>,
    hostname: &str,
) -> Result<Reply> {
    let posted = Codec::decode(raw)?;
    let mut article = posted.article;

    apply_identity_mutations(&mut article, principal);

    if let Some(control_str) = article.headers.control.clone() {
        if let Some(ctrl) = ControlMessage::parse(&control_str) {
            let verb = ctrl.required_capability();
            if verb != "none" && (principal.is_anonymous() || !principal.capability_for_verb(verb))
            {
                return Err(NntpError::NotRegistered(format!(
                    "insufficient capability for control verb {verb}"
                )));
            }
        }
    }

    if try_moderate(&article, principal, store, hostname).await? {
        info!(message_id = %article.headers.message_id, "approval message processed, not stored");
        return Ok(Reply::single(240, "Article received OK"));
    }

    let article = Arc::new(article);
    insert_into_targets(&article, principal, store).await?;

    if article.is_control_message() {
        if let Some(ctrl) = ControlMessage::parse(article.headers.control.as_deref().unwrap_or(""))
        {
            execute_control(&ctrl, &article, principal, store, hostname).await;
        }
    }

    Ok(Reply::single(240, "Article received OK"))
}

/// Steps 1-3 of §4.5: strip or rewrite headers the identity isn't allowed
/// to set, keeping `raw_headers` in sync with the structured fields.
fn apply_identity_mutations(article: &mut Article, principal: &Principal) {
    let mut headers = Headers::parse(&article.raw_headers)
        .expect("raw_headers was already produced by a successful Codec::decode");

    if principal.is_anonymous() {
        headers.remove("Approved");
        article.headers.approved = None;
    }

    if !principal.has(Capability::CanCancel) {
        headers.remove("Supersedes");
        article.headers.supersedes = None;
    }

    if !principal.has(Capability::CanInject) {
        let injection_date = Utc::now().format("%d %b %Y %H:%M:%S +0000").to_string();
        headers.set("Injection-Date", &injection_date);
        article.headers.injection_date = Some(injection_date);

        headers.remove("Injection-Info");
        article.headers.injection_info = None;

        headers.remove("Xref");
        article.headers.xref = None;

        let newsgroups_joined = article.headers.newsgroups.join(" ");
        if article.headers.followup_to.as_deref() == Some(newsgroups_joined.as_str()) {
            headers.remove("Followup-To");
            article.headers.followup_to = None;
        }
    }

    article.raw_headers = headers.raw_block();
}

/// Step 5 of §4.5: an `APPROVE`/`APPROVED` body referencing an existing
/// pending article, posted by an approver, marks that article approved
/// instead of being stored itself. Returns whether any referenced article
/// was approved.
async fn try_moderate(
    article: &Article,
    principal: &Principal,
    store: &Arc<dyn CatalogStore>,
    hostname: &str,
) -> Result<bool> {
    if !(article.body.starts_with("APPROVE\r\n") || article.body.starts_with("APPROVED\r\n")) {
        return Ok(false);
    }
    let refs = article.references();
    if refs.is_empty() {
        return Ok(false);
    }

    let mut approved_any = false;
    for group in article.newsgroup_names() {
        if !principal.can_approve(group) {
            continue;
        }
        for message_id in &refs {
            if let Ok(row) = store.get_article_by_id(message_id, principal).await {
                if &row.catalog == group {
                    let approved_by = principal.approval_identity(hostname);
                    if store
                        .mark_approved(group, message_id, &approved_by)
                        .await
                        .is_ok()
                    {
                        approved_any = true;
                    }
                }
            }
        }
    }
    Ok(approved_any)
}

/// Step 6 of §4.5: allocate a number and insert a row in every target
/// catalog that exists and allows local posting, silently skipping (and
/// logging) the rest.
async fn insert_into_targets(
    article: &Arc<Article>,
    principal: &Principal,
    store: &Arc<dyn CatalogStore>,
) -> Result<()> {
    let mut pending_targets = Vec::new();
    let mut open_targets = Vec::new();

    for group in article.newsgroup_names() {
        match store.lookup_catalog(group, principal).await {
            Ok(catalog) if catalog.deny_local_posting => {
                debug!(%group, "posting skipped: local posting denied");
            }
            Ok(catalog) if catalog.moderated && !principal.can_approve(group) => {
                pending_targets.push(group.clone());
            }
            Ok(_) => open_targets.push(group.clone()),
            Err(_) => {
                debug!(%group, "posting skipped: unknown newsgroup");
            }
        }
    }

    if !open_targets.is_empty() {
        store
            .insert_article(Arc::clone(article), &open_targets, false)
            .await
            .map_err(|e| NntpError::PostingFailed(e.to_string()))?;
    }
    if !pending_targets.is_empty() {
        store
            .insert_article(Arc::clone(article), &pending_targets, true)
            .await
            .map_err(|e| NntpError::PostingFailed(e.to_string()))?;
    }
    Ok(())
}

/// Execute the side effect of a control message, once permission has
/// already been gated (§4.6). Each verb's catalog-set mutation is
/// delegated to the store; this function only decides which store call a
/// verb maps to.
async fn execute_control(
    ctrl: &ControlMessage,
    article: &Article,
    principal: &Principal,
    store: &Arc<dyn CatalogStore>,
    hostname: &str,
) {
    match ctrl {
        ControlMessage::Cancel { message_id } => {
            if principal.has(Capability::CanCancel) {
                let _ = store.mark_cancelled(message_id).await;
                let _ = store.mark_cancelled(&article.headers.message_id).await;
            }
        }
        ControlMessage::Newgroup { group, moderated } => {
            if principal.has(Capability::CanCreateCatalogs) && group.contains('.') {
                let catalog = Catalog {
                    name: group.clone(),
                    description: String::new(),
                    moderated: *moderated,
                    deny_local_posting: false,
                    deny_peer_posting: false,
                    create_date: Utc::now(),
                    creator_entity: principal.approval_identity(hostname),
                    low_watermark: 1,
                    high_watermark: 0,
                    message_count: 0,
                };
                if let Err(e) = store.create_catalog(catalog).await {
                    warn!(%group, error = %e, "newgroup control message could not create catalog");
                }
            }
        }
        ControlMessage::Rmgroup { group } => {
            if principal.has(Capability::CanDeleteCatalogs) {
                if let Err(e) = store.remove_catalog(group).await {
                    warn!(%group, error = %e, "rmgroup control message could not remove catalog");
                }
            }
        }
        ControlMessage::Checkgroups { .. } => {
            // Whole-hierarchy synchronization against a checkgroups feed
            // is an external administrative concern (spec.md §1); gating
            // permission above is all the core does for this verb.
        }
        ControlMessage::Unknown { verb } => {
            debug!(%verb, "ignoring unmodeled control verb");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_line_accumulates_until_terminator() {
        let mut p = PostPipeline::new();
        assert_eq!(p.feed_line("From: a@b.invalid"), None);
        assert_eq!(p.feed_line("Newsgroups: misc.test"), None);
        assert_eq!(p.feed_line(""), None);
        assert_eq!(p.feed_line("body text"), None);
        let raw = p.feed_line(".").unwrap();
        assert_eq!(
            raw,
            "From: a@b.invalid\r\nNewsgroups: misc.test\r\n\r\nbody text\r\n"
        );
    }

    #[test]
    fn feed_line_unstuffs_leading_dot() {
        let mut p = PostPipeline::new();
        p.feed_line("..leading dot in body");
        let raw = p.feed_line(".").unwrap();
        assert_eq!(raw, ".leading dot in body\r\n");
    }

    #[tokio::test]
    async fn accepts_minimal_post_and_allocates_number() {
        use crate::store::memory::MemoryStore;

        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        store
            .create_catalog(Catalog {
                name: "misc.test".to_string(),
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

        let raw = "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nMessage-ID: <t1@x>\r\n\r\nbody\r\n";
        let principal = Principal::anonymous();
        let reply = accept_post(raw, &principal, &store, "news.example.invalid")
            .await
            .unwrap();
        assert_eq!(reply.code, 240);

        let row = store
            .get_article_by_id("<t1@x>", &principal)
            .await
            .unwrap();
        assert_eq!(row.number, 1);
        assert_eq!(row.catalog, "misc.test");
    }

    #[tokio::test]
    async fn anonymous_approved_header_is_stripped() {
        use crate::store::memory::MemoryStore;

        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        store
            .create_catalog(Catalog {
                name: "misc.test".to_string(),
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

        let raw = "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nApproved: mod@x\r\nMessage-ID: <t2@x>\r\n\r\nbody\r\n";
        let principal = Principal::anonymous();
        accept_post(raw, &principal, &store, "news.example.invalid")
            .await
            .unwrap();

        let row = store
            .get_article_by_id("<t2@x>", &principal)
            .await
            .unwrap();
        assert!(row.article.headers.approved.is_none());
        assert!(!row.article.raw_headers.contains("Approved"));
    }

    #[tokio::test]
    async fn moderated_group_marks_pending_unless_approver() {
        use crate::store::memory::MemoryStore;

        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        store
            .create_catalog(Catalog {
                name: "misc.mod".to_string(),
                description: String::new(),
                moderated: true,
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

        let raw = "From: a@b.invalid\r\nNewsgroups: misc.mod\r\nSubject: hi\r\nMessage-ID: <t3@x>\r\n\r\nbody\r\n";
        let principal = Principal::anonymous();
        accept_post(raw, &principal, &store, "news.example.invalid")
            .await
            .unwrap();

        let row = store
            .get_article_by_id("<t3@x>", &principal)
            .await
            .unwrap();
        assert!(row.pending);
    }

    #[tokio::test]
    async fn cross_post_allocates_independent_numbers() {
        use crate::store::memory::MemoryStore;

        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        for name in ["a.b", "c.d"] {
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

        let raw = "From: a@b.invalid\r\nNewsgroups: a.b c.d\r\nSubject: hi\r\nMessage-ID: <t4@x>\r\n\r\nbody\r\n";
        let principal = Principal::anonymous();
        accept_post(raw, &principal, &store, "news.example.invalid")
            .await
            .unwrap();

        let row = store
            .get_article_by_id("<t4@x>", &principal)
            .await
            .unwrap();
        assert_eq!(row.number, 1);
    }
}
