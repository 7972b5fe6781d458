//! Shared selection logic for commands that operate over a range or a
//! single message-id rather than exactly one current article: `HDR`/`XHDR`,
//! `OVER`/`XOVER`, `XPAT` (§4.4).

use crate::error::{NntpError, Result};
use crate::range::ArticleRange;
use crate::session::Session;
use crate::store::{ArticleInCatalog, RowFlags};

/// One selected row together with the number that should appear in its
/// reply line. `0` for a message-id selection outside the session's
/// current catalog, mirroring the `OVER`/`XOVER` `:bytes` convention
/// (§4.4: "When MSGID form, number is 0 unless article is in the current
/// catalog").
pub struct Selected {
    pub number: u64,
    pub row: ArticleInCatalog,
}

/// Resolve an optional range-or-message-id argument, returning every
/// matching row instead of exactly one. The empty-argument and bare-number
/// forms mirror `ARTICLE`/`HEAD`/`BODY`/`STAT`'s single-row resolution
/// (§4.4); the message-id form does not, since only `OVER`/`XOVER`'s
/// `:bytes` field carries the "0 unless current catalog" convention.
pub async fn resolve(session: &Session, arg: &str) -> Result<Vec<Selected>> {
    let arg = arg.trim();

    if arg.is_empty() {
        let catalog = session
            .current_catalog
            .clone()
            .ok_or(NntpError::NoNewsgroup)?;
        let number = session.current_number.ok_or(NntpError::NoArticleNumber)?;
        let row = session
            .store
            .get_article(&catalog, number, RowFlags::default())
            .await
            .map_err(|_| NntpError::NoArticleInRange)?;
        return Ok(vec![Selected { number, row }]);
    }

    if arg.starts_with('<') {
        let row = session
            .store
            .get_article_by_id(arg, &session.principal)
            .await
            .map_err(|_| NntpError::NoSuchMessageId(arg.to_string()))?;
        let number = if session.current_catalog.as_deref() == Some(row.catalog.as_str()) {
            row.number
        } else {
            0
        };
        return Ok(vec![Selected { number, row }]);
    }

    let catalog_name = session
        .current_catalog
        .clone()
        .ok_or(NntpError::NoNewsgroup)?;
    let catalog = session
        .store
        .lookup_catalog(&catalog_name, &session.principal)
        .await
        .map_err(|_| NntpError::NoSuchCatalog(catalog_name.clone()))?;
    let range = ArticleRange::parse(arg)
        .ok_or_else(|| NntpError::Syntax(format!("malformed range: {arg}")))?;
    let (low, high) = range.resolve(catalog.high_watermark);

    let rows = session
        .store
        .range_articles(&catalog_name, low, high, RowFlags::default())
        .await
        .map_err(|e| NntpError::StoreUnavailable(e.to_string()))?;
    Ok(rows
        .into_iter()
        .map(|row| Selected {
            number: row.number,
            row,
        })
        .collect())
}
