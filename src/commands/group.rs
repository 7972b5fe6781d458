//! `GROUP` and `LISTGROUP` (§4.4).

use crate::error::{NntpError, Result};
use crate::range::ArticleRange;
use crate::response::Reply;
use crate::session::Session;
use crate::store::RowFlags;

/// `GROUP <name>`: select a catalog, moving the session's current number
/// to its low watermark.
pub async fn group(session: &mut Session, arg: &str) -> Result<Reply> {
    let name = arg.trim();
    if name.is_empty() {
        return Err(NntpError::Syntax("GROUP requires a newsgroup name".to_string()));
    }
    let catalog = session
        .store
        .lookup_catalog(name, &session.principal)
        .await
        .map_err(|_| NntpError::NoSuchCatalog(name.to_string()))?;

    session.current_catalog = Some(catalog.name.clone());
    session.current_number = if catalog.message_count == 0 {
        None
    } else {
        Some(catalog.low_watermark)
    };

    Ok(Reply::single(
        211,
        format!(
            "{} {} {} {}",
            catalog.message_count, catalog.low_watermark, catalog.high_watermark, catalog.name
        ),
    ))
}

/// `LISTGROUP [group [range]]`: like `GROUP`, plus a multiline body
/// listing every selected (non-cancelled, non-pending) article number.
pub async fn listgroup(session: &mut Session, arg: &str) -> Result<Reply> {
    let mut parts = arg.split_whitespace();
    let name_arg = parts.next();
    let range_arg = parts.next();

    let name = match name_arg {
        Some(n) => n.to_string(),
        None => session
            .current_catalog
            .clone()
            .ok_or(NntpError::NoNewsgroup)?,
    };

    let catalog = session
        .store
        .lookup_catalog(&name, &session.principal)
        .await
        .map_err(|_| NntpError::NoSuchCatalog(name.clone()))?;

    session.current_catalog = Some(catalog.name.clone());
    session.current_number = if catalog.message_count == 0 {
        None
    } else {
        Some(catalog.low_watermark)
    };

    let (low, high) = match range_arg {
        Some(token) => {
            let parsed = ArticleRange::parse(token)
                .ok_or_else(|| NntpError::Syntax(format!("malformed range: {token}")))?;
            parsed.resolve(catalog.high_watermark)
        }
        None => (catalog.low_watermark, catalog.high_watermark),
    };

    let rows = session
        .store
        .range_articles(&catalog.name, low, high, RowFlags::default())
        .await
        .map_err(|e| NntpError::StoreUnavailable(e.to_string()))?;

    let lines = rows.iter().map(|r| r.number.to_string()).collect();

    Ok(Reply::multiline(
        211,
        format!(
            "{} {} {} {}",
            catalog.message_count, catalog.low_watermark, catalog.high_watermark, catalog.name
        ),
        lines,
    ))
}
