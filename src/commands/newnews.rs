//! `NEWNEWS` (§4.4): message-ids of articles accepted at or after a given
//! instant, in newsgroups matching a wildmat.

use crate::error::{NntpError, Result};
use crate::response::Reply;
use crate::session::Session;

use super::parse_since;

/// `NEWNEWS wildmat YYMMDD|YYYYMMDD HHMMSS [GMT]`.
pub async fn newnews(session: &mut Session, arg: &str) -> Result<Reply> {
    let mut tokens = arg.split_whitespace();
    let wildmat = tokens
        .next()
        .ok_or_else(|| NntpError::Syntax("NEWNEWS requires a wildmat".to_string()))?;
    let date = tokens
        .next()
        .ok_or_else(|| NntpError::Syntax("NEWNEWS requires a date".to_string()))?;
    let time = tokens
        .next()
        .ok_or_else(|| NntpError::Syntax("NEWNEWS requires a time".to_string()))?;
    let since = parse_since(date, time)?;

    let rows = session
        .store
        .articles_since(since, Some(wildmat))
        .await
        .map_err(|e| NntpError::StoreUnavailable(e.to_string()))?;

    let mut ids: Vec<String> = rows
        .into_iter()
        .map(|r| r.article.headers.message_id.clone())
        .collect();
    ids.dedup();
    Ok(Reply::multiline(230, "List of new articles follows", ids))
}
