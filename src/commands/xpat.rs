//! `XPAT` (RFC 2980 §2.9): header pattern search over a range.

use crate::error::{NntpError, Result};
use crate::header::Headers;
use crate::range::Wildmat;
use crate::response::Reply;
use crate::session::Session;

use super::{sanitize_field, select};

/// `XPAT <header> <range-or-id> <pattern> [<pattern>...]`: one line per
/// selected article whose header value matches any of the given wildmat
/// patterns.
pub async fn xpat(session: &mut Session, arg: &str) -> Result<Reply> {
    let mut tokens = arg.split_whitespace();
    let header_name = tokens
        .next()
        .ok_or_else(|| NntpError::Syntax("XPAT requires a header name".to_string()))?;
    let range_token = tokens
        .next()
        .ok_or_else(|| NntpError::Syntax("XPAT requires a range or message-id".to_string()))?;
    let patterns: Vec<Wildmat> = tokens.map(Wildmat::compile).collect();
    if patterns.is_empty() {
        return Err(NntpError::Syntax(
            "XPAT requires at least one pattern".to_string(),
        ));
    }

    let selected = select::resolve(session, range_token).await?;
    let mut lines = Vec::new();
    for item in selected {
        let headers = Headers::parse(&item.row.article.raw_headers).unwrap_or_default();
        let Some(value) = headers.get(header_name) else {
            continue;
        };
        if patterns.iter().any(|p| p.matches(value)) {
            lines.push(format!("{} {}", item.number, sanitize_field(value)));
        }
    }
    Ok(Reply::multiline(221, "Header follow", lines))
}
