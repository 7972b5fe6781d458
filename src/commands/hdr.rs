//! `HDR`/`XHDR`: one header value per selected article (§4.4).
//!
//! Both commands share the same selection and sanitization logic; they
//! differ only in their success code, kept separate because `XHDR` is the
//! historic (RFC 2980) name real clients still send alongside the current
//! `HDR` (RFC 3977 §8.5).

use crate::error::{NntpError, Result};
use crate::header::Headers;
use crate::response::Reply;
use crate::session::Session;

use super::{sanitize_field, select};

async fn run(session: &Session, arg: &str, success_code: u16, label: &str) -> Result<Reply> {
    let mut parts = arg.splitn(2, char::is_whitespace);
    let header_name = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NntpError::Syntax(format!("{label} requires a header name")))?;
    let rest = parts.next().unwrap_or("").trim();

    let selected = select::resolve(session, rest).await?;
    let mut lines = Vec::with_capacity(selected.len());
    for item in selected {
        let headers = Headers::parse(&item.row.article.raw_headers).unwrap_or_default();
        let value = headers.get(header_name).unwrap_or("");
        lines.push(format!("{} {}", item.number, sanitize_field(value)));
    }
    Ok(Reply::multiline(success_code, format!("{label} follow"), lines))
}

/// `HDR <header> <range-or-id>` (RFC 3977 §8.5): `225` on success.
pub async fn hdr(session: &mut Session, arg: &str) -> Result<Reply> {
    run(session, arg, 225, "Headers").await
}

/// `XHDR <header> <range-or-id>` (RFC 2980 §2.6): `221` on success, the
/// code legacy clients expect from the historic name.
pub async fn xhdr(session: &mut Session, arg: &str) -> Result<Reply> {
    run(session, arg, 221, "Header").await
}
