//! ArticleCodec: decodes a raw posted message into a structured [`Article`]
//! (§4.2). Dot-stuff decoding happens before this codec runs; it only sees
//! a header block, blank-line separator, and body.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{NntpError, Result};
use crate::header::Headers;

use super::types::{Article, ArticleHeaders};

/// Stateless decoder for the raw-message -> [`Article`] transform.
pub struct Codec;

/// An article that has just been decoded, flagging whether its Message-ID
/// was generated here rather than carried by the client. The post pipeline
/// uses this to decide whether the identifier is safe to log as client-
/// supplied.
#[derive(Debug, Clone)]
pub struct PostedArticle {
    pub article: Article,
    pub message_id_generated: bool,
}

impl Codec {
    /// Decode a raw message: header block, blank line, body. Fails with
    /// [`NntpError::PostingFailed`] on the first validation failure, per the
    /// order fixed by §4.2.
    pub fn decode(raw: &str) -> Result<PostedArticle> {
        let (header_block, body) = split_header_block(raw);

        let mut headers = Headers::parse(header_block)
            .map_err(|e| NntpError::PostingFailed(format!("header block: {e}")))?;

        let from = headers
            .get("From")
            .map(str::to_string)
            .ok_or_else(|| NntpError::PostingFailed("missing From header".to_string()))?;
        if !is_valid_from(&from) {
            return Err(NntpError::PostingFailed(format!(
                "From header does not match mailbox grammar: {from:?}"
            )));
        }

        let newsgroups_raw = headers
            .get("Newsgroups")
            .map(str::to_string)
            .ok_or_else(|| NntpError::PostingFailed("missing Newsgroups header".to_string()))?;
        let newsgroups: Vec<String> = newsgroups_raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if newsgroups.is_empty() {
            return Err(NntpError::PostingFailed(
                "Newsgroups header is empty".to_string(),
            ));
        }

        let subject = headers
            .get("Subject")
            .map(str::to_string)
            .ok_or_else(|| NntpError::PostingFailed("missing Subject header".to_string()))?;

        let message_id_generated;
        let message_id = match headers.get("Message-ID") {
            Some(id) if is_valid_message_id(id) => {
                message_id_generated = false;
                id.to_string()
            }
            Some(_malformed) => {
                message_id_generated = true;
                let id = format!("<{}@mcnttp.invalid>", Uuid::new_v4().simple());
                headers.set("Message-ID", &id);
                id
            }
            None => {
                message_id_generated = true;
                let id = format!("<{}@mcnttp.auto>", Uuid::new_v4().simple());
                headers.set("Message-ID", &id);
                id
            }
        };

        let (date, date_parsed) = match headers.get("Date") {
            Some(d) => {
                let parsed = DateTime::parse_from_rfc2822(d)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                (d.to_string(), parsed)
            }
            None => {
                let now = Utc::now();
                let formatted = now.format("%d %b %Y %H:%M:%S %z").to_string();
                headers.set("Date", &formatted);
                (formatted, now)
            }
        };

        let path = headers.get("Path").unwrap_or_default().to_string();

        let article_headers = ArticleHeaders {
            date,
            date_parsed,
            from,
            newsgroups,
            subject,
            message_id,
            path,
            approved: headers.get("Approved").map(str::to_string),
            archive: headers.get("Archive").map(str::to_string),
            content_disposition: headers.get("Content-Disposition").map(str::to_string),
            content_language: headers.get("Content-Language").map(str::to_string),
            content_transfer_encoding: headers
                .get("Content-Transfer-Encoding")
                .map(str::to_string),
            content_type: headers.get("Content-Type").map(str::to_string),
            control: headers.get("Control").map(str::to_string),
            distribution: headers.get("Distribution").map(str::to_string),
            expires: headers.get("Expires").map(str::to_string),
            followup_to: headers.get("Followup-To").map(str::to_string),
            injection_date: headers.get("Injection-Date").map(str::to_string),
            injection_info: headers.get("Injection-Info").map(str::to_string),
            mime_version: headers.get("MIME-Version").map(str::to_string),
            organization: headers.get("Organization").map(str::to_string),
            references: headers.get("References").map(str::to_string),
            summary: headers.get("Summary").map(str::to_string),
            supersedes: headers.get("Supersedes").map(str::to_string),
            user_agent: headers.get("User-Agent").map(str::to_string),
            xref: headers.get("Xref").map(str::to_string),
        };

        let raw_headers = headers.raw_block();

        Ok(PostedArticle {
            article: Article {
                headers: article_headers,
                body: body.to_string(),
                raw_headers,
            },
            message_id_generated,
        })
    }
}

/// Split `raw` into its header block and body at the first blank line.
/// Missing a blank line entirely is treated as an all-header, empty-body
/// message (a client that posted headers with no terminator before `.`).
fn split_header_block(raw: &str) -> (&str, &str) {
    if let Some(idx) = raw.find("\r\n\r\n") {
        (&raw[..idx], &raw[idx + 4..])
    } else if let Some(idx) = raw.find("\n\n") {
        (&raw[..idx], &raw[idx + 2..])
    } else {
        (raw, "")
    }
}

/// A loose check against RFC 5322 §3.4 mailbox grammar: either a bare
/// `local@domain` or a display name followed by `<local@domain>`, allowing
/// a comma-separated list.
fn is_valid_from(from: &str) -> bool {
    from.split(',').map(str::trim).all(is_valid_mailbox)
}

fn is_valid_mailbox(mailbox: &str) -> bool {
    if let Some(open) = mailbox.rfind('<') {
        if !mailbox.ends_with('>') {
            return false;
        }
        let addr = &mailbox[open + 1..mailbox.len() - 1];
        is_bare_addr(addr)
    } else {
        is_bare_addr(mailbox)
    }
}

fn is_bare_addr(addr: &str) -> bool {
    match addr.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// The Usenet Message-ID grammar: angle-bracketed, exactly one `@`, no
/// whitespace or nested brackets.
fn is_valid_message_id(id: &str) -> bool {
    if !id.starts_with('<') || !id.ends_with('>') || id.len() < 4 {
        return false;
    }
    let inner = &id[1..id.len() - 1];
    inner.matches('@').count() == 1
        && !inner.chars().any(char::is_whitespace)
        && !inner.contains('<')
        && !inner.contains('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str =
        "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nMessage-ID: <t1@x>\r\n\r\nbody text\r\n";

    #[test]
    fn decodes_minimal_valid_article() {
        let posted = Codec::decode(MINIMAL).unwrap();
        assert_eq!(posted.article.headers.from, "a@b.invalid");
        assert_eq!(posted.article.headers.message_id, "<t1@x>");
        assert!(!posted.message_id_generated);
        assert_eq!(posted.article.body, "body text\r\n");
    }

    #[test]
    fn accepts_display_name_from() {
        let raw = "From: A Poster <a@b.invalid>\r\nNewsgroups: misc.test\r\nSubject: hi\r\n\r\nbody";
        let posted = Codec::decode(raw).unwrap();
        assert_eq!(posted.article.headers.from, "A Poster <a@b.invalid>");
    }

    #[test]
    fn rejects_missing_from() {
        let raw = "Newsgroups: misc.test\r\nSubject: hi\r\n\r\nbody";
        assert!(Codec::decode(raw).is_err());
    }

    #[test]
    fn rejects_malformed_from() {
        let raw = "From: not-an-address\r\nNewsgroups: misc.test\r\nSubject: hi\r\n\r\nbody";
        assert!(Codec::decode(raw).is_err());
    }

    #[test]
    fn generates_message_id_when_absent() {
        let raw = "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\n\r\nbody";
        let posted = Codec::decode(raw).unwrap();
        assert!(posted.message_id_generated);
        assert!(posted.article.headers.message_id.ends_with("@mcnttp.auto>"));
        assert!(posted.article.raw_headers.contains("Message-ID:"));
    }

    #[test]
    fn regenerates_malformed_message_id() {
        let raw = "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nMessage-ID: not-valid\r\n\r\nbody";
        let posted = Codec::decode(raw).unwrap();
        assert!(posted.message_id_generated);
        assert!(posted
            .article
            .headers
            .message_id
            .ends_with("@mcnttp.invalid>"));
    }

    #[test]
    fn defaults_date_when_absent() {
        let posted = Codec::decode(MINIMAL).unwrap();
        assert!(posted.article.raw_headers.contains("Date:"));
    }

    #[test]
    fn splits_multiple_newsgroups() {
        let raw =
            "From: a@b.invalid\r\nNewsgroups: misc.test,misc.other\r\nSubject: hi\r\n\r\nbody";
        let posted = Codec::decode(raw).unwrap();
        assert_eq!(
            posted.article.headers.newsgroups,
            vec!["misc.test".to_string(), "misc.other".to_string()]
        );
    }
}
