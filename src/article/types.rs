//! The `Article` and `ArticleHeaders` data model (§3).

use chrono::{DateTime, Utc};

/// An immutable, accepted Usenet article.
///
/// `raw_headers` is the exact byte-for-byte header block the wire carried
/// (minus the blank-line separator before the body), mutated in place only
/// by the injection step (Injection-Date, Xref, Message-ID regeneration) so
/// it can be retransmitted verbatim for ARTICLE/HEAD.
#[derive(Debug, Clone)]
pub struct Article {
    pub headers: ArticleHeaders,
    pub body: String,
    pub raw_headers: String,
}

/// Parsed article headers, split into the required fields (§3) and the
/// optional fields, each either present or absent.
#[derive(Debug, Clone)]
pub struct ArticleHeaders {
    // Required
    pub date: String,
    pub date_parsed: DateTime<Utc>,
    pub from: String,
    pub newsgroups: Vec<String>,
    pub subject: String,
    pub message_id: String,
    pub path: String,

    // Optional
    pub approved: Option<String>,
    pub archive: Option<String>,
    pub content_disposition: Option<String>,
    pub content_language: Option<String>,
    pub content_transfer_encoding: Option<String>,
    pub content_type: Option<String>,
    pub control: Option<String>,
    pub distribution: Option<String>,
    pub expires: Option<String>,
    pub followup_to: Option<String>,
    pub injection_date: Option<String>,
    pub injection_info: Option<String>,
    pub mime_version: Option<String>,
    pub organization: Option<String>,
    pub references: Option<String>,
    pub summary: Option<String>,
    pub supersedes: Option<String>,
    pub user_agent: Option<String>,
    pub xref: Option<String>,
}

impl Article {
    /// `true` when this article carries a `Control` header and should be
    /// routed through the control-message handler rather than stored for
    /// reading (§4.6).
    pub fn is_control_message(&self) -> bool {
        self.headers.control.is_some()
    }

    /// `References` split into individual message identifiers.
    pub fn references(&self) -> Vec<&str> {
        self.headers
            .references
            .as_deref()
            .map(|r| r.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// `Newsgroups` split into individual catalog names.
    pub fn newsgroup_names(&self) -> &[String] {
        &self.headers.newsgroups
    }

    /// Body byte length, used for the OVER/XOVER `:bytes` field.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Number of lines in the body, used for the OVER/XOVER `:lines` field.
    pub fn line_count(&self) -> usize {
        if self.body.is_empty() {
            0
        } else {
            self.body.lines().count()
        }
    }
}
