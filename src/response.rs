//! NNTP response codes and reply-writing helpers (RFC 3977 §3.2, §9.3).

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;

/// NNTP response status codes used by this server.
///
/// Named the same way the protocol's own RFCs name them, grouped by the
/// leading digit. Only codes this server actually emits are listed.
#[allow(dead_code)]
pub mod codes {
    // 1xx - informational
    pub const HELP_TEXT_FOLLOWS: u16 = 100;
    pub const CAPABILITY_LIST: u16 = 101;
    pub const SERVER_DATE: u16 = 111;

    // 2xx - success
    pub const READY_POSTING_ALLOWED: u16 = 200;
    pub const READY_NO_POSTING: u16 = 201;
    pub const MODE_ACKNOWLEDGED: u16 = 200;
    pub const CLOSING_CONNECTION: u16 = 205;
    pub const GROUP_SELECTED: u16 = 211;
    pub const LIST_INFORMATION_FOLLOWS: u16 = 215;
    pub const ARTICLE_FOLLOWS: u16 = 220;
    pub const HEAD_FOLLOWS: u16 = 221;
    pub const BODY_FOLLOWS: u16 = 222;
    pub const ARTICLE_STAT: u16 = 223;
    pub const OVERVIEW_INFO_FOLLOWS: u16 = 224;
    pub const HEADERS_FOLLOW: u16 = 225;
    pub const NEW_NEWNEWS_FOLLOWS: u16 = 230;
    pub const NEW_NEWSGROUPS_FOLLOW: u16 = 231;
    pub const COMPRESSION_ACTIVE: u16 = 290;
    pub const ARTICLE_POSTED: u16 = 240;
    pub const AUTH_ACCEPTED: u16 = 281;

    // 3xx - continuation
    pub const SEND_ARTICLE: u16 = 340;
    pub const AUTH_CONTINUE: u16 = 381;
    pub const CONTINUE_TLS: u16 = 382;

    // 4xx - temporary errors
    pub const INTERNAL_FAULT: u16 = 403;
    pub const NO_SUCH_GROUP: u16 = 411;
    pub const NO_GROUP_SELECTED: u16 = 412;
    pub const NO_CURRENT_ARTICLE: u16 = 420;
    pub const NO_NEXT_ARTICLE: u16 = 421;
    pub const NO_PREV_ARTICLE: u16 = 422;
    pub const NO_SUCH_ARTICLE_NUMBER: u16 = 423;
    pub const NO_SUCH_ARTICLE_ID: u16 = 430;
    pub const POSTING_NOT_PERMITTED: u16 = 440;
    pub const POSTING_FAILED: u16 = 441;
    pub const AUTH_REQUIRED: u16 = 480;
    pub const AUTH_REJECTED: u16 = 481;
    pub const AUTH_OUT_OF_SEQUENCE: u16 = 482;

    // 5xx - permanent errors
    pub const COMMAND_NOT_RECOGNIZED: u16 = 500;
    pub const COMMAND_SYNTAX_ERROR: u16 = 501;
    pub const ACCESS_DENIED: u16 = 502;
    pub const TLS_FAILURE: u16 = 580;
}

/// A single- or multi-line reply, ready to be written to a session socket.
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: u16,
    pub text: String,
    /// Lines of a multiline body, already dot-stuffed; `None` for a
    /// single-line reply.
    pub lines: Option<Vec<String>>,
}

impl Reply {
    /// Build a single-line reply, e.g. `211 0 0 0 misc.test`.
    pub fn single(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
            lines: None,
        }
    }

    /// Build a multiline reply. `lines` are the body lines before
    /// dot-stuffing; dot-stuffing and the terminating `.` are applied on
    /// write.
    pub fn multiline(code: u16, text: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            code,
            text: text.into(),
            lines: Some(lines),
        }
    }

    /// Write this reply to `writer` as CRLF-terminated wire bytes,
    /// dot-stuffing any body line that starts with `.` and terminating a
    /// multiline reply with a lone `.` line.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<()> {
        let header = format!("{} {}\r\n", self.code, self.text);
        writer.write_all(header.as_bytes()).await?;
        if let Some(lines) = &self.lines {
            for line in lines {
                if let Some(rest) = line.strip_prefix('.') {
                    writer.write_all(b".").await?;
                    writer.write_all(b".").await?;
                    writer.write_all(rest.as_bytes()).await?;
                } else {
                    writer.write_all(line.as_bytes()).await?;
                }
                writer.write_all(b"\r\n").await?;
            }
            writer.write_all(b".\r\n").await?;
        }
        writer.flush().await?;
        Ok(())
    }
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_continuation(&self) -> bool {
        (300..400).contains(&self.code)
    }

    pub fn is_error(&self) -> bool {
        self.code >= 400
    }
}
