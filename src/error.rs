//! NNTP protocol error types

use thiserror::Error;

/// Errors surfaced while processing a single NNTP command.
///
/// Each variant maps to exactly one NNTP reply code (see
/// [`NntpError::response_code`]); the dispatch loop uses that mapping to
/// reply to the client without ever leaking an internal cause.
#[derive(Error, Debug)]
pub enum NntpError {
    /// Command verb not found in the dispatch table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Command recognized but its arguments are malformed.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Action requires an identity the session does not have.
    #[error("not registered: {0}")]
    NotRegistered(String),

    /// AUTHINFO PASS failed, or LocalAuthenticationOnly rejected a remote peer.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A command other than AUTHINFO PASS arrived between USER and PASS.
    #[error("authentication out of sequence")]
    AuthSequence,

    /// Command is recognized but unavailable in the current session state.
    #[error("command unavailable: {0}")]
    CommandUnavailable(String),

    /// Referenced catalog does not exist or is not visible to this principal.
    #[error("no such newsgroup: {0}")]
    NoSuchCatalog(String),

    /// No catalog is currently selected.
    #[error("no newsgroup selected")]
    NoNewsgroup,

    /// A catalog is selected but no current article number is set.
    #[error("no current article number")]
    NoArticleNumber,

    /// The current article number does not resolve to a non-cancelled article.
    #[error("no article in that range")]
    NoArticleInRange,

    /// `LAST` found no lower article number in the current catalog.
    #[error("no previous article in this group")]
    NoPrevArticle,

    /// `NEXT` found no higher article number in the current catalog.
    #[error("no next article in this group")]
    NoNextArticle,

    /// No stored article matches the given message identifier.
    #[error("no such article: {0}")]
    NoSuchMessageId(String),

    /// Posting is not permitted on this connection or for this principal.
    #[error("posting not permitted")]
    PostingForbidden,

    /// A posted article failed validation or could not be stored.
    #[error("posting failed: {0}")]
    PostingFailed(String),

    /// The persistence layer reported a failure; cause is logged, never echoed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// STARTTLS negotiation failed, or was attempted on an already-secured socket.
    #[error("TLS failure: {0}")]
    Tls(String),

    /// Underlying socket I/O failed; the session must terminate.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer's command line could not be decoded or the connection closed mid-command.
    #[error("connection closed or undecodable input")]
    ConnectionClosed,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NntpError>;

impl NntpError {
    /// The 3-digit NNTP reply code this error kind maps to, per the error
    /// handling table (§7): every recoverable kind maps to exactly one code.
    ///
    /// Returns `None` for the two kinds ([`NntpError::Io`],
    /// [`NntpError::ConnectionClosed`]) that terminate the session instead
    /// of producing a reply.
    pub fn response_code(&self) -> Option<u16> {
        use NntpError::*;
        match self {
            UnknownCommand(_) => Some(500),
            Syntax(_) => Some(501),
            NotRegistered(_) => Some(480),
            AuthFailed(_) => Some(481),
            AuthSequence => Some(482),
            CommandUnavailable(_) => Some(502),
            NoSuchCatalog(_) => Some(411),
            NoNewsgroup => Some(412),
            NoArticleNumber => Some(420),
            NoArticleInRange => Some(423),
            NoPrevArticle => Some(422),
            NoNextArticle => Some(421),
            NoSuchMessageId(_) => Some(430),
            PostingForbidden => Some(440),
            PostingFailed(_) => Some(441),
            StoreUnavailable(_) => Some(403),
            Tls(_) => Some(580),
            Io(_) | ConnectionClosed => None,
        }
    }

    /// `true` when the session should continue processing further commands
    /// after this error has been reported to the client.
    pub fn is_recoverable(&self) -> bool {
        self.response_code().is_some()
    }

    /// The reply text paired with [`NntpError::response_code`] when the
    /// dispatcher reports this error to the client. Kept separate from
    /// [`std::fmt::Display`] (used for logging) because the wire text is
    /// fixed by the protocol's own phrasing (§8 scenario transcripts)
    /// while the log message may carry more internal detail.
    pub fn reply_text(&self) -> String {
        use NntpError::*;
        match self {
            UnknownCommand(_) => "Unknown command".to_string(),
            Syntax(detail) => format!("Syntax error: {detail}"),
            NotRegistered(detail) => format!("Authentication required: {detail}"),
            AuthFailed(_) => "Authentication failed".to_string(),
            AuthSequence => "Authentication commands issued out of sequence".to_string(),
            CommandUnavailable(detail) => format!("Command not available: {detail}"),
            NoSuchCatalog(name) => format!("No such newsgroup: {name}"),
            NoNewsgroup => "No newsgroup selected".to_string(),
            NoArticleNumber => "No current article selected".to_string(),
            NoArticleInRange => "No article in that range".to_string(),
            NoPrevArticle => "No previous article in this group".to_string(),
            NoNextArticle => "No next article in this group".to_string(),
            NoSuchMessageId(id) => format!("No such article: {id}"),
            PostingForbidden => "Posting not permitted".to_string(),
            PostingFailed(detail) => format!("Posting failed: {detail}"),
            StoreUnavailable(_) => "Archive server temporarily offline".to_string(),
            Tls(detail) => format!("TLS negotiation failed: {detail}"),
            Io(_) | ConnectionClosed => "connection terminated".to_string(),
        }
    }
}
