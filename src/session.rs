//! Per-connection [`Session`]: the state machine described in §4.3.
//!
//! One `Session` owns exactly one accepted connection (plain or TLS),
//! its buffered reader/writer, its current catalog/article-number
//! cursor, its [`Principal`], and the "in-process command" continuation
//! slot that `POST` installs while it accumulates a body (§4.3, §9).

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, trace};

use crate::auth::Principal;
use crate::config::ServerConfig;
use crate::error::{NntpError, Result};
use crate::post_pipeline::PostPipeline;
use crate::response::Reply;
use crate::store::CatalogStore;

/// Maximum length of a command line (§4.3: "maximum line length 512
/// octets for commands").
pub const MAX_COMMAND_LINE: usize = 512;

/// Ceiling on a single line while accumulating a POST body. The protocol
/// places no hard limit here ("larger for article transfer", §4.3); this
/// is a resource-exhaustion backstop, not a protocol limit.
pub const MAX_POST_LINE: usize = 1 << 20;

/// Any full-duplex, thread-mobile byte stream a [`Session`] can run over:
/// a plain `TcpStream` or a `tokio_rustls` `TlsStream<TcpStream>`. Boxed
/// as `Box<dyn Stream>` so a session can be handed a plain socket at
/// accept time and later replace it in place with a TLS-wrapped one
/// (`STARTTLS`) without changing its own type.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> Stream for T {}

/// Where the per-connection state machine currently is (§4.3). `Command`
/// and `Authenticating` are tracked explicitly; `Posting` is represented
/// by `continuation.is_some()` instead of a variant here, since entering
/// and leaving it is wholly owned by [`PostPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Command,
    /// `AUTHINFO USER` was accepted; only `AUTHINFO PASS` is a legal next
    /// command (§4.3, §4.4).
    Authenticating { username: String },
}

/// Per-response-class compression negotiated by `XFEATURE COMPRESS GZIP`
/// (§4.4, §6 "Compression extension"). Only multiline replies are
/// affected; single-line replies are always sent plain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    GzipMultiline,
}

/// A single accepted connection and all of its conversational state.
pub struct Session {
    io: Option<BufReader<Box<dyn Stream>>>,
    pub peer_addr: std::net::SocketAddr,
    pub tls_active: bool,
    pub tls_allowed: bool,
    tls_acceptor: Option<TlsAcceptor>,
    pub allow_posting: bool,
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn CatalogStore>,
    pub principal: Principal,
    pub current_catalog: Option<String>,
    pub current_number: Option<u64>,
    pub state: SessionState,
    pub compression: Compression,
    continuation: Option<PostPipeline>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stream: Box<dyn Stream>,
        peer_addr: std::net::SocketAddr,
        tls_active: bool,
        tls_allowed: bool,
        tls_acceptor: Option<TlsAcceptor>,
        allow_posting: bool,
        config: Arc<ServerConfig>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            io: Some(BufReader::new(stream)),
            peer_addr,
            tls_active,
            tls_allowed,
            tls_acceptor,
            allow_posting,
            config,
            store,
            principal: Principal::anonymous(),
            current_catalog: None,
            current_number: None,
            state: SessionState::Command,
            compression: Compression::None,
            continuation: None,
        }
    }

    /// `true` while a `POST` continuation is accumulating a body; when
    /// set, the run loop bypasses normal command dispatch entirely (§4.3).
    pub fn is_posting(&self) -> bool {
        self.continuation.is_some()
    }

    pub fn start_posting(&mut self) {
        self.continuation = Some(PostPipeline::new());
    }

    pub fn take_continuation(&mut self) -> Option<PostPipeline> {
        self.continuation.take()
    }

    pub fn put_continuation(&mut self, pipeline: PostPipeline) {
        self.continuation = Some(pipeline);
    }

    /// `false` only in the narrow window where a failed `STARTTLS`
    /// handshake consumed the underlying socket without producing a
    /// replacement (§4.4); the run loop uses this to decide whether a
    /// `580` reply can still be sent or the connection must simply close.
    pub fn has_io(&self) -> bool {
        self.io.is_some()
    }

    /// Read one CRLF-terminated line (the terminator stripped), honoring
    /// `max_len`. Returns `Ok(None)` on a clean EOF.
    pub async fn read_line(&mut self, max_len: usize) -> Result<Option<String>> {
        let io = self.io.as_mut().expect("session io missing outside STARTTLS upgrade");
        let mut buf = Vec::new();
        let n = io.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if buf.len() > max_len {
            return Err(NntpError::Syntax("line too long".to_string()));
        }
        while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Write a reply, applying negotiated multiline compression (§6).
    pub async fn write_reply(&mut self, reply: &Reply) -> Result<()> {
        let io = self.io.as_mut().expect("session io missing outside STARTTLS upgrade");
        match (self.compression, &reply.lines) {
            (Compression::GzipMultiline, Some(lines)) => {
                write_compressed_multiline(io, reply, lines).await
            }
            _ => reply.write_to(io).await,
        }
    }

    /// Perform the STARTTLS handshake, replacing the plain socket with a
    /// TLS-wrapped one in place (§4.4). Only valid once per session, and
    /// only when the reader has no buffered pipelined bytes left over
    /// (a client that pipelines past STARTTLS has violated the protocol).
    pub async fn upgrade_tls(&mut self) -> Result<()> {
        if self.tls_active {
            return Err(NntpError::CommandUnavailable(
                "connection is already using TLS".to_string(),
            ));
        }
        let acceptor = self
            .tls_acceptor
            .clone()
            .ok_or_else(|| NntpError::Tls("no certificate configured".to_string()))?;

        let buffered = self.io.take().expect("session io missing");
        if !buffered.buffer().is_empty() {
            return Err(NntpError::Tls(
                "pipelined data present before STARTTLS handshake".to_string(),
            ));
        }
        let plain = buffered.into_inner();
        let tls_stream = acceptor
            .accept(plain)
            .await
            .map_err(|e| NntpError::Tls(e.to_string()))?;

        self.io = Some(BufReader::new(Box::new(tls_stream)));
        self.tls_active = true;
        debug!(peer = %self.peer_addr, "STARTTLS handshake complete");
        Ok(())
    }
}

async fn write_compressed_multiline<W: AsyncWrite + Unpin>(
    io: &mut W,
    reply: &Reply,
    lines: &[String],
) -> Result<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression as GzLevel;
    use std::io::Write as _;

    let header = format!("{} {}\r\n", reply.code, reply.text);
    io.write_all(header.as_bytes()).await?;

    let mut body = Vec::new();
    for line in lines {
        if let Some(rest) = line.strip_prefix('.') {
            body.extend_from_slice(b"..");
            body.extend_from_slice(rest.as_bytes());
        } else {
            body.extend_from_slice(line.as_bytes());
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b".\r\n");

    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
    encoder.write_all(&body).map_err(NntpError::Io)?;
    let compressed = encoder.finish().map_err(NntpError::Io)?;

    io.write_all(&compressed).await?;
    io.write_all(b"\r\n\r\n").await?;
    io.flush().await?;
    trace!(
        raw_len = body.len(),
        compressed_len = compressed.len(),
        "wrote compressed multiline reply"
    );
    Ok(())
}
