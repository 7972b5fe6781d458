//! Listener: accepts connections on one or more configured ports and hands
//! each to its own [`Session`] task (§2 Listener, §5 concurrency model).

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::config::{ListenerConfig, ServerConfig, TlsMode};
use crate::error::{NntpError, Result};
use crate::response::Reply;
use crate::session::{Session, SessionState};
use crate::store::CatalogStore;
use crate::{commands, tls};

/// Owns the configured listeners and the store they all share.
pub struct Listener {
    config: Arc<ServerConfig>,
    store: Arc<dyn CatalogStore>,
    tls_acceptor: Option<TlsAcceptor>,
}

impl Listener {
    /// Build a `Listener` from a loaded config and the store implementation
    /// to run it against. Builds the shared TLS acceptor once up front if
    /// any listener needs TLS (implicit or STARTTLS).
    pub fn new(config: Arc<ServerConfig>, store: Arc<dyn CatalogStore>) -> Result<Self> {
        let needs_tls = config.tls_allowed_on_plain
            || config
                .listeners
                .iter()
                .any(|l| l.tls == TlsMode::Implicit);
        let tls_acceptor = if needs_tls {
            let source = config
                .cert_source
                .as_ref()
                .ok_or_else(|| NntpError::Tls("TLS required but no cert_source configured".to_string()))?;
            Some(tls::build_acceptor(source)?)
        } else {
            None
        };
        Ok(Self {
            config,
            store,
            tls_acceptor,
        })
    }

    /// Bind every configured listener and serve forever, each binding its
    /// own accept loop as an independent task (§5: one task per connection,
    /// parallel across ports too).
    pub async fn serve(self) -> Result<()> {
        self.bind().await?.serve().await
    }

    /// Bind every configured listener up front without yet accepting
    /// connections. Split out from [`Listener::serve`] so a caller (tests,
    /// a supervisor that wants to log the real port of a `:0` listener) can
    /// learn the OS-assigned addresses before traffic starts flowing.
    pub async fn bind(self) -> Result<BoundListener> {
        let mut bindings = Vec::new();
        for listener_config in self.config.listeners.clone() {
            let tcp = TcpListener::bind(listener_config.addr).await?;
            info!(addr = %listener_config.addr, tls = ?listener_config.tls, "listening");
            bindings.push((listener_config, tcp));
        }
        Ok(BoundListener {
            listener: Arc::new(self),
            bindings,
        })
    }

    async fn accept_loop(&self, tcp: TcpListener, listener_config: ListenerConfig) -> Result<()> {
        loop {
            let (socket, peer_addr) = tcp.accept().await?;
            let listener_config = listener_config.clone();
            let config = Arc::clone(&self.config);
            let store = Arc::clone(&self.store);
            let tls_acceptor = self.tls_acceptor.clone();
            tokio::spawn(async move {
                if let Err(e) = run_connection(socket, peer_addr, listener_config, config, store, tls_acceptor).await
                {
                    debug!(peer = %peer_addr, error = %e, "connection ended with error");
                }
            });
        }
    }
}

/// The result of [`Listener::bind`]: every configured port is already bound,
/// so [`BoundListener::local_addrs`] reports real OS-assigned addresses even
/// for listeners configured with an ephemeral `:0` port.
pub struct BoundListener {
    listener: Arc<Listener>,
    bindings: Vec<(ListenerConfig, TcpListener)>,
}

impl BoundListener {
    /// The bound address of each configured listener, in configuration
    /// order.
    pub fn local_addrs(&self) -> Vec<std::net::SocketAddr> {
        self.bindings
            .iter()
            .filter_map(|(_, tcp)| tcp.local_addr().ok())
            .collect()
    }

    /// Accept connections on every bound listener forever, each running its
    /// own accept loop as an independent task (§5: one task per connection,
    /// parallel across ports too).
    pub async fn serve(self) -> Result<()> {
        let mut tasks = Vec::new();
        for (listener_config, tcp) in self.bindings {
            let listener = Arc::clone(&self.listener);
            tasks.push(tokio::spawn(async move {
                if let Err(e) = listener.accept_loop(tcp, listener_config).await {
                    error!(error = %e, "listener accept loop exited");
                }
            }));
        }
        for task in tasks {
            let _ = task.await;
        }
        Ok(())
    }
}

/// Handle exactly one accepted connection from greeting through close.
async fn run_connection(
    socket: TcpStream,
    peer_addr: std::net::SocketAddr,
    listener_config: ListenerConfig,
    config: Arc<ServerConfig>,
    store: Arc<dyn CatalogStore>,
    tls_acceptor: Option<TlsAcceptor>,
) -> Result<()> {
    socket.set_nodelay(true).ok();

    let tls_allowed = config.tls_allowed_on_plain || listener_config.tls == TlsMode::Implicit;

    let mut session = match listener_config.tls {
        TlsMode::Implicit => {
            let acceptor = tls_acceptor
                .clone()
                .ok_or_else(|| NntpError::Tls("implicit TLS listener has no certificate".to_string()))?;
            let tls_stream = acceptor
                .accept(socket)
                .await
                .map_err(|e| NntpError::Tls(e.to_string()))?;
            Session::new(
                Box::new(tls_stream),
                peer_addr,
                true,
                tls_allowed,
                tls_acceptor,
                listener_config.allow_posting,
                config,
                store,
            )
        }
        TlsMode::Plain => Session::new(
            Box::new(socket),
            peer_addr,
            false,
            tls_allowed,
            tls_acceptor,
            listener_config.allow_posting,
            config,
            store,
        ),
    };

    let greeting = if session.allow_posting {
        Reply::single(200, "Service available, posting allowed")
    } else {
        Reply::single(201, "Service available, posting prohibited")
    };
    session.write_reply(&greeting).await?;

    run_command_loop(&mut session).await
}

/// The per-connection command loop (§4.3). Reads one line at a time,
/// routes it to `POST`'s body-accumulation continuation when active,
/// otherwise splits the verb and dispatches it, special-casing `QUIT` and
/// `STARTTLS` because both need control flow no other command does.
///
/// Idle timeout (§5: "an idle session may be terminated after an
/// implementation-defined period") is applied to each individual read, not
/// the loop as a whole, so a session making steady progress is never
/// killed purely for having been open a long time.
async fn run_command_loop(session: &mut Session) -> Result<()> {
    loop {
        let max_len = if session.is_posting() {
            crate::session::MAX_POST_LINE
        } else {
            crate::session::MAX_COMMAND_LINE
        };
        let idle_timeout_secs = session.config.idle_timeout_secs;
        let Some(line) = read_line_with_idle_timeout(session, max_len, idle_timeout_secs).await?
        else {
            debug!(peer = %session.peer_addr, "connection closed by peer");
            return Ok(());
        };

        if session.is_posting() {
            handle_posting_line(session, &line).await?;
            continue;
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_ascii_uppercase();
        let arg = parts.next().unwrap_or("").trim();

        if verb.is_empty() {
            continue;
        }

        if let SessionState::Authenticating { .. } = &session.state {
            if !(verb == "AUTHINFO" && arg.to_ascii_uppercase().starts_with("PASS")) {
                write_error(session, &NntpError::AuthSequence).await?;
                continue;
            }
        }

        match verb.as_str() {
            "QUIT" => {
                let reply = Reply::single(205, "Connection closing");
                session.write_reply(&reply).await?;
                return Ok(());
            }
            "STARTTLS" => {
                handle_starttls(session).await?;
            }
            _ => match commands::dispatch(session, &verb, arg).await {
                Ok(reply) => session.write_reply(&reply).await?,
                Err(e) => write_error(session, &e).await?,
            },
        }
    }
}

async fn handle_posting_line(session: &mut Session, line: &str) -> Result<()> {
    let mut pipeline = session
        .take_continuation()
        .expect("is_posting() guarantees a continuation is installed");
    match pipeline.feed_line(line) {
        None => {
            session.put_continuation(pipeline);
            Ok(())
        }
        Some(raw) => {
            let outcome = crate::post_pipeline::accept_post(
                &raw,
                &session.principal,
                &session.store,
                &session.config.hostname,
            )
            .await;
            match outcome {
                Ok(reply) => session.write_reply(&reply).await,
                Err(e) => write_error(session, &e).await,
            }
        }
    }
}

async fn handle_starttls(session: &mut Session) -> Result<()> {
    if let Err(e) = commands::starttls::precheck(session) {
        return write_error(session, &e).await;
    }
    let reply = Reply::single(382, "Begin TLS negotiation now");
    session.write_reply(&reply).await?;
    match session.upgrade_tls().await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(peer = %session.peer_addr, error = %e, "STARTTLS handshake failed");
            if session.has_io() {
                write_error(session, &e).await
            } else {
                Err(e)
            }
        }
    }
}

async fn write_error(session: &mut Session, error: &NntpError) -> Result<()> {
    match error.response_code() {
        Some(code) => {
            let reply = Reply::single(code, error.reply_text());
            session.write_reply(&reply).await
        }
        None => Err(NntpError::Io(std::io::Error::other(error.to_string()))),
    }
}

/// Read one line, bounding the wait by `secs` since the *start of this
/// read* rather than since the connection was accepted. A session that
/// goes quiet past the deadline is dropped, the same as a socket-close
/// cancellation; one that keeps sending commands is never killed just for
/// having been open a long time.
async fn read_line_with_idle_timeout(
    session: &mut Session,
    max_len: usize,
    secs: Option<u64>,
) -> Result<Option<String>> {
    match secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), session.read_line(max_len))
            .await
            .unwrap_or(Ok(None)),
        None => session.read_line(max_len).await,
    }
}
