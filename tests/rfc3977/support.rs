//! Shared scaffolding for the transcript tests: bind a real [`Listener`] to
//! an ephemeral port and drive it over a genuine `TcpStream`, grounded on
//! the `TcpListener::bind("127.0.0.1:0")` + `local_addr()` pattern used for
//! live-socket tests elsewhere in the crate's reference pack
//! (`examples/efir369999-junomontanaagibot/Montana ACP/montana/src/net/encrypted.rs`).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use nntp_server::store::memory::MemoryStore;
use nntp_server::store::{Catalog, CatalogStore};
use nntp_server::{Listener, ServerConfig};

/// Start a listener on an ephemeral port over the given store and return
/// its bound address. The accept loop runs for the lifetime of the test
/// process; each test gets its own store and port.
pub async fn spawn_server(store: Arc<dyn CatalogStore>) -> std::net::SocketAddr {
    let config = Arc::new(ServerConfig::test_default("127.0.0.1:0".parse().unwrap()));
    let listener = Listener::new(config, store).expect("listener builds");
    let bound = listener.bind().await.expect("bind succeeds");
    let addr = bound.local_addrs()[0];
    tokio::spawn(async move {
        let _ = bound.serve().await;
    });
    addr
}

pub async fn empty_catalog(name: &str, moderated: bool) -> Catalog {
    Catalog {
        name: name.to_string(),
        description: String::new(),
        moderated,
        deny_local_posting: false,
        deny_peer_posting: false,
        create_date: Utc::now(),
        creator_entity: "test".to_string(),
        low_watermark: 1,
        high_watermark: 0,
        message_count: 0,
    }
}

pub struct Client {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connects");
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("write succeeds");
    }

    /// Read exactly one CRLF-terminated line, with the terminator stripped.
    pub async fn read_line(&mut self) -> String {
        let mut buf = String::new();
        self.reader.read_line(&mut buf).await.expect("read succeeds");
        buf.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Read a dot-terminated multiline block's body lines, not including
    /// the initial status line or the terminating `.`.
    pub async fn read_multiline_body(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await;
            if line == "." {
                break;
            }
            lines.push(line);
        }
        lines
    }
}

/// Every read in this suite is expected to make progress quickly; bound the
/// whole transcript so a protocol mistake fails fast instead of hanging the
/// test binary.
pub async fn with_timeout<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("transcript completes within the timeout")
}
