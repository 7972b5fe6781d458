//! Test-only helpers for constructing a [`Session`] without a real socket.
//! Used by unit tests across `commands::*`. Top-level transcripts against a
//! real, socket-bound [`crate::listener::Listener`] live under `tests/`
//! instead, since that crate boundary can't reach `cfg(test)`-only code.

use std::sync::Arc;

use chrono::Utc;

use crate::config::ServerConfig;
use crate::session::Session;
use crate::store::memory::MemoryStore;
use crate::store::{CatalogStore, Catalog};

/// A `Session` backed by an in-memory duplex pipe (never read from in unit
/// tests that only exercise dispatch logic directly) and a fresh, empty
/// `MemoryStore`.
pub fn test_session() -> Session {
    let (client, server) = tokio::io::duplex(4096);
    std::mem::forget(client);
    let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
    let config = Arc::new(ServerConfig::test_default("127.0.0.1:0".parse().unwrap()));
    Session::new(
        Box::new(server),
        "127.0.0.1:0".parse().unwrap(),
        false,
        false,
        None,
        true,
        config,
        store,
    )
}

/// A `Session` whose store already has one empty, unmoderated catalog.
pub async fn test_session_with_group(name: &str) -> Session {
    let session = test_session();
    session
        .store
        .create_catalog(Catalog {
            name: name.to_string(),
            description: String::new(),
            moderated: false,
            deny_local_posting: false,
            deny_peer_posting: false,
            create_date: Utc::now(),
            creator_entity: "test".to_string(),
            low_watermark: 1,
            high_watermark: 0,
            message_count: 0,
        })
        .await
        .unwrap();
    session
}
