//! The six literal transcript scenarios: greeting + CAPABILITIES, GROUP on
//! an empty group, POST then STAT by message-id, cross-post independent
//! numbering, an unknown command, and an XOVER range.

use std::sync::Arc;

use nntp_server::store::CatalogStore;
use nntp_server::store::memory::MemoryStore;

use super::support::{Client, empty_catalog, spawn_server, with_timeout};

#[tokio::test]
async fn greeting_then_capabilities() {
    with_timeout(async {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let addr = spawn_server(store).await;
        let mut client = Client::connect(addr).await;

        let greeting = client.read_line().await;
        assert!(greeting.starts_with("200 "), "unexpected greeting: {greeting}");

        client.send("CAPABILITIES").await;
        let status = client.read_line().await;
        assert_eq!(status, "101 Capability list:");
        let body = client.read_multiline_body().await;
        assert!(body.iter().any(|l| l == "VERSION 2"));
        assert!(body.iter().any(|l| l == "POST"));

        client.send("QUIT").await;
        let bye = client.read_line().await;
        assert_eq!(bye, "205 Connection closing");
    })
    .await;
}

#[tokio::test]
async fn unknown_command_is_rejected() {
    with_timeout(async {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let addr = spawn_server(store).await;
        let mut client = Client::connect(addr).await;
        client.read_line().await; // greeting

        client.send("FOO").await;
        let reply = client.read_line().await;
        assert!(reply.starts_with("500 "), "unexpected reply: {reply}");
    })
    .await;
}

#[tokio::test]
async fn group_selection_on_an_empty_group() {
    with_timeout(async {
        let store = Arc::new(MemoryStore::new());
        store
            .create_catalog(empty_catalog("misc.test", false).await)
            .await
            .expect("catalog creation succeeds");
        let store: Arc<dyn CatalogStore> = store;
        let addr = spawn_server(store).await;
        let mut client = Client::connect(addr).await;
        client.read_line().await; // greeting

        client.send("GROUP misc.test").await;
        let reply = client.read_line().await;
        assert_eq!(reply, "211 0 0 0 misc.test");
    })
    .await;
}

#[tokio::test]
async fn group_on_unknown_catalog_is_411() {
    with_timeout(async {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let addr = spawn_server(store).await;
        let mut client = Client::connect(addr).await;
        client.read_line().await; // greeting

        client.send("GROUP nonexistent.catalog").await;
        let reply = client.read_line().await;
        assert!(reply.starts_with("411 "), "unexpected reply: {reply}");
    })
    .await;
}

#[tokio::test]
async fn post_a_minimal_article_then_retrieve_by_message_id() {
    with_timeout(async {
        let store = Arc::new(MemoryStore::new());
        store
            .create_catalog(empty_catalog("misc.test", false).await)
            .await
            .expect("catalog creation succeeds");
        let store: Arc<dyn CatalogStore> = store;
        let addr = spawn_server(store).await;
        let mut client = Client::connect(addr).await;
        client.read_line().await; // greeting

        client.send("POST").await;
        assert_eq!(client.read_line().await, "340 Send article to be posted");

        for line in [
            "From: a@b.invalid",
            "Newsgroups: misc.test",
            "Subject: hi",
            "Message-ID: <t1@x>",
            "",
            "body",
            ".",
        ] {
            client.send(line).await;
        }
        let posted = client.read_line().await;
        assert_eq!(posted, "240 Article received OK");

        // No GROUP is issued: STAT by message-id must still report the
        // article's real catalog-local number, not 0 (`spec.md` §8
        // scenario 3).
        client.send("STAT <t1@x>").await;
        let stat_reply = client.read_line().await;
        assert_eq!(stat_reply, "223 1 <t1@x>");
    })
    .await;
}

#[tokio::test]
async fn cross_post_allocates_independent_numbers_per_catalog() {
    with_timeout(async {
        let store = Arc::new(MemoryStore::new());
        store
            .create_catalog(empty_catalog("a.b", false).await)
            .await
            .expect("catalog creation succeeds");
        store
            .create_catalog(empty_catalog("c.d", false).await)
            .await
            .expect("catalog creation succeeds");
        let store: Arc<dyn CatalogStore> = store;
        let addr = spawn_server(store).await;
        let mut client = Client::connect(addr).await;
        client.read_line().await; // greeting

        client.send("POST").await;
        assert_eq!(client.read_line().await, "340 Send article to be posted");
        for line in [
            "From: a@b.invalid",
            "Newsgroups: a.b c.d",
            "Subject: hi",
            "Message-ID: <t2@x>",
            "",
            "body",
            ".",
        ] {
            client.send(line).await;
        }
        let posted = client.read_line().await;
        assert_eq!(posted, "240 Article received OK");

        // No GROUP is issued for either catalog: STAT by message-id
        // reports each catalog's own allocated number regardless of which
        // catalog (if any) is currently selected (`spec.md` §8 scenario 4).
        client.send("STAT <t2@x>").await;
        assert_eq!(client.read_line().await, "223 1 <t2@x>");
    })
    .await;
}

#[tokio::test]
async fn xover_reports_the_requested_range() {
    with_timeout(async {
        let store = Arc::new(MemoryStore::new());
        store
            .create_catalog(empty_catalog("misc.test", false).await)
            .await
            .expect("catalog creation succeeds");
        let store: Arc<dyn CatalogStore> = store;
        let addr = spawn_server(store).await;
        let mut client = Client::connect(addr).await;
        client.read_line().await; // greeting

        for subject in ["first", "second", "third"] {
            client.send("POST").await;
            assert_eq!(client.read_line().await, "340 Send article to be posted");
            for line in [
                "From: a@b.invalid",
                "Newsgroups: misc.test",
                &format!("Subject: {subject}"),
                "",
                "body",
                ".",
            ] {
                client.send(line).await;
            }
            let posted = client.read_line().await;
            assert_eq!(posted, "240 Article received OK");
        }

        client.send("GROUP misc.test").await;
        assert_eq!(client.read_line().await, "211 3 1 3 misc.test");

        client.send("XOVER 1-2").await;
        let status = client.read_line().await;
        assert_eq!(status, "224 Overview information follow");
        let body = client.read_multiline_body().await;
        assert_eq!(body.len(), 2);
        assert!(body[0].starts_with("1\t"));
        assert!(body[1].starts_with("2\t"));
    })
    .await;
}

/// `NEXT` followed by `LAST` is the identity on the current article number,
/// except at a boundary where the corresponding error is returned without
/// moving (`spec.md` §8's `LAST`/`NEXT` inverse invariant).
#[tokio::test]
async fn next_then_last_is_the_identity() {
    with_timeout(async {
        let store = Arc::new(MemoryStore::new());
        store
            .create_catalog(empty_catalog("misc.test", false).await)
            .await
            .expect("catalog creation succeeds");
        let store: Arc<dyn CatalogStore> = store;
        let addr = spawn_server(store).await;
        let mut client = Client::connect(addr).await;
        client.read_line().await; // greeting

        for subject in ["first", "second"] {
            client.send("POST").await;
            assert_eq!(client.read_line().await, "340 Send article to be posted");
            for line in [
                "From: a@b.invalid",
                "Newsgroups: misc.test",
                &format!("Subject: {subject}"),
                "",
                "body",
                ".",
            ] {
                client.send(line).await;
            }
            client.read_line().await; // 240
        }

        client.send("GROUP misc.test").await;
        assert_eq!(client.read_line().await, "211 2 1 2 misc.test");
        client.send("STAT 1").await;
        assert!(client.read_line().await.starts_with("223 1 "));

        client.send("NEXT").await;
        assert!(client.read_line().await.starts_with("223 2 "));
        client.send("LAST").await;
        assert!(client.read_line().await.starts_with("223 1 "));

        // At the high-watermark boundary, NEXT errors without moving.
        client.send("NEXT").await;
        assert!(client.read_line().await.starts_with("223 2 "));
        client.send("NEXT").await;
        let boundary = client.read_line().await;
        assert!(boundary.starts_with("421 "), "unexpected reply: {boundary}");
        client.send("STAT").await;
        assert!(client.read_line().await.starts_with("223 2 "));
    })
    .await;
}
