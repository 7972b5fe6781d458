//! Server configuration (§6 "external configuration layer", SPEC_FULL §2).
//!
//! Loaded once at startup from a TOML file (the same `toml`/`serde`
//! convention sibling server `renews` uses) and handed to the [`Listener`]
//! unchanged for the life of the process; there is no hot reload and no
//! admin shell here, both out of scope per `spec.md` §1.
//!
//! [`Listener`]: crate::listener::Listener

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the server's TLS certificate comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CertSource {
    /// Load a PEM certificate/key pair from disk.
    Pem { cert_path: PathBuf, key_path: PathBuf },
    /// Generate a fresh self-signed certificate at startup (§6: "or
    /// generated self-signed on startup").
    SelfSigned {
        #[serde(default = "default_self_signed_subject")]
        subject: String,
    },
}

fn default_self_signed_subject() -> String {
    "localhost".to_string()
}

/// One listener binding. A server may configure several of these: a
/// clear-text reader port, an implicit-TLS port, and/or an explicit-TLS
/// (STARTTLS-capable) port, per §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub addr: SocketAddr,
    #[serde(default)]
    pub tls: TlsMode,
    /// Whether POST is accepted on connections to this port; reflected in
    /// the `200`/`201` greeting (§4.3).
    #[serde(default = "default_true")]
    pub allow_posting: bool,
}

fn default_true() -> bool {
    true
}

/// How a listener binding relates to TLS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Plain TCP; STARTTLS may still be offered if `tls_allowed_on_plain`.
    #[default]
    Plain,
    /// TLS is negotiated as part of the socket handshake before the NNTP
    /// greeting is sent.
    Implicit,
}

/// One `LIST DISTRIB.PATS` entry (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistribPattern {
    pub weight: i32,
    pub wildmat: String,
    pub distribution: String,
}

/// One `LIST DISTRIBUTIONS` entry (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub name: String,
    pub description: String,
}

/// Top-level server configuration, loaded from a single TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The hostname used in generated `Message-ID`s and as `PathHost` in
    /// `Path:`/approval-identity fallbacks (§4.2, §4.5).
    pub hostname: String,

    /// Server name/version reported by the `IMPLEMENTATION` capability.
    #[serde(default = "default_implementation_name")]
    pub implementation_name: String,

    pub listeners: Vec<ListenerConfig>,

    /// Whether STARTTLS may be offered at all (§4.4 CAPABILITIES: only
    /// advertised "if TLS allowed and socket not already TLS").
    #[serde(default)]
    pub tls_allowed_on_plain: bool,

    #[serde(default)]
    pub cert_source: Option<CertSource>,

    /// Path to the message-of-the-day file served by `LIST MOTD` (§4.4).
    #[serde(default)]
    pub motd_path: Option<PathBuf>,

    #[serde(default)]
    pub distrib_patterns: Vec<DistribPattern>,

    #[serde(default)]
    pub distributions: Vec<Distribution>,

    /// Local account credentials for `AUTHINFO USER`/`PASS` (§4.4). LDAP
    /// lookup is an external collaborator (`spec.md` §1); this is the one
    /// credential source the core ships.
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,

    /// Idle-session timeout (§5: "implementation-defined period"). `None`
    /// disables the timeout.
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

/// One locally-authenticated identity (§3 Principal, §4.4 AUTHINFO PASS).
///
/// `salt` and `password_hash` are both base64, produced the same way
/// [`crate::auth::password::hash_password`] does; provisioning a new
/// account is an administrative concern outside this crate, but verifying
/// one against these two fields is not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEntry {
    pub username: String,
    pub salt: String,
    pub password_hash: String,
    #[serde(default)]
    pub mailbox: Option<String>,
    /// Capability names matching [`crate::auth::Capability`]'s variants,
    /// e.g. `"can_cancel"`, `"can_inject"`.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Catalog names this account moderates (§3 Principal.Moderates).
    #[serde(default)]
    pub moderates: Vec<String>,
}

impl ServerConfig {
    /// Parse a [`ServerConfig`] from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// A minimal configuration suitable for tests: one plain-text reader
    /// listener bound to an ephemeral port, posting allowed, no TLS.
    pub fn test_default(addr: SocketAddr) -> Self {
        Self {
            hostname: "nntp.test.invalid".to_string(),
            implementation_name: default_implementation_name(),
            listeners: vec![ListenerConfig {
                addr,
                tls: TlsMode::Plain,
                allow_posting: true,
            }],
            tls_allowed_on_plain: false,
            cert_source: None,
            motd_path: None,
            distrib_patterns: Vec::new(),
            distributions: Vec::new(),
            accounts: Vec::new(),
            idle_timeout_secs: None,
        }
    }
}

fn default_implementation_name() -> String {
    "mcnttp".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let text = r#"
            hostname = "news.example.invalid"

            [[listeners]]
            addr = "0.0.0.0:119"
        "#;
        let config = ServerConfig::from_toml(text).unwrap();
        assert_eq!(config.hostname, "news.example.invalid");
        assert_eq!(config.listeners.len(), 1);
        assert_eq!(config.listeners[0].tls, TlsMode::Plain);
        assert!(config.listeners[0].allow_posting);
    }

    #[test]
    fn parses_self_signed_cert_source() {
        let text = r#"
            hostname = "news.example.invalid"

            [[listeners]]
            addr = "0.0.0.0:563"
            tls = "implicit"

            [cert_source]
            source = "self_signed"
        "#;
        let config = ServerConfig::from_toml(text).unwrap();
        assert!(matches!(config.cert_source, Some(CertSource::SelfSigned { .. })));
        assert_eq!(config.listeners[0].tls, TlsMode::Implicit);
    }
}
