//! Principal identity and capability model (§3, §9 redesign flag).
//!
//! The original design discussed in §9 modeled identities as a class
//! hierarchy (anonymous, local, peer, administrator). We follow the
//! redesign flag's guidance and use a single [`Principal`] struct carrying
//! a tagged set of capability flags instead, so gating a command is always
//! "does this principal have capability X", never a downcast.

mod password;

pub use password::{hash_password, verify_password};

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::config::{AccountEntry, ServerConfig};

/// Named capabilities a session's identity may hold (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CanApproveAny,
    CanCancel,
    CanCreateCatalogs,
    CanDeleteCatalogs,
    CanCheckCatalogs,
    CanInject,
    LocalAuthenticationOnly,
}

impl Capability {
    /// Parse one [`AccountEntry::capabilities`] entry. Unrecognized names
    /// are reported to the caller rather than silently ignored, since a
    /// typo in a config file should be loud.
    fn from_config_name(name: &str) -> Option<Self> {
        match name {
            "can_approve_any" => Some(Capability::CanApproveAny),
            "can_cancel" => Some(Capability::CanCancel),
            "can_create_catalogs" => Some(Capability::CanCreateCatalogs),
            "can_delete_catalogs" => Some(Capability::CanDeleteCatalogs),
            "can_check_catalogs" => Some(Capability::CanCheckCatalogs),
            "can_inject" => Some(Capability::CanInject),
            "local_authentication_only" => Some(Capability::LocalAuthenticationOnly),
            _ => None,
        }
    }
}

/// The authenticated (or anonymous) identity attached to a session.
///
/// Lives for the duration of one session (§3, Lifecycles); a fresh
/// `Principal::anonymous()` is installed at connection start and replaced
/// wholesale on successful `AUTHINFO PASS`.
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: Option<String>,
    pub mailbox: Option<String>,
    capabilities: HashSet<Capability>,
    moderates: HashSet<String>,
}

impl Principal {
    /// The identity attached to a session before any successful
    /// authentication: no capabilities, no moderated catalogs.
    pub fn anonymous() -> Self {
        Self {
            username: None,
            mailbox: None,
            capabilities: HashSet::new(),
            moderates: HashSet::new(),
        }
    }

    /// Build an authenticated principal with an explicit capability set.
    pub fn authenticated(
        username: impl Into<String>,
        mailbox: Option<String>,
        capabilities: impl IntoIterator<Item = Capability>,
        moderates: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            mailbox,
            capabilities: capabilities.into_iter().collect(),
            moderates: moderates.into_iter().collect(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// `true` if this principal may approve articles in `catalog`, either
    /// globally (`CanApproveAny`) or because it moderates that catalog.
    pub fn can_approve(&self, catalog: &str) -> bool {
        self.has(Capability::CanApproveAny) || self.moderates.contains(catalog)
    }

    /// The identity string used as `Approved:` when approving on behalf of
    /// a moderator with no explicit mailbox, per §4.5 step 5.
    pub fn approval_identity(&self, path_host: &str) -> String {
        match &self.mailbox {
            Some(mailbox) => mailbox.clone(),
            None => format!(
                "{}@{}",
                self.username.as_deref().unwrap_or("anonymous"),
                path_host
            ),
        }
    }

    /// The capability a control-message verb requires, resolved against
    /// this principal; used by the control-message handler (§4.6).
    pub fn capability_for_verb(&self, verb: &str) -> bool {
        match verb {
            "cancel" => self.has(Capability::CanCancel),
            "create_catalogs" => self.has(Capability::CanCreateCatalogs),
            "delete_catalogs" => self.has(Capability::CanDeleteCatalogs),
            "check_catalogs" => self.has(Capability::CanCheckCatalogs),
            _ => false,
        }
    }
}

/// Verify `username`/`secret` against `config`'s local account list
/// (`AUTHINFO PASS`, §4.4) and build the resulting [`Principal`] on success.
///
/// LDAP-backed authentication is an external collaborator (`spec.md` §1);
/// this is the one credential source the core ships, gated the same way
/// [`password::verify_password`] is tested: salted SHA-512, base64-encoded.
pub fn authenticate(config: &ServerConfig, username: &str, secret: &str) -> Option<Principal> {
    let account: &AccountEntry = config
        .accounts
        .iter()
        .find(|a| a.username == username)?;
    let salt = STANDARD.decode(&account.salt).ok()?;
    if !password::verify_password(&salt, secret, &account.password_hash) {
        return None;
    }
    let capabilities = account
        .capabilities
        .iter()
        .filter_map(|name| Capability::from_config_name(name));
    Some(Principal::authenticated(
        account.username.clone(),
        account.mailbox.clone(),
        capabilities,
        account.moderates.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_capabilities() {
        let p = Principal::anonymous();
        assert!(p.is_anonymous());
        assert!(!p.has(Capability::CanInject));
        assert!(!p.can_approve("misc.test"));
    }

    #[test]
    fn moderator_can_approve_only_their_catalog() {
        let p = Principal::authenticated(
            "mod1",
            None,
            [],
            ["misc.test".to_string()],
        );
        assert!(p.can_approve("misc.test"));
        assert!(!p.can_approve("misc.other"));
    }

    #[test]
    fn global_approver_can_approve_anything() {
        let p = Principal::authenticated("admin", None, [Capability::CanApproveAny], []);
        assert!(p.can_approve("anything.at.all"));
    }

    #[test]
    fn approval_identity_falls_back_to_username_at_path_host() {
        let p = Principal::authenticated("mod1", None, [], []);
        assert_eq!(p.approval_identity("news.example"), "mod1@news.example");
    }

    fn account_with_password(secret: &str) -> AccountEntry {
        let salt = b"fixed-test-salt";
        AccountEntry {
            username: "alice".to_string(),
            salt: STANDARD.encode(salt),
            password_hash: password::hash_password(salt, secret),
            mailbox: Some("alice@news.example".to_string()),
            capabilities: vec!["can_cancel".to_string()],
            moderates: vec!["misc.test".to_string()],
        }
    }

    #[test]
    fn authenticate_accepts_matching_credentials() {
        let mut config = ServerConfig::test_default("127.0.0.1:0".parse().unwrap());
        config.accounts.push(account_with_password("hunter2"));
        let principal = authenticate(&config, "alice", "hunter2").unwrap();
        assert!(principal.has(Capability::CanCancel));
        assert!(principal.can_approve("misc.test"));
    }

    #[test]
    fn authenticate_rejects_wrong_password() {
        let mut config = ServerConfig::test_default("127.0.0.1:0".parse().unwrap());
        config.accounts.push(account_with_password("hunter2"));
        assert!(authenticate(&config, "alice", "wrong").is_none());
    }

    #[test]
    fn authenticate_rejects_unknown_user() {
        let config = ServerConfig::test_default("127.0.0.1:0".parse().unwrap());
        assert!(authenticate(&config, "nobody", "x").is_none());
    }
}
