//! `AUTHINFO USER`/`AUTHINFO PASS` (§4.4).

use crate::auth::{self, Capability};
use crate::error::{NntpError, Result};
use crate::response::Reply;
use crate::session::{Session, SessionState};

/// `AUTHINFO USER <name>`: stash the username and wait for `PASS`.
pub fn user(session: &mut Session, arg: &str) -> Result<Reply> {
    let username = arg.trim();
    if username.is_empty() {
        return Err(NntpError::Syntax("AUTHINFO USER requires a name".to_string()));
    }
    session.state = SessionState::Authenticating {
        username: username.to_string(),
    };
    Ok(Reply::single(381, "More authentication information required"))
}

/// `AUTHINFO PASS <secret>`: verify against the username stashed by a
/// prior `AUTHINFO USER`. Rejects a `LocalAuthenticationOnly` account
/// connecting from a non-loopback address the same as a bad password.
pub fn pass(session: &mut Session, arg: &str) -> Result<Reply> {
    let SessionState::Authenticating { username } = session.state.clone() else {
        return Err(NntpError::AuthSequence);
    };
    let secret = arg.trim();

    let principal = auth::authenticate(&session.config, &username, secret)
        .ok_or_else(|| NntpError::AuthFailed("invalid credentials".to_string()))?;

    if principal.has(Capability::LocalAuthenticationOnly) && !session.peer_addr.ip().is_loopback()
    {
        session.state = SessionState::Command;
        return Err(NntpError::AuthFailed(
            "account restricted to local connections".to_string(),
        ));
    }

    session.principal = principal;
    session.state = SessionState::Command;
    Ok(Reply::single(281, "Authentication accepted"))
}
