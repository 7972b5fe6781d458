//! `STARTTLS` (§4.4): precondition check only.
//!
//! The `382` reply and the handshake itself must happen in that order with
//! nothing else interleaved, so the listener's run loop performs those two
//! steps directly around a call to this precheck rather than folding them
//! into the uniform "dispatch computes a `Reply`" pattern every other
//! command uses.

use crate::error::{NntpError, Result};
use crate::session::Session;

/// `true` if STARTTLS may be offered at all right now: TLS allowed on this
/// connection and not already active (used by `CAPABILITIES` too).
pub fn is_available(session: &Session) -> bool {
    session.tls_allowed && !session.tls_active
}

/// Reject `STARTTLS` outright if the socket is already secured.
pub fn precheck(session: &Session) -> Result<()> {
    if session.tls_active {
        return Err(NntpError::CommandUnavailable(
            "connection is already using TLS".to_string(),
        ));
    }
    if !session.tls_allowed {
        return Err(NntpError::CommandUnavailable(
            "TLS is not offered on this connection".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_session;

    #[test]
    fn precheck_rejects_when_tls_not_allowed() {
        let session = test_session();
        assert!(precheck(&session).is_err());
    }

    #[test]
    fn is_available_matches_precheck_success() {
        let mut session = test_session();
        session.tls_allowed = true;
        assert!(is_available(&session));
        assert!(precheck(&session).is_ok());
    }
}
