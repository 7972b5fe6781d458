//! `POST` (§4.4, §4.5 entry point): begins the posting continuation.
//!
//! Accumulating the body and running the acceptance pipeline once the
//! terminator arrives is [`crate::post_pipeline`]'s job; this module only
//! covers the preconditions and the `340` that hands control to it.

use crate::error::{NntpError, Result};
use crate::response::Reply;
use crate::session::Session;

/// `POST`: enter the posting continuation if this connection allows it.
pub fn post(session: &mut Session) -> Result<Reply> {
    if !session.allow_posting {
        return Err(NntpError::PostingForbidden);
    }
    session.start_posting();
    Ok(Reply::single(340, "Send article to be posted"))
}
