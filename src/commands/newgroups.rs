//! `NEWGROUPS` (§4.4): catalogs created at or after a given instant.

use crate::error::Result;
use crate::response::Reply;
use crate::session::Session;

use super::parse_since;

/// `NEWGROUPS YYMMDD|YYYYMMDD HHMMSS [GMT]`.
pub async fn newgroups(session: &mut Session, arg: &str) -> Result<Reply> {
    let mut tokens = arg.split_whitespace();
    let date = tokens
        .next()
        .ok_or_else(|| crate::error::NntpError::Syntax("NEWGROUPS requires a date".to_string()))?;
    let time = tokens
        .next()
        .ok_or_else(|| crate::error::NntpError::Syntax("NEWGROUPS requires a time".to_string()))?;
    let since = parse_since(date, time)?;

    let catalogs = session
        .store
        .list_catalogs(None, &session.principal)
        .await
        .map_err(|e| crate::error::NntpError::StoreUnavailable(e.to_string()))?;

    let lines = catalogs
        .into_iter()
        .filter(|c| c.create_date >= since)
        .map(|c| c.name)
        .collect();
    Ok(Reply::multiline(231, "List of new newsgroups follows", lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_session_with_group;

    #[tokio::test]
    async fn reports_catalog_created_after_epoch() {
        let mut session = test_session_with_group("misc.test").await;
        let reply = newgroups(&mut session, "19700101 000000 GMT").await.unwrap();
        assert_eq!(reply.lines, Some(vec!["misc.test".to_string()]));
    }

    #[tokio::test]
    async fn future_cutoff_reports_nothing() {
        let mut session = test_session_with_group("misc.test").await;
        let reply = newgroups(&mut session, "99991231 235959").await.unwrap();
        assert_eq!(reply.lines, Some(Vec::new()));
    }

    #[tokio::test]
    async fn malformed_date_is_syntax_error() {
        let mut session = test_session_with_group("misc.test").await;
        let err = newgroups(&mut session, "notadate 000000").await.unwrap_err();
        assert_eq!(err.response_code(), Some(501));
    }
}
