//! `ARTICLE`/`HEAD`/`BODY`/`STAT` and `LAST`/`NEXT` (§4.4).

use crate::error::{NntpError, Result};
use crate::response::Reply;
use crate::session::Session;
use crate::store::{ArticleInCatalog, RowFlags};

/// Resolve an ARTICLE/HEAD/BODY/STAT argument to a stored row and the
/// article number that should appear in the reply line. Message-id
/// lookups always report the article's real catalog-local number, even
/// when no `GROUP` has been selected yet (§4.4, §8 scenarios 3-4):
/// unlike `OVER`/`XOVER`'s `:bytes` rule, there is no "0 unless current
/// catalog" carve-out here.
async fn resolve(session: &Session, arg: &str) -> Result<(u64, ArticleInCatalog)> {
    let arg = arg.trim();
    if arg.is_empty() {
        let catalog = session.current_catalog.clone().ok_or(NntpError::NoNewsgroup)?;
        let number = session.current_number.ok_or(NntpError::NoArticleNumber)?;
        let row = session
            .store
            .get_article(&catalog, number, RowFlags::default())
            .await
            .map_err(|_| NntpError::NoArticleInRange)?;
        Ok((number, row))
    } else if arg.starts_with('<') {
        let row = session
            .store
            .get_article_by_id(arg, &session.principal)
            .await
            .map_err(|_| NntpError::NoSuchMessageId(arg.to_string()))?;
        let number = row.number;
        Ok((number, row))
    } else {
        let catalog = session.current_catalog.clone().ok_or(NntpError::NoNewsgroup)?;
        let number: u64 = arg
            .parse()
            .map_err(|_| NntpError::Syntax(format!("invalid article number: {arg}")))?;
        let row = session
            .store
            .get_article(&catalog, number, RowFlags::default())
            .await
            .map_err(|_| NntpError::NoArticleInRange)?;
        Ok((number, row))
    }
}

/// Split a CRLF-joined block into individual lines, dropping one trailing
/// empty element produced by a trailing terminator.
fn split_crlf_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = text.split("\r\n").map(str::to_string).collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

pub async fn article(session: &mut Session, arg: &str) -> Result<Reply> {
    let (number, row) = resolve(session, arg).await?;
    if session.current_catalog.as_deref() == Some(row.catalog.as_str()) {
        session.current_number = Some(number);
    }
    let mut lines = split_crlf_lines(&row.article.raw_headers);
    lines.push(String::new());
    lines.extend(split_crlf_lines(&row.article.body));
    Ok(Reply::multiline(
        220,
        format!("{number} {}", row.article.headers.message_id),
        lines,
    ))
}

pub async fn head(session: &mut Session, arg: &str) -> Result<Reply> {
    let (number, row) = resolve(session, arg).await?;
    if session.current_catalog.as_deref() == Some(row.catalog.as_str()) {
        session.current_number = Some(number);
    }
    let lines = split_crlf_lines(&row.article.raw_headers);
    Ok(Reply::multiline(
        221,
        format!("{number} {}", row.article.headers.message_id),
        lines,
    ))
}

pub async fn body(session: &mut Session, arg: &str) -> Result<Reply> {
    let (number, row) = resolve(session, arg).await?;
    if session.current_catalog.as_deref() == Some(row.catalog.as_str()) {
        session.current_number = Some(number);
    }
    let lines = split_crlf_lines(&row.article.body);
    Ok(Reply::multiline(
        222,
        format!("{number} {}", row.article.headers.message_id),
        lines,
    ))
}

pub async fn stat(session: &mut Session, arg: &str) -> Result<Reply> {
    let (number, row) = resolve(session, arg).await?;
    if session.current_catalog.as_deref() == Some(row.catalog.as_str()) {
        session.current_number = Some(number);
    }
    Ok(Reply::single(
        223,
        format!("{number} {}", row.article.headers.message_id),
    ))
}

/// `LAST`: move the current article number to the greatest lower
/// non-cancelled, non-pending article number in the current catalog.
pub async fn last(session: &mut Session) -> Result<Reply> {
    step(session, Direction::Last).await
}

/// `NEXT`: move the current article number to the least greater
/// non-cancelled, non-pending article number in the current catalog.
pub async fn next(session: &mut Session) -> Result<Reply> {
    step(session, Direction::Next).await
}

enum Direction {
    Last,
    Next,
}

async fn step(session: &mut Session, direction: Direction) -> Result<Reply> {
    let catalog = session.current_catalog.clone().ok_or(NntpError::NoNewsgroup)?;
    let current = session.current_number.ok_or(NntpError::NoArticleNumber)?;

    let rows = session
        .store
        .range_articles(&catalog, 1, u64::MAX, RowFlags::default())
        .await
        .map_err(|e| NntpError::StoreUnavailable(e.to_string()))?;

    let found = match direction {
        Direction::Last => rows
            .iter()
            .filter(|r| r.number < current)
            .max_by_key(|r| r.number),
        Direction::Next => rows
            .iter()
            .filter(|r| r.number > current)
            .min_by_key(|r| r.number),
    };

    match found {
        Some(row) => {
            session.current_number = Some(row.number);
            Ok(Reply::single(
                223,
                format!("{} {}", row.number, row.article.headers.message_id),
            ))
        }
        None => Err(match direction {
            Direction::Last => NntpError::NoPrevArticle,
            Direction::Next => NntpError::NoNextArticle,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_session_with_group;

    async fn post(session: &Session, raw: &str) {
        crate::post_pipeline::accept_post(raw, &session.principal, &session.store, "x.invalid")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stat_by_number_after_post() {
        let mut session = test_session_with_group("misc.test").await;
        post(
            &session,
            "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nMessage-ID: <t1@x>\r\n\r\nbody\r\n",
        )
        .await;
        session.current_catalog = Some("misc.test".to_string());
        let reply = stat(&mut session, "1").await.unwrap();
        assert_eq!(reply.text, "1 <t1@x>");
    }

    #[tokio::test]
    async fn stat_by_message_id() {
        let mut session = test_session_with_group("misc.test").await;
        post(
            &session,
            "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nMessage-ID: <t2@x>\r\n\r\nbody\r\n",
        )
        .await;
        let reply = stat(&mut session, "<t2@x>").await.unwrap();
        assert_eq!(reply.text, "1 <t2@x>");
    }

    #[tokio::test]
    async fn next_then_last_is_identity() {
        let mut session = test_session_with_group("misc.test").await;
        post(
            &session,
            "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nMessage-ID: <t3@x>\r\n\r\nbody\r\n",
        )
        .await;
        post(
            &session,
            "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi2\r\nMessage-ID: <t4@x>\r\n\r\nbody\r\n",
        )
        .await;
        session.current_catalog = Some("misc.test".to_string());
        session.current_number = Some(1);
        next(&mut session).await.unwrap();
        assert_eq!(session.current_number, Some(2));
        last(&mut session).await.unwrap();
        assert_eq!(session.current_number, Some(1));
    }

    #[tokio::test]
    async fn next_at_boundary_errors_without_moving() {
        let mut session = test_session_with_group("misc.test").await;
        post(
            &session,
            "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nMessage-ID: <t5@x>\r\n\r\nbody\r\n",
        )
        .await;
        session.current_catalog = Some("misc.test".to_string());
        session.current_number = Some(1);
        assert!(next(&mut session).await.is_err());
        assert_eq!(session.current_number, Some(1));
    }

    #[tokio::test]
    async fn article_body_splits_into_lines() {
        let mut session = test_session_with_group("misc.test").await;
        post(
            &session,
            "From: a@b.invalid\r\nNewsgroups: misc.test\r\nSubject: hi\r\nMessage-ID: <t6@x>\r\n\r\nline one\r\nline two\r\n",
        )
        .await;
        session.current_catalog = Some("misc.test".to_string());
        let reply = body(&mut session, "1").await.unwrap();
        assert_eq!(
            reply.lines,
            Some(vec!["line one".to_string(), "line two".to_string()])
        );
    }
}
