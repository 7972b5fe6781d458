//! CommandDispatcher (§4.4, §9): one entry point per recognized verb.
//!
//! §9 describes the dispatch table as "a read-mostly mapping initialized
//! once; no mutation after startup." A `match` on the uppercased verb
//! compiles to exactly that (a jump table with no runtime mutation) without
//! needing a `HashMap` of boxed async function pointers, which the crate's
//! dependency stack has no `futures::BoxFuture` to make ergonomic on
//! stable Rust. `QUIT` and `STARTTLS` are handled by the listener's run
//! loop instead of here, since both need to do something other than
//! "compute one `Reply`" around the dispatch call (close the socket;
//! perform the TLS handshake between the `382` and the next read).

pub mod article;
pub mod authinfo;
pub mod group;
pub mod hdr;
pub mod list;
pub mod newgroups;
pub mod newnews;
pub mod overview;
pub mod post;
pub mod select;
pub mod starttls;
pub mod xpat;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{NntpError, Result};
use crate::response::Reply;
use crate::session::{Compression, Session};

/// Replace CR, LF, TAB and NUL with a single space everywhere a value is
/// folded onto one reply line (`HDR`/`OVER`/`XPAT`, §4.4).
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\r' | '\n' | '\t' | '\0' => ' ',
            other => other,
        })
        .collect()
}

/// Parse the `YYMMDD|YYYYMMDD HHMMSS [GMT]` timestamp `NEWGROUPS`/`NEWNEWS`
/// take. The `GMT` token and its absence are treated identically as UTC
/// (§9 Open Question: no timezone-database crate is in this stack to do
/// the "local-converted UTC" conversion the distilled spec names).
pub fn parse_since(date: &str, time: &str) -> Result<chrono::DateTime<Utc>> {
    let date = match date.len() {
        6 => format!("20{date}"),
        8 => date.to_string(),
        _ => return Err(NntpError::Syntax(format!("malformed date: {date}"))),
    };
    let naive_date = NaiveDate::parse_from_str(&date, "%Y%m%d")
        .map_err(|_| NntpError::Syntax(format!("malformed date: {date}")))?;
    let naive_time = NaiveTime::parse_from_str(time, "%H%M%S")
        .map_err(|_| NntpError::Syntax(format!("malformed time: {time}")))?;
    let naive = NaiveDateTime::new(naive_date, naive_time);
    Ok(Utc.from_utc_datetime(&naive))
}

/// `CAPABILITIES` (§4.4).
pub fn capabilities(session: &Session) -> Reply {
    let mut lines = vec![
        "VERSION 2".to_string(),
        "HDR".to_string(),
        "LIST ACTIVE NEWSGROUPS ACTIVE.TIMES DISTRIB.PATS HEADERS OVERVIEW.FMT".to_string(),
        "MODE-READER".to_string(),
        "NEWNEWS".to_string(),
        "OVER MSGID".to_string(),
        "POST".to_string(),
        "READER".to_string(),
    ];
    if starttls::is_available(session) {
        lines.push("STARTTLS".to_string());
    }
    lines.push("XFEATURE-COMPRESS GZIP TERMINATOR".to_string());
    lines.push(format!(
        "IMPLEMENTATION {} {}",
        session.config.implementation_name,
        env!("CARGO_PKG_VERSION")
    ));
    Reply::multiline(101, "Capability list:", lines)
}

/// `DATE` (§4.4): `111 yyyyMMddHHmmss` in UTC.
pub fn date() -> Reply {
    Reply::single(111, Utc::now().format("%Y%m%d%H%M%S").to_string())
}

/// `MODE READER` (§4.4).
pub fn mode(session: &Session, arg: &str) -> Result<Reply> {
    if !arg.trim().eq_ignore_ascii_case("READER") {
        return Err(NntpError::Syntax(format!("unsupported MODE: {arg}")));
    }
    let text = if session.allow_posting {
        "Posting allowed"
    } else {
        "Reader mode, posting prohibited"
    };
    Ok(Reply::single(200, text))
}

/// `XFEATURE COMPRESS GZIP TERMINATOR` (§6 Compression extension).
pub fn xfeature(session: &mut Session, arg: &str) -> Result<Reply> {
    let normalized = arg.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
    if normalized != "COMPRESS GZIP TERMINATOR" {
        return Err(NntpError::Syntax(format!("unsupported XFEATURE: {arg}")));
    }
    session.compression = Compression::GzipMultiline;
    Ok(Reply::single(290, "Compression enabled"))
}

/// Dispatch one already-split `(verb, rest-of-line)` pair to its handler.
/// `verb` must already be upper-cased; `QUIT` and `STARTTLS` are not
/// handled here (see module docs).
pub async fn dispatch(session: &mut Session, verb: &str, arg: &str) -> Result<Reply> {
    match verb {
        "CAPABILITIES" => Ok(capabilities(session)),
        "DATE" => Ok(date()),
        "MODE" => mode(session, arg),
        "GROUP" => group::group(session, arg).await,
        "LISTGROUP" => group::listgroup(session, arg).await,
        "LIST" => list::list(session, arg).await,
        "NEWGROUPS" => newgroups::newgroups(session, arg).await,
        "NEWNEWS" => newnews::newnews(session, arg).await,
        "ARTICLE" => article::article(session, arg).await,
        "HEAD" => article::head(session, arg).await,
        "BODY" => article::body(session, arg).await,
        "STAT" => article::stat(session, arg).await,
        "LAST" => article::last(session).await,
        "NEXT" => article::next(session).await,
        "HDR" => hdr::hdr(session, arg).await,
        "XHDR" => hdr::xhdr(session, arg).await,
        "OVER" => overview::over(session, arg).await,
        "XOVER" => overview::xover(session, arg).await,
        "XPAT" => xpat::xpat(session, arg).await,
        "POST" => post::post(session),
        "AUTHINFO" => authinfo_dispatch(session, arg),
        "XFEATURE" => xfeature(session, arg),
        other => Err(NntpError::UnknownCommand(other.to_string())),
    }
}

fn authinfo_dispatch(session: &mut Session, arg: &str) -> Result<Reply> {
    let mut parts = arg.splitn(2, char::is_whitespace);
    let sub = parts
        .next()
        .ok_or_else(|| NntpError::Syntax("AUTHINFO requires a subcommand".to_string()))?;
    let rest = parts.next().unwrap_or("").trim();
    match sub.to_ascii_uppercase().as_str() {
        "USER" => authinfo::user(session, rest),
        "PASS" => authinfo::pass(session, rest),
        other => Err(NntpError::Syntax(format!("unknown AUTHINFO subcommand: {other}"))),
    }
}
