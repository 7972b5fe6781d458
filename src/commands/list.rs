//! `LIST` (§4.4): dispatches by keyword to one of several catalog-metadata
//! and configuration listings.

use crate::error::{NntpError, Result};
use crate::response::Reply;
use crate::session::Session;
use crate::store::Catalog;

use super::overview::overview_fmt_lines;

/// Header names `HDR`/`XHDR` can retrieve (§3's required/optional list),
/// as enumerated by `LIST HEADERS`.
const SUPPORTED_HEADERS: &[&str] = &[
    "Date",
    "From",
    "Newsgroups",
    "Subject",
    "Message-ID",
    "Path",
    "Approved",
    "Archive",
    "Content-Disposition",
    "Content-Language",
    "Content-Transfer-Encoding",
    "Content-Type",
    "Control",
    "Distribution",
    "Expires",
    "Followup-To",
    "Injection-Date",
    "Injection-Info",
    "MIME-Version",
    "Organization",
    "References",
    "Summary",
    "Supersedes",
    "User-Agent",
    "Xref",
];

/// `LIST [keyword [argument]]`.
pub async fn list(session: &mut Session, arg: &str) -> Result<Reply> {
    let mut parts = arg.trim().splitn(2, char::is_whitespace);
    let keyword = parts.next().filter(|s| !s.is_empty());
    let rest = parts.next().unwrap_or("").trim();

    match keyword.map(str::to_ascii_uppercase).as_deref() {
        None | Some("ACTIVE") => active(session, rest).await,
        Some("ACTIVE.TIMES") => active_times(session, rest).await,
        Some("NEWSGROUPS") => newsgroups(session, rest).await,
        Some("OVERVIEW.FMT") => Ok(Reply::multiline(
            215,
            "Order of fields in overview database",
            overview_fmt_lines(),
        )),
        Some("DISTRIB.PATS") => Ok(distrib_pats(session)),
        Some("DISTRIBUTIONS") => distributions(session, rest),
        Some("HEADERS") => Ok(Reply::multiline(
            215,
            "Headers supported by HDR/XHDR",
            SUPPORTED_HEADERS.iter().map(|h| h.to_string()).collect(),
        )),
        Some("MOTD") => motd(session).await,
        Some(other) => Err(NntpError::Syntax(format!("unsupported LIST keyword: {other}"))),
    }
}

/// Status byte for `LIST ACTIVE` (§4.4): `m` if moderated, else `n` if
/// posting is impossible by any route, else `x`/`j` for one-sided denial,
/// else `y`.
fn active_status(catalog: &Catalog) -> char {
    if catalog.moderated {
        'm'
    } else if catalog.deny_local_posting && catalog.deny_peer_posting {
        'n'
    } else if catalog.deny_peer_posting {
        'x'
    } else if catalog.deny_local_posting {
        'j'
    } else {
        'y'
    }
}

async fn active(session: &Session, wildmat_arg: &str) -> Result<Reply> {
    let wildmat = (!wildmat_arg.is_empty()).then_some(wildmat_arg);
    let catalogs = session
        .store
        .list_catalogs(wildmat, &session.principal)
        .await
        .map_err(|e| NntpError::StoreUnavailable(e.to_string()))?;
    let lines = catalogs
        .iter()
        .map(|c| {
            format!(
                "{} {} {} {}",
                c.name,
                c.high_watermark,
                c.low_watermark,
                active_status(c)
            )
        })
        .collect();
    Ok(Reply::multiline(215, "List of newsgroups follows", lines))
}

async fn active_times(session: &Session, wildmat_arg: &str) -> Result<Reply> {
    let wildmat = (!wildmat_arg.is_empty()).then_some(wildmat_arg);
    let catalogs = session
        .store
        .list_catalogs(wildmat, &session.principal)
        .await
        .map_err(|e| NntpError::StoreUnavailable(e.to_string()))?;
    let lines = catalogs
        .iter()
        .map(|c| format!("{} {} {}", c.name, c.create_date.timestamp(), c.creator_entity))
        .collect();
    Ok(Reply::multiline(215, "Newsgroup creation times follow", lines))
}

async fn newsgroups(session: &Session, wildmat_arg: &str) -> Result<Reply> {
    let wildmat = (!wildmat_arg.is_empty()).then_some(wildmat_arg);
    let catalogs = session
        .store
        .list_catalogs(wildmat, &session.principal)
        .await
        .map_err(|e| NntpError::StoreUnavailable(e.to_string()))?;
    let lines = catalogs
        .iter()
        .map(|c| format!("{}\t{}", c.name, c.description))
        .collect();
    Ok(Reply::multiline(215, "Descriptions follow", lines))
}

fn distrib_pats(session: &Session) -> Reply {
    let lines = session
        .config
        .distrib_patterns
        .iter()
        .map(|p| format!("{}:{}:{}", p.weight, p.wildmat, p.distribution))
        .collect();
    Reply::multiline(215, "Distribution patterns follow", lines)
}

fn distributions(session: &Session, arg: &str) -> Result<Reply> {
    if !arg.is_empty() {
        return Err(NntpError::Syntax(
            "LIST DISTRIBUTIONS takes no argument".to_string(),
        ));
    }
    let lines = session
        .config
        .distributions
        .iter()
        .map(|d| format!("{} {}", d.name, d.description))
        .collect();
    Ok(Reply::multiline(215, "Distributions follow", lines))
}

async fn motd(session: &Session) -> Result<Reply> {
    let Some(path) = &session.config.motd_path else {
        return Err(NntpError::CommandUnavailable(
            "no MOTD configured".to_string(),
        ));
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| NntpError::StoreUnavailable(e.to_string()))?;
    let lines = text.lines().map(str::to_string).collect();
    Ok(Reply::multiline(215, "Message of the day follows", lines))
}
