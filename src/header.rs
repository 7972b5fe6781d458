//! Raw header-block parsing (§4.1).
//!
//! Parses the header block of a posted or stored article into an ordered
//! sequence of name/value pairs plus a case-insensitive lookup, preserving
//! the exact unfolded line for each header so an injection step can replace
//! it in place without disturbing anything else.

use std::collections::HashMap;

use crate::error::{NntpError, Result};

/// One header as parsed from the wire: its name, its folded-and-joined
/// value, and the original raw line(s) that produced it (still CRLF-less,
/// folded into one string with internal CRLFs preserved) so it can be
/// located and replaced verbatim in `RawHeaders`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
    pub raw_line: String,
}

/// A parsed header block: an ordered list (duplicates preserved in order)
/// plus a case-insensitive name -> first-value lookup.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<HeaderField>,
}

impl Headers {
    /// Parse a header block. `block` must not include the blank line that
    /// separates headers from body. Lines are expected to be `\r\n` or `\n`
    /// terminated; the final line need not be terminated.
    ///
    /// A line beginning with space or tab is folded into the previous
    /// header's value, its leading whitespace run collapsed to one space.
    /// Any non-fold line that doesn't match `name: value` fails with
    /// [`NntpError::Syntax`].
    pub fn parse(block: &str) -> Result<Self> {
        let mut fields: Vec<HeaderField> = Vec::new();

        for raw_line in split_lines(block) {
            if raw_line.is_empty() {
                continue;
            }
            let first = raw_line.as_bytes()[0];
            if first == b' ' || first == b'\t' {
                let Some(last) = fields.last_mut() else {
                    return Err(NntpError::Syntax(
                        "header continuation line with no preceding header".to_string(),
                    ));
                };
                let folded = raw_line.trim_start_matches([' ', '\t']);
                last.value.push(' ');
                last.value.push_str(folded);
                last.raw_line.push_str("\r\n");
                last.raw_line.push_str(raw_line);
                continue;
            }

            let colon = raw_line.find(':').ok_or_else(|| {
                NntpError::Syntax(format!("malformed header line: {raw_line:?}"))
            })?;
            let name = &raw_line[..colon];
            if name.is_empty() || !name.bytes().all(is_header_name_byte) {
                return Err(NntpError::Syntax(format!(
                    "malformed header name: {raw_line:?}"
                )));
            }
            // RFC requires ": " between name and value, but tolerate a bare
            // colon with no following space (commonly produced by strict
            // generators and accepted by real-world NNTP clients).
            let mut value_start = colon + 1;
            if raw_line.as_bytes().get(value_start) == Some(&b' ') {
                value_start += 1;
            }
            let value = raw_line[value_start..].to_string();

            fields.push(HeaderField {
                name: name.to_string(),
                value,
                raw_line: raw_line.to_string(),
            });
        }

        Ok(Self { fields })
    }

    /// Case-insensitive lookup of the first header with this name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    /// All header values matching `name`, case-insensitively, in order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.fields
            .iter()
            .filter(move |f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    /// The full ordered set of parsed fields.
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// Re-serialize the header block from the stored raw lines plus the
    /// given body, joined with CRLF and a trailing blank line separator.
    /// Used by the header-parser round-trip property (§8).
    pub fn reserialize(&self, body: &str) -> String {
        let mut out = String::new();
        for field in &self.fields {
            out.push_str(&field.raw_line);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    /// The header block alone (no trailing blank line, no body), joined
    /// with CRLF: the exact form stored as an [`Article`](crate::article::Article)'s
    /// `raw_headers`. Used by the injection step to rewrite `raw_headers`
    /// after mutating headers in place (§3, §4.5).
    pub fn raw_block(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.raw_line.as_str())
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Replace every occurrence of a header (case-insensitively) with a
    /// single new `name: value` line, appending it if it was absent.
    /// Used by the article-injection step (Injection-Date, Xref,
    /// Message-ID regeneration).
    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.fields.push(HeaderField {
            name: name.to_string(),
            value: value.to_string(),
            raw_line: format!("{name}: {value}"),
        });
    }

    /// Remove every occurrence of a header, case-insensitively.
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|f| !f.name.eq_ignore_ascii_case(name));
    }

    /// Collapse to a case-insensitive map of first-seen values, for callers
    /// that don't need duplicate/ordering fidelity.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for field in &self.fields {
            map.entry(field.name.to_ascii_lowercase())
                .or_insert_with(|| field.value.clone());
        }
        map
    }
}

fn is_header_name_byte(b: u8) -> bool {
    (0x21..=0x7e).contains(&b) && b != b':'
}

/// Split a header block into logical lines, tolerating both `\r\n` and
/// bare `\n` termination.
fn split_lines(block: &str) -> Vec<&str> {
    block
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}
