//! Control-message grammar carried in the `Control` header (§4.6, RFC 5537 §5).
//!
//! Peering control verbs (`ihave`, `sendme`) are out of this server's scope
//! (peering is a stated Non-goal); only the four verbs the dispatcher acts
//! on are modeled.

/// A parsed `Control` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// `cancel <message-id>`
    Cancel { message_id: String },
    /// `newgroup <name> [moderated]`
    Newgroup { group: String, moderated: bool },
    /// `rmgroup <name>`
    Rmgroup { group: String },
    /// `checkgroups [scope] [#serial]`
    Checkgroups {
        scope: Option<String>,
        serial: Option<String>,
    },
    /// Any other control verb; gated the same as a missing capability.
    Unknown { verb: String },
}

impl ControlMessage {
    /// Parse the value of a `Control` header. Returns `None` only for an
    /// empty/whitespace-only header.
    pub fn parse(control: &str) -> Option<Self> {
        let control = control.trim();
        if control.is_empty() {
            return None;
        }
        let mut parts = control.split_whitespace();
        let verb = parts.next()?.to_ascii_lowercase();
        let rest: Vec<&str> = parts.collect();

        Some(match verb.as_str() {
            "cancel" => match rest.first() {
                Some(id) => ControlMessage::Cancel {
                    message_id: (*id).to_string(),
                },
                None => ControlMessage::Unknown { verb },
            },
            "newgroup" => match rest.first() {
                Some(group) => ControlMessage::Newgroup {
                    group: (*group).to_string(),
                    moderated: rest
                        .get(1)
                        .is_some_and(|s| s.eq_ignore_ascii_case("moderated")),
                },
                None => ControlMessage::Unknown { verb },
            },
            "rmgroup" => match rest.first() {
                Some(group) => ControlMessage::Rmgroup {
                    group: (*group).to_string(),
                },
                None => ControlMessage::Unknown { verb },
            },
            "checkgroups" => {
                let scope = rest
                    .first()
                    .filter(|s| !s.starts_with('#'))
                    .map(|s| (*s).to_string());
                let serial = rest
                    .iter()
                    .find(|s| s.starts_with('#'))
                    .map(|s| (*s).to_string());
                ControlMessage::Checkgroups { scope, serial }
            }
            _ => ControlMessage::Unknown { verb },
        })
    }

    /// The capability name the dispatcher should gate this verb against.
    pub fn required_capability(&self) -> &'static str {
        match self {
            ControlMessage::Cancel { .. } => "cancel",
            ControlMessage::Newgroup { .. } => "create_catalogs",
            ControlMessage::Rmgroup { .. } => "delete_catalogs",
            ControlMessage::Checkgroups { .. } => "check_catalogs",
            ControlMessage::Unknown { .. } => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cancel() {
        assert_eq!(
            ControlMessage::parse("cancel <spam@example.com>"),
            Some(ControlMessage::Cancel {
                message_id: "<spam@example.com>".to_string()
            })
        );
    }

    #[test]
    fn parses_newgroup_with_moderated_flag() {
        assert_eq!(
            ControlMessage::parse("newgroup misc.test moderated"),
            Some(ControlMessage::Newgroup {
                group: "misc.test".to_string(),
                moderated: true
            })
        );
        assert_eq!(
            ControlMessage::parse("newgroup misc.test"),
            Some(ControlMessage::Newgroup {
                group: "misc.test".to_string(),
                moderated: false
            })
        );
    }

    #[test]
    fn parses_rmgroup() {
        assert_eq!(
            ControlMessage::parse("rmgroup misc.test"),
            Some(ControlMessage::Rmgroup {
                group: "misc.test".to_string()
            })
        );
    }

    #[test]
    fn parses_checkgroups_with_scope_and_serial() {
        assert_eq!(
            ControlMessage::parse("checkgroups misc.* #123"),
            Some(ControlMessage::Checkgroups {
                scope: Some("misc.*".to_string()),
                serial: Some("#123".to_string()),
            })
        );
    }

    #[test]
    fn unknown_verb_is_preserved() {
        assert_eq!(
            ControlMessage::parse("ihave <a@b>"),
            Some(ControlMessage::Unknown {
                verb: "ihave".to_string()
            })
        );
    }

    #[test]
    fn empty_control_header_is_none() {
        assert_eq!(ControlMessage::parse("   "), None);
    }
}
