//! Message-type naming rules.
//!
//! Handler names follow `onMsg` + PascalCase type (`onMsgParamChanged`).
//! Incoming types are matched case- and delimiter-insensitively, so
//! `param_changed`, `paramChanged` and `PARAM_CHANGED` all share the key
//! `paramchanged`.

/// Prefix marking a handler name.
pub const HANDLER_PREFIX: &str = "onMsg";

/// Normalize a message type to its routing key.
pub fn normalize_type(msg_type: &str) -> String {
    msg_type
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | '.') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Derive the routing key for a handler name.
///
/// `onMsgAnswer` -> `answer`. Names without the prefix are taken as plain
/// message types. Returns `None` when nothing is left to route on.
pub fn handler_type(name: &str) -> Option<String> {
    let rest = name.strip_prefix(HANDLER_PREFIX).unwrap_or(name);
    let key = normalize_type(rest);
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
