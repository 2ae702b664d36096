//! Shared helpers and constants.

use chrono::{SecondsFormat, Utc};

pub const APP_NAME: &str = "ramify_backend";

/// Content stored in place of a tombstoned comment's text.
pub const DELETED_PLACEHOLDER: &str = "[deleted]";

/// Author label used by the full-tree projection when the author is gone.
pub const UNKNOWN_AUTHOR: &str = "[unknown]";

/// Fixed-width RFC 3339 timestamp, so lexical order matches time order.
pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn print_banner() {
    println!("{APP_NAME} v{}", env!("CARGO_PKG_VERSION"));
}
