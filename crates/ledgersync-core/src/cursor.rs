//! Cursor representation for `server_modified`-keyed pagination.
//!
//! Spec §9 design note: the wire format accepts both `cursor` and `since`,
//! in either ISO-8601 or epoch-millis form, but only ever emits canonical
//! ISO-8601 from `next_cursor`. `Cursor` wraps a `chrono::DateTime<Utc>` and
//! keeps parsing permissive while rendering canonical.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque continuation token: the `server_modified` of the last
/// delivered item, or the epoch for "from the beginning".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(DateTime<Utc>);

impl Cursor {
    /// The cursor representing "no prior delivery" — pulls from the start
    /// of history.
    pub fn epoch() -> Self {
        Self(DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_else(|| Utc.timestamp_nanos(0)))
    }

    /// Build a cursor from a known instant (e.g. the clock's last tick).
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// The underlying instant.
    pub fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Cursor {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("cursor is empty".to_string());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }

        if let Ok(millis) = trimmed.parse::<i64>() {
            // Permissive: accept both epoch-seconds and epoch-millis by
            // magnitude, the way the source's timestamp fields are mixed.
            let dt = if trimmed.len() >= 13 {
                Utc.timestamp_millis_opt(millis).single()
            } else {
                Utc.timestamp_opt(millis, 0).single()
            };
            return dt
                .map(Self)
                .ok_or_else(|| format!("epoch value out of range: {millis}"));
        }

        Err(format!("unrecognized cursor format: {trimmed}"))
    }
}
