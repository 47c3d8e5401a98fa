use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The value stored at an `errors:<job-path>` key.
///
/// Writes always use the JSON form. Reads tolerate the legacy textual form
/// (`"<status>: <message>"`) for rollback safety, per the Open Question in
/// spec.md section 9 (see DESIGN.md for the rationale).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub status: u16,
    pub message: String,
    pub posted_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            posted_at: Utc::now(),
        }
    }

    /// Serialize to the wire format written to the lock store.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).expect("ErrorRecord always serializes")
    }

    /// Parse a raw value read from the lock store's `errors:` namespace.
    ///
    /// Tries JSON first; falls back to `"<digits>: <rest>"`; if neither
    /// parses, defaults to status 500 with the raw value as the message
    /// (matching spec.md 4.2's documented fallback for `get_error`).
    pub fn from_wire(raw: &str) -> Self {
        if let Ok(record) = serde_json::from_str::<ErrorRecord>(raw) {
            return record;
        }

        if let Some((status_str, message)) = raw.split_once(": ") {
            if let Ok(status) = status_str.trim().parse::<u16>() {
                return Self {
                    status,
                    message: message.to_string(),
                    posted_at: Utc::now(),
                };
            }
        }

        Self {
            status: 500,
            message: raw.to_string(),
            posted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let record = ErrorRecord::new(500, "broken");
        let wire = record.to_wire();
        let parsed = ErrorRecord::from_wire(&wire);
        assert_eq!(parsed.status, 500);
        assert_eq!(parsed.message, "broken");
    }

    #[test]
    fn reads_legacy_textual_form() {
        let parsed = ErrorRecord::from_wire("503: foo/bar/baz timed out");
        assert_eq!(parsed.status, 503);
        assert_eq!(parsed.message, "foo/bar/baz timed out");
    }

    #[test]
    fn defaults_to_500_when_unparseable() {
        let parsed = ErrorRecord::from_wire("not a known format");
        assert_eq!(parsed.status, 500);
        assert_eq!(parsed.message, "not a known format");
    }
}
