//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way it is persisted in attached fields (RFC 3339, millisecond precision)
pub fn to_storage_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a persisted timestamp back into UTC
///
/// Returns None for anything that is not RFC 3339.
pub fn from_storage_string(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_storage_string_keeps_millis() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T10:20:30.456Z")
            .unwrap()
            .with_timezone(&Utc);
        let s = to_storage_string(ts);
        assert_eq!(s, "2024-03-01T10:20:30.456Z");
        assert_eq!(from_storage_string(&s), Some(ts));
    }

    #[test]
    fn test_from_storage_string_rejects_garbage() {
        assert!(from_storage_string("2024-03-01 10:20:30").is_none());
        assert!(from_storage_string("").is_none());
    }
}
