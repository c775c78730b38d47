use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

/// Snapshots older than this are shown as expired
const CONTEXT_TTL_MINUTES: i64 = 15;

/// Serialized size above which a snapshot is flagged as large
const LARGE_CONTEXT_KB: f64 = 50.0;

/// What a relay reply does to the displayed context snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum ContextUpdate {
    Replace(Map<String, Value>),
    Clear,
    Keep,
}

impl ContextUpdate {
    /// Objects replace the snapshot, null or a missing value clears it,
    /// any other JSON type leaves it untouched.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => ContextUpdate::Clear,
            Some(Value::Object(map)) => ContextUpdate::Replace(map.clone()),
            Some(_) => ContextUpdate::Keep,
        }
    }
}

/// Raw member context returned by the backend, kept verbatim for inspection
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    pub data: Map<String, Value>,
    pub received_at: DateTime<Utc>,
}

impl ContextSnapshot {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data,
            received_at: Utc::now(),
        }
    }

    fn count(&self, key: &str) -> usize {
        self.data
            .get(key)
            .and_then(|v| v.as_array())
            .map(|a| a.len())
            .unwrap_or(0)
    }

    pub fn offers(&self) -> usize {
        self.count("offers")
    }

    pub fn campaigns(&self) -> usize {
        self.count("campaigns")
    }

    pub fn point_accounts(&self) -> usize {
        self.count("point_accounts")
    }

    pub fn audit_logs(&self) -> usize {
        self.count("recent_activity")
    }

    pub fn timeline_events(&self) -> usize {
        self.count("timeline")
    }

    /// Serialized size in kilobytes
    pub fn size_kb(&self) -> f64 {
        let bytes = serde_json::to_vec(&self.data).map(|v| v.len()).unwrap_or(0);
        bytes as f64 / 1024.0
    }

    pub fn is_large(&self) -> bool {
        self.size_kb() > LARGE_CONTEXT_KB
    }

    pub fn expires_in_at(&self, now: DateTime<Utc>) -> Duration {
        let remaining = self.received_at + Duration::minutes(CONTEXT_TTL_MINUTES) - now;
        remaining.max(Duration::zero())
    }

    pub fn expires_in(&self) -> Duration {
        self.expires_in_at(Utc::now())
    }

    /// One-line summary of the counts
    pub fn summary_line(&self) -> String {
        format!(
            "Offers: {} | Campaigns: {} | Point Accounts: {} | Audit Logs: {} | Timeline Events: {}",
            self.offers(),
            self.campaigns(),
            self.point_accounts(),
            self.audit_logs(),
            self.timeline_events()
        )
    }

    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.data).unwrap_or_default()
    }
}

pub fn format_ttl(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{}m {}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> ContextSnapshot {
        match value {
            Value::Object(map) => ContextSnapshot::new(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_context_update_from_value() {
        assert_eq!(ContextUpdate::from_value(None), ContextUpdate::Clear);
        assert_eq!(ContextUpdate::from_value(Some(&Value::Null)), ContextUpdate::Clear);
        assert_eq!(ContextUpdate::from_value(Some(&json!([1, 2]))), ContextUpdate::Keep);
        assert_eq!(ContextUpdate::from_value(Some(&json!("text"))), ContextUpdate::Keep);
        assert!(matches!(
            ContextUpdate::from_value(Some(&json!({"offers": []}))),
            ContextUpdate::Replace(_)
        ));
    }

    #[test]
    fn test_counts_ignore_non_arrays() {
        let ctx = snapshot(json!({
            "offers": [1, 2, 3],
            "campaigns": "n/a",
            "recent_activity": [{}],
            "timeline": []
        }));
        assert_eq!(ctx.offers(), 3);
        assert_eq!(ctx.campaigns(), 0);
        assert_eq!(ctx.point_accounts(), 0);
        assert_eq!(ctx.audit_logs(), 1);
        assert_eq!(
            ctx.summary_line(),
            "Offers: 3 | Campaigns: 0 | Point Accounts: 0 | Audit Logs: 1 | Timeline Events: 0"
        );
    }

    #[test]
    fn test_large_snapshot_flag() {
        let small = snapshot(json!({"offers": []}));
        assert!(!small.is_large());

        let big = snapshot(json!({"blob": "x".repeat(60 * 1024)}));
        assert!(big.is_large());
    }

    #[test]
    fn test_ttl_counts_down_to_zero() {
        let ctx = snapshot(json!({}));
        let later = ctx.received_at + Duration::minutes(5);
        assert_eq!(format_ttl(ctx.expires_in_at(later)), "10m 0s");

        let much_later = ctx.received_at + Duration::hours(1);
        assert_eq!(ctx.expires_in_at(much_later), Duration::zero());
    }
}
