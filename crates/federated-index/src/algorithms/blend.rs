//! Blended display time for hydrated notifications.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::parse_timestamp;

/// Earlier of the recorded time and the item's own `createdAt`.
///
/// A missing or unparsable time on either side leaves the other one; with
/// neither the result is `None`.
pub fn blended_created_at(
    recorded: Option<DateTime<Utc>>,
    item: Option<&Value>,
) -> Option<DateTime<Utc>> {
    let authored = item
        .and_then(|v| v.get("createdAt"))
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    match (recorded, authored) {
        (Some(recorded), Some(authored)) => Some(recorded.min(authored)),
        (recorded, authored) => recorded.or(authored),
    }
}
