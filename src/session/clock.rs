use chrono::{DateTime, FixedOffset, Utc};

/// Gulf Standard Time: Asia/Dubai, UTC+04:00 year round
pub const REFERENCE_ZONE: &str = "GST";

const REFERENCE_OFFSET: FixedOffset = match FixedOffset::east_opt(4 * 3600) {
    Some(offset) => offset,
    None => panic!("UTC+4 is out of range"),
};

/// 24-hour `HH:MM:SS` wall clock in the reference zone
pub fn reference_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&REFERENCE_OFFSET)
        .format("%H:%M:%S")
        .to_string()
}
