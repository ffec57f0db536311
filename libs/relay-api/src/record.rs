use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// One immutable entry in a topic.
///
/// `sequence` starts at 1 and is never reused within a topic, even after the
/// record has been evicted. The bus hands out records behind `Arc`, so
/// readers observe them without copying the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    pub content: T,
    pub sequence: u64,
    /// Creation time in milliseconds (Unix epoch).
    pub ts_ms: i64,
}

impl<T> Record<T> {
    pub fn new(content: T, sequence: u64) -> Self {
        Self {
            content,
            sequence,
            ts_ms: now_ms(),
        }
    }
}
