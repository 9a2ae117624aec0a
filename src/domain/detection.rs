use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used both in log lines and in the model's output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inclusive time window over naive local timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// True when the window can never match (start after end).
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Inclusive on both ends.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// One malware detection as reported by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Detection {
    pub signature: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl Detection {
    pub fn with_source(mut self, source_file: String) -> Self {
        self.source_file = Some(source_file);
        self
    }
}

/// Result of post-processing one model reply. The model's output is
/// best-effort: when no JSON array can be recovered the raw text is
/// kept so the caller can still show it to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Parsed(Vec<Detection>),
    Unparsed(String),
}
