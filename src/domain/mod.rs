pub mod detection;

pub use detection::{Detection, ExtractionOutcome, TimeRange, TIMESTAMP_FORMAT};
