pub mod filter;

pub use filter::{expand_log_pattern, filter_log_lines, read_log_text, LogError};
