/// All prompt text and fixed strings for sigscout
///
/// This module centralizes the extraction prompt so the CLI and the
/// LLM layer never embed their own copies

/// Fixed instruction sent with every request, for both providers.
pub const SYSTEM_PROMPT: &str = "\
You are a cybersecurity assistant. You receive raw antivirus log lines.
Extract every detected malware signature and the timestamp (YYYY-MM-DD HH:MM:SS)
when it was found.
Include every suspicious record: detections that were quarantined, deleted,
or merely reported.
Ignore operational events such as update, start, stop, restart, shutdown and pause!
Return only a JSON array where each element has keys:
- \"signature\": string (only the clear signature name, without \"Virus:\")
- \"timestamp\": string (same format)
If none were found, return an empty JSON array.
";

/// Section header inserted between files in batch mode.
pub fn file_header(path: &std::path::Path) -> String {
    format!("=== File: {} ===", path.display())
}
