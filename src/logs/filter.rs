use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use crate::domain::{TimeRange, TIMESTAMP_FORMAT};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Log file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid log pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("No files found matching pattern: {pattern}")]
    NoMatches { pattern: String },

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the `--log` argument to a list of files.
///
/// A pattern containing glob metacharacters is expanded and sorted so
/// multi-file runs are deterministic; a plain path must exist.
pub fn expand_log_pattern(pattern: &str) -> Result<Vec<PathBuf>, LogError> {
    if pattern.contains(['*', '?', '[']) {
        let matches = glob::glob(pattern).map_err(|source| LogError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let mut files: Vec<PathBuf> = matches.filter_map(|entry| entry.ok()).collect();
        files.sort();

        if files.is_empty() {
            return Err(LogError::NoMatches {
                pattern: pattern.to_string(),
            });
        }
        Ok(files)
    } else {
        let path = PathBuf::from(pattern);
        if !path.exists() {
            return Err(LogError::NotFound { path });
        }
        Ok(vec![path])
    }
}

/// Read a log file, tolerating the encodings Windows AV products emit.
///
/// UTF-16 is detected by BOM; anything else is treated as UTF-8 with a
/// lossy fallback so a stray byte never aborts the run.
pub fn read_log_text(path: &Path) -> Result<String, LogError> {
    let bytes = std::fs::read(path).map_err(|source| LogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_bytes(&bytes))
}

fn decode_bytes(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        decode_utf16(&bytes[2..], u16::from_le_bytes)
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        decode_utf16(&bytes[2..], u16::from_be_bytes)
    } else {
        match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

fn decode_utf16(bytes: &[u8], read_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| read_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Filter one file down to the non-comment lines inside the window.
pub fn filter_log_lines(path: &Path, range: &TimeRange) -> Result<Vec<String>, LogError> {
    let content = read_log_text(path)?;
    Ok(filter_lines(&content, range))
}

/// Keep non-comment lines whose leading timestamp lies in the
/// inclusive range, preserving file order. Lines without a parseable
/// timestamp are dropped, never fatal.
pub fn filter_lines(content: &str, range: &TimeRange) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| parse_line_timestamp(line).map(|ts| (line, ts)))
        .filter(|(_, ts)| range.contains(*ts))
        .map(|(line, _)| line.trim().to_string())
        .collect()
}

/// Parse a leading timestamp in either the plain form
/// `YYYY-MM-DD HH:MM:SS` or the ISO form `YYYY-MM-DDTHH:MM:SS.mmm`.
fn parse_line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;

    let candidate = if first.contains('T') {
        // ISO form: strip fractional seconds, fold the T separator
        first.split('.').next()?.replace('T', " ")
    } else {
        let second = parts.next()?;
        format!("{first} {second}")
    };

    NaiveDateTime::parse_from_str(&candidate, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::new(
            NaiveDateTime::parse_from_str(start, TIMESTAMP_FORMAT).unwrap(),
            NaiveDateTime::parse_from_str(end, TIMESTAMP_FORMAT).unwrap(),
        )
    }

    #[test]
    fn test_comment_lines_excluded_regardless_of_range() {
        let content = "2025-01-01 10:00:00 EICAR detected\n\
                       # comment 2025-01-01 11:00:00\n";
        let result = filter_lines(content, &range("2025-01-01 10:00:00", "2025-01-01 12:00:00"));
        assert_eq!(result, vec!["2025-01-01 10:00:00 EICAR detected".to_string()]);
    }

    #[test]
    fn test_inverted_range_yields_empty_set() {
        let content = "2025-01-01 11:00:00 Trojan.Generic quarantined\n";
        let result = filter_lines(content, &range("2025-01-01 12:00:00", "2025-01-01 10:00:00"));
        assert!(result.is_empty());
    }

    #[test]
    fn test_in_range_lines_keep_file_order() {
        let content = "2025-01-01 09:00:00 too early\n\
                       2025-01-01 10:30:00 first hit\n\
                       2025-01-01 11:15:00 second hit\n\
                       2025-01-01 13:00:00 too late\n";
        let result = filter_lines(content, &range("2025-01-01 10:00:00", "2025-01-01 12:00:00"));
        assert_eq!(
            result,
            vec![
                "2025-01-01 10:30:00 first hit".to_string(),
                "2025-01-01 11:15:00 second hit".to_string(),
            ]
        );
    }

    #[test]
    fn test_boundary_timestamps_are_included() {
        let content = "2025-01-01 10:00:00 on start boundary\n\
                       2025-01-01 12:00:00 on end boundary\n";
        let result = filter_lines(content, &range("2025-01-01 10:00:00", "2025-01-01 12:00:00"));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_malformed_timestamps_are_dropped_not_fatal() {
        let content = "garbage line without timestamp\n\
                       2025-13-45 99:99:99 impossible date\n\
                       2025-01-01 10:30:00 valid detection\n";
        let result = filter_lines(content, &range("2025-01-01 10:00:00", "2025-01-01 12:00:00"));
        assert_eq!(result, vec!["2025-01-01 10:30:00 valid detection".to_string()]);
    }

    #[test]
    fn test_iso_timestamp_with_fraction_is_accepted() {
        let content = "2025-01-01T10:30:00.123 Worm.Blaster detected\n";
        let result = filter_lines(content, &range("2025-01-01 10:00:00", "2025-01-01 12:00:00"));
        assert_eq!(result, vec!["2025-01-01T10:30:00.123 Worm.Blaster detected".to_string()]);
    }

    #[test]
    fn test_utf16le_log_file_is_decoded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let text = "2025-01-01 10:30:00 Virus:EICAR-Test-File detected\n";
        let mut bytes: Vec<u8> = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        file.write_all(&bytes).unwrap();

        let result =
            filter_log_lines(file.path(), &range("2025-01-01 10:00:00", "2025-01-01 12:00:00"))
                .unwrap();
        assert_eq!(
            result,
            vec!["2025-01-01 10:30:00 Virus:EICAR-Test-File detected".to_string()]
        );
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_lossy() {
        let content = decode_bytes(b"2025-01-01 10:30:00 dropper \xFF detected\n");
        assert!(content.contains("2025-01-01 10:30:00 dropper"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = expand_log_pattern("/no/such/file.log");
        assert!(matches!(result, Err(LogError::NotFound { .. })));
    }

    #[test]
    fn test_glob_with_no_matches_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.log", dir.path().display());
        let result = expand_log_pattern(&pattern);
        assert!(matches!(result, Err(LogError::NoMatches { .. })));
    }

    #[test]
    fn test_glob_matches_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.log", "a.log", "c.log"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.log", dir.path().display());
        let files = expand_log_pattern(&pattern).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.log", "b.log", "c.log"]);
    }
}
