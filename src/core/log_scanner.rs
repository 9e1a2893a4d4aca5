/*
 * Scans a build log for texture compression failures. The build tool prints
 * the path of the file it is working on on a line of its own, followed, maybe
 * many lines later, by diagnostics for that file. The scanner remembers the
 * most recent path line and pairs it with every failure line that follows
 * until another path line supersedes it.
 *
 * The scanner is a plain iterator over one log text; all its state lives in
 * the iterator, so scanning the same text again starts from scratch.
 */
use crate::core::config::RecoveryConfig;
use serde::{Deserialize, Serialize};
use std::str::Lines;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub source_path: String,
    pub reason_text: String,
}

// The literals that drive line recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMarkers {
    pub path_prefixes: Vec<String>,
    pub failure_marker: String,
}

impl ScanMarkers {
    pub fn from_config(config: &RecoveryConfig) -> Self {
        ScanMarkers {
            path_prefixes: config.path_marker_prefixes.clone(),
            failure_marker: config.failure_marker.clone(),
        }
    }

    fn is_path_marker(&self, line: &str) -> bool {
        self.path_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && line.starts_with(prefix.as_str()))
    }

    fn is_failure_line(&self, line: &str) -> bool {
        !self.failure_marker.is_empty() && line.starts_with(self.failure_marker.as_str())
    }
}

pub struct LogScanner<'a> {
    lines: Lines<'a>,
    markers: &'a ScanMarkers,
    current_path: String,
}

impl<'a> LogScanner<'a> {
    // Lines are split on "\n" with an optional preceding "\r".
    pub fn new(log_text: &'a str, markers: &'a ScanMarkers) -> Self {
        LogScanner {
            lines: log_text.lines(),
            markers,
            current_path: String::new(),
        }
    }
}

impl Iterator for LogScanner<'_> {
    type Item = FailureRecord;

    fn next(&mut self) -> Option<FailureRecord> {
        for line in self.lines.by_ref() {
            if self.markers.is_path_marker(line) {
                self.current_path = line.to_string();
                continue;
            }
            if !self.current_path.is_empty() && self.markers.is_failure_line(line) {
                log::trace!(
                    "LogScanner: Failure for '{}': {}",
                    self.current_path,
                    line
                );
                return Some(FailureRecord {
                    source_path: self.current_path.clone(),
                    reason_text: line.to_string(),
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_FAILURE: &str =
        "Could not compress texture: PVRTC Compressed textures must be square";

    fn markers() -> ScanMarkers {
        ScanMarkers::from_config(&RecoveryConfig::default())
    }

    fn scan(text: &str) -> Vec<FailureRecord> {
        let markers = markers();
        LogScanner::new(text, &markers).collect()
    }

    #[test]
    fn test_failure_is_paired_with_earlier_path_line() {
        let log = format!("D:/x/tex.png\nnoise\n{SQUARE_FAILURE}");
        let records = scan(&log);
        assert_eq!(
            records,
            vec![FailureRecord {
                source_path: "D:/x/tex.png".to_string(),
                reason_text: SQUARE_FAILURE.to_string(),
            }]
        );
    }

    #[test]
    fn test_no_record_without_preceding_path_line() {
        let log = format!("Building content...\n{SQUARE_FAILURE}\nD:/x/late.png\nok");
        assert!(scan(&log).is_empty());
    }

    #[test]
    fn test_later_path_line_supersedes_current_path() {
        let log = format!(
            "D:/x/a.png\n{SQUARE_FAILURE}\nD:/x/b.jpg\nwarning: something\n{SQUARE_FAILURE}\n{SQUARE_FAILURE}"
        );
        let sources: Vec<String> = scan(&log).into_iter().map(|r| r.source_path).collect();
        assert_eq!(sources, vec!["D:/x/a.png", "D:/x/b.jpg", "D:/x/b.jpg"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let log = format!("D:/x/tex.png\r\n{SQUARE_FAILURE}\r\n");
        let records = scan(&log);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_path, "D:/x/tex.png");
        assert_eq!(records[0].reason_text, SQUARE_FAILURE);
    }

    #[test]
    fn test_failure_marker_must_start_the_line() {
        let log = format!("D:/x/tex.png\n  {SQUARE_FAILURE}\nerror: {SQUARE_FAILURE}");
        assert!(scan(&log).is_empty());
    }

    #[test]
    fn test_non_square_failures_are_still_reported() {
        // Repairability is decided later; the scanner reports every failure line.
        let log = "D:/x/tex.png\nCould not compress texture: out of memory";
        assert_eq!(scan(log).len(), 1);
    }

    #[test]
    fn test_multiple_path_prefixes() {
        let markers = ScanMarkers {
            path_prefixes: vec!["D:/".to_string(), "/home/build/".to_string()],
            failure_marker: "Could not compress texture".to_string(),
        };
        let log = format!("/home/build/IOS/a.png\n{SQUARE_FAILURE}");
        let records: Vec<_> = LogScanner::new(&log, &markers).collect();
        assert_eq!(records[0].source_path, "/home/build/IOS/a.png");
    }

    #[test]
    fn test_scanning_is_restartable() {
        let log = format!("D:/x/tex.png\n{SQUARE_FAILURE}");
        let markers = markers();
        let first: Vec<_> = LogScanner::new(&log, &markers).collect();
        let second: Vec<_> = LogScanner::new(&log, &markers).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_log() {
        assert!(scan("").is_empty());
    }
}
