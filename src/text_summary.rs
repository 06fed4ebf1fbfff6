//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for text mode and the `--history` listing.

use crate::display;
use crate::model::TestResult;
use crate::storage::HistoryLog;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Summary of a single completed run.
pub(crate) fn build_text_summary(result: &TestResult) -> TextSummary {
    TextSummary {
        lines: vec![
            format!("Download: {} Mbps", result.download),
            format!("Upload:   {} Mbps", result.upload),
            format!("Ping:     {} ms", result.ping),
            format!("Time:     {}", display::format_timestamp(&result.timestamp)),
        ],
    }
}

/// History table, newest first.
pub(crate) fn build_history_table(history: &HistoryLog) -> TextSummary {
    if history.is_empty() {
        return TextSummary {
            lines: vec!["No test history yet.".into()],
        };
    }

    let mut lines = vec![format!(
        "{:<20} {:>10} {:>10} {:>8}",
        "Date", "Download", "Upload", "Ping"
    )];
    for r in history.entries() {
        lines.push(format!(
            "{:<20} {:>10} {:>10} {:>8}",
            display::format_timestamp(&r.timestamp),
            format!("{} Mbps", r.download),
            format!("{} Mbps", r.upload),
            format!("{} ms", r.ping),
        ));
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sample_result;

    #[test]
    fn summary_lists_all_three_figures() {
        let lines = build_text_summary(&sample_result(5)).lines;
        assert_eq!(lines[0], "Download: 25 Mbps");
        assert_eq!(lines[1], "Upload:   15 Mbps");
        assert_eq!(lines[2], "Ping:     15 ms");
    }

    #[test]
    fn history_table_is_newest_first() {
        let mut log = HistoryLog::default();
        log.append(sample_result(1));
        log.append(sample_result(2));
        let lines = build_history_table(&log).lines;
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Date"));
        assert!(lines[1].contains("22 Mbps"));
        assert!(lines[2].contains("21 Mbps"));
    }

    #[test]
    fn empty_history_says_so() {
        let lines = build_history_table(&HistoryLog::default()).lines;
        assert_eq!(lines, vec!["No test history yet.".to_string()]);
    }
}
