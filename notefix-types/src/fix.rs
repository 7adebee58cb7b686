//! Repair pipeline result types.

use crate::issue::IssueCode;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal state of one issue after a repair run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    /// Written and confirmed gone by a file-scoped re-audit.
    Fixed,
    /// Declined by the user in interactive mode.
    Skipped,
    /// No deterministic resolution, or not reached before an abort.
    Remaining,
    /// Write failed, precondition mismatched, or the re-audit still
    /// reported the issue (the write was rolled back).
    Errored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub file: Utf8PathBuf,
    pub code: IssueCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub status: FixStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-file and aggregate counts for a repair run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixSummary {
    pub fixed: u64,
    pub skipped: u64,
    pub remaining: u64,
    pub errored: u64,

    #[serde(default)]
    pub dry_run: bool,

    pub records: Vec<FixRecord>,
}

impl FixSummary {
    pub fn from_records(records: Vec<FixRecord>, dry_run: bool) -> Self {
        let mut summary = FixSummary {
            dry_run,
            ..Default::default()
        };
        for r in &records {
            match r.status {
                FixStatus::Fixed => summary.fixed += 1,
                FixStatus::Skipped => summary.skipped += 1,
                FixStatus::Remaining => summary.remaining += 1,
                FixStatus::Errored => summary.errored += 1,
            }
        }
        summary.records = records;
        summary
    }

    /// Success criterion for exit-code decisions: nothing left behind.
    pub fn is_clean(&self) -> bool {
        self.remaining == 0 && self.errored == 0
    }

    /// Counts grouped by file, in path order.
    pub fn by_file(&self) -> BTreeMap<&Utf8PathBuf, [u64; 4]> {
        let mut out: BTreeMap<&Utf8PathBuf, [u64; 4]> = BTreeMap::new();
        for r in &self.records {
            let slot = out.entry(&r.file).or_default();
            match r.status {
                FixStatus::Fixed => slot[0] += 1,
                FixStatus::Skipped => slot[1] += 1,
                FixStatus::Remaining => slot[2] += 1,
                FixStatus::Errored => slot[3] += 1,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file: &str, status: FixStatus) -> FixRecord {
        FixRecord {
            file: file.into(),
            code: IssueCode::MissingRequired,
            field: Some("status".into()),
            status,
            message: None,
        }
    }

    #[test]
    fn summary_counts_statuses() {
        let summary = FixSummary::from_records(
            vec![
                record("a.md", FixStatus::Fixed),
                record("a.md", FixStatus::Remaining),
                record("b.md", FixStatus::Errored),
            ],
            false,
        );
        assert_eq!(summary.fixed, 1);
        assert_eq!(summary.remaining, 1);
        assert_eq!(summary.errored, 1);
        assert!(!summary.is_clean());

        let by_file = summary.by_file();
        assert_eq!(by_file[&Utf8PathBuf::from("a.md")], [1, 0, 1, 0]);
    }

    #[test]
    fn empty_summary_is_clean() {
        assert!(FixSummary::from_records(vec![], false).is_clean());
    }
}
