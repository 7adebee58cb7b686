//! Report envelopes written by audit and fix runs.

use crate::fix::FixSummary;
use crate::issue::{AuditIssue, AuditSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl RunInfo {
    pub fn started_now() -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            ended_at: None,
            duration_ms: None,
        }
    }

    pub fn finish(&mut self) {
        let ended = chrono::Utc::now();
        if let Ok(started) = chrono::DateTime::parse_from_rfc3339(&self.started_at) {
            let ms = ended.signed_duration_since(started).num_milliseconds();
            self.duration_ms = Some(ms.max(0) as u64);
        }
        self.ended_at = Some(ended.to_rfc3339());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub schema: String,
    pub run: RunInfo,
    pub vault_root: String,
    pub files_scanned: u64,
    pub summary: AuditSummary,
    pub issues: Vec<AuditIssue>,
}

impl AuditReport {
    pub fn new(vault_root: String, files_scanned: u64, run: RunInfo, issues: Vec<AuditIssue>) -> Self {
        Self {
            schema: crate::schema_id::NOTEFIX_AUDIT_V1.to_string(),
            run,
            vault_root,
            files_scanned,
            summary: AuditSummary::from_issues(&issues),
            issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixReport {
    pub schema: String,
    pub run: RunInfo,
    pub vault_root: String,
    pub summary: FixSummary,
}

impl FixReport {
    pub fn new(vault_root: String, run: RunInfo, summary: FixSummary) -> Self {
        Self {
            schema: crate::schema_id::NOTEFIX_FIX_V1.to_string(),
            run,
            vault_root,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{IssueCode, Severity};

    #[test]
    fn audit_report_carries_schema_id_and_summary() {
        let issues = vec![AuditIssue::new(
            IssueCode::OrphanFile,
            Severity::Error,
            "notes/x.md",
            "no type",
        )];
        let report = AuditReport::new("/v".into(), 10, RunInfo::started_now(), issues);
        assert_eq!(report.schema, "notefix.audit.v1");
        assert_eq!(report.summary.total, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"][0]["code"], "orphan-file");
    }

    #[test]
    fn run_info_finish_sets_duration() {
        let mut run = RunInfo::started_now();
        run.finish();
        assert!(run.ended_at.is_some());
        assert!(run.duration_ms.is_some());
    }
}
