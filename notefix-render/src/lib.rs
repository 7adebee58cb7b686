//! Rendering helpers (plain text) for human-readable reports.

use notefix_types::fix::{FixStatus, FixSummary};
use notefix_types::issue::{AuditIssue, Severity};
use notefix_types::report::AuditReport;

/// Issues grouped by file, with a severity-count footer.
pub fn render_audit_text(report: &AuditReport) -> String {
    let mut out = String::new();

    if report.issues.is_empty() {
        out.push_str(&format!(
            "All clean: {} files scanned, no issues.\n",
            report.files_scanned
        ));
        return out;
    }

    let mut current_file: Option<&str> = None;
    for issue in &report.issues {
        if current_file != Some(issue.file.as_str()) {
            if current_file.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("{}\n", issue.file));
            current_file = Some(issue.file.as_str());
        }
        out.push_str(&format!("  {}\n", render_issue_line(issue)));
    }

    out.push('\n');
    out.push_str(&format!(
        "{} issues in {} of {} files ({} errors, {} warnings)\n",
        report.summary.total,
        report.summary.files_affected,
        report.files_scanned,
        report.summary.errors,
        report.summary.warnings
    ));

    if !report.summary.by_code.is_empty() {
        out.push_str("by code:\n");
        for (code, count) in &report.summary.by_code {
            out.push_str(&format!("  {code}: {count}\n"));
        }
    }

    out
}

fn render_issue_line(issue: &AuditIssue) -> String {
    let marker = match issue.severity {
        Severity::Error => "error",
        Severity::Warning => "warn ",
    };
    let field = issue
        .field
        .as_deref()
        .map(|f| format!(" `{f}`"))
        .unwrap_or_default();
    let suggestion = issue
        .suggestion
        .as_deref()
        .map(|s| format!(" (suggestion: {s})"))
        .unwrap_or_default();
    format!(
        "{marker} [{code}]{field} {message}{suggestion}",
        code = issue.code,
        message = issue.message
    )
}

/// Fixed/skipped/remaining/errored counts, per file then aggregate.
pub fn render_fix_text(summary: &FixSummary) -> String {
    let mut out = String::new();

    if summary.dry_run {
        out.push_str("dry-run: no files were written\n\n");
    }

    for (file, [fixed, skipped, remaining, errored]) in summary.by_file() {
        out.push_str(&format!(
            "{file}: {fixed} fixed, {skipped} skipped, {remaining} remaining, {errored} errored\n"
        ));
        for record in summary.records.iter().filter(|r| &r.file == file) {
            let status = match record.status {
                FixStatus::Fixed => "fixed",
                FixStatus::Skipped => "skipped",
                FixStatus::Remaining => "remaining",
                FixStatus::Errored => "errored",
            };
            let field = record
                .field
                .as_deref()
                .map(|f| format!(" `{f}`"))
                .unwrap_or_default();
            let message = record
                .message
                .as_deref()
                .map(|m| format!(" ({m})"))
                .unwrap_or_default();
            out.push_str(&format!("  {status} [{}]{field}{message}\n", record.code));
        }
    }

    out.push_str(&format!(
        "\ntotal: {} fixed, {} skipped, {} remaining, {} errored\n",
        summary.fixed, summary.skipped, summary.remaining, summary.errored
    ));
    out
}
