//! Auto mode: deterministic fixes only, independent files in parallel.

use crate::apply::FileFixer;
use crate::ops::classify_auto;
use camino::Utf8PathBuf;
use notefix_audit::{AuditOptions, CorpusContext};
use notefix_schema::ResolvedSchema;
use notefix_types::fix::{FixRecord, FixStatus, FixSummary};
use notefix_types::issue::AuditIssue;
use notefix_vault::OwnershipIndex;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Compute and report the classification and a diff preview without
    /// performing any write.
    pub dry_run: bool,
}

/// Unified-diff preview of one file's would-be changes (dry runs only).
#[derive(Debug, Clone)]
pub struct FilePatch {
    pub file: Utf8PathBuf,
    pub diff: String,
}

#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub summary: FixSummary,
    pub patches: Vec<FilePatch>,
}

/// Run deterministic fixes over the issue list, grouped by file. Each
/// file's fix-then-reverify cycle only touches that file's own content
/// plus the pre-built read-only indexes, so files process in parallel.
pub fn run_auto_fix(
    schema: &ResolvedSchema,
    index: &OwnershipIndex,
    ctx: &CorpusContext,
    issues: &[AuditIssue],
    audit_opts: &AuditOptions,
    opts: &FixOptions,
) -> anyhow::Result<FixOutcome> {
    let mut by_file: BTreeMap<Utf8PathBuf, Vec<&AuditIssue>> = BTreeMap::new();
    for issue in issues {
        by_file.entry(issue.file.clone()).or_default().push(issue);
    }

    let groups: Vec<(Utf8PathBuf, Vec<&AuditIssue>)> = by_file.into_iter().collect();
    let results: Vec<(Vec<FixRecord>, Option<FilePatch>)> = groups
        .par_iter()
        .map(|(file, file_issues)| fix_file(schema, index, ctx, audit_opts, opts, file, file_issues))
        .collect();

    let mut records = Vec::new();
    let mut patches = Vec::new();
    for (mut file_records, patch) in results {
        records.append(&mut file_records);
        patches.extend(patch);
    }

    let summary = FixSummary::from_records(records, opts.dry_run);
    debug!(
        fixed = summary.fixed,
        remaining = summary.remaining,
        errored = summary.errored,
        dry_run = opts.dry_run,
        "auto fix complete"
    );
    Ok(FixOutcome { summary, patches })
}

fn fix_file(
    schema: &ResolvedSchema,
    index: &OwnershipIndex,
    ctx: &CorpusContext,
    audit_opts: &AuditOptions,
    opts: &FixOptions,
    file: &Utf8PathBuf,
    issues: &[&AuditIssue],
) -> (Vec<FixRecord>, Option<FilePatch>) {
    let mut fixer = match FileFixer::open(schema, index, ctx, audit_opts, file) {
        Ok(fixer) => fixer,
        Err(err) => {
            // Precondition or read failure: nothing is written for this
            // file; every deterministic issue becomes errored, the rest
            // stay remaining.
            let records = issues
                .iter()
                .map(|issue| {
                    let status = if classify_auto(issue, schema, ctx).is_some() {
                        FixStatus::Errored
                    } else {
                        FixStatus::Remaining
                    };
                    record(issue, status, Some(err.to_string()))
                })
                .collect();
            return (records, None);
        }
    };

    let original = fixer.current_text().to_string();
    let mut records = Vec::new();

    for issue in issues {
        let Some(op) = classify_auto(issue, schema, ctx) else {
            records.push(record(issue, FixStatus::Remaining, None));
            continue;
        };

        if opts.dry_run {
            match fixer.preview(&op) {
                Ok(()) => records.push(record(issue, FixStatus::Fixed, Some("dry-run".into()))),
                Err(err) => records.push(record(issue, FixStatus::Errored, Some(err.to_string()))),
            }
            continue;
        }

        match fixer.attempt(issue, &op) {
            Ok(()) => records.push(record(issue, FixStatus::Fixed, None)),
            Err(err) => {
                records.push(record(issue, FixStatus::Errored, Some(err.to_string())));
            }
        }
    }

    let patch = if opts.dry_run && fixer.current_text() != original {
        let patch = diffy::create_patch(&original, fixer.current_text());
        Some(FilePatch {
            file: file.clone(),
            diff: patch.to_string(),
        })
    } else {
        None
    };

    (records, patch)
}

fn record(issue: &AuditIssue, status: FixStatus, message: Option<String>) -> FixRecord {
    FixRecord {
        file: issue.file.clone(),
        code: issue.code,
        field: issue.field.clone(),
        status,
        message,
    }
}
