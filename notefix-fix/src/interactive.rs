//! Interactive mode: one issue at a time, grouped by file, strictly
//! sequential. Each accepted input goes through the same
//! write-then-reverify-or-rollback contract as auto mode.

use crate::apply::FileFixer;
use crate::ops::{EditOp, classify_auto};
use crate::prompt::{Prompt, PromptOutcome};
use camino::Utf8PathBuf;
use notefix_audit::{AuditOptions, CorpusContext};
use notefix_schema::ResolvedSchema;
use notefix_types::fix::{FixRecord, FixStatus, FixSummary};
use notefix_types::issue::{AuditIssue, IssueCode};
use notefix_types::schema_doc::FieldKind;
use notefix_types::value::Value;
use notefix_vault::OwnershipIndex;
use std::collections::BTreeMap;
use tracing::debug;

/// Walk the issue list interactively. An abort halts immediately:
/// already-committed writes are retained and everything not yet reached is
/// reported as remaining.
pub fn run_interactive_fix(
    schema: &ResolvedSchema,
    index: &OwnershipIndex,
    ctx: &CorpusContext,
    issues: &[AuditIssue],
    audit_opts: &AuditOptions,
    prompt: &mut dyn Prompt,
) -> anyhow::Result<FixSummary> {
    let mut by_file: BTreeMap<Utf8PathBuf, Vec<&AuditIssue>> = BTreeMap::new();
    for issue in issues {
        by_file.entry(issue.file.clone()).or_default().push(issue);
    }

    let mut records: Vec<FixRecord> = Vec::new();
    let mut aborted = false;

    'files: for (file, file_issues) in &by_file {
        if aborted {
            remaining(&mut records, file_issues);
            continue;
        }

        let mut fixer = match FileFixer::open(schema, index, ctx, audit_opts, file) {
            Ok(fixer) => fixer,
            Err(err) => {
                for issue in file_issues {
                    records.push(record(issue, FixStatus::Errored, Some(err.to_string())));
                }
                continue;
            }
        };

        for (i, issue) in file_issues.iter().enumerate() {
            let decision = match decide(schema, ctx, issue, prompt) {
                Ok(decision) => decision,
                Err(err) => {
                    records.push(record(issue, FixStatus::Errored, Some(err.to_string())));
                    continue;
                }
            };

            match decision {
                Decision::Apply(op) => match fixer.attempt(issue, &op) {
                    Ok(()) => records.push(record(issue, FixStatus::Fixed, None)),
                    Err(err) => {
                        records.push(record(issue, FixStatus::Errored, Some(err.to_string())));
                    }
                },
                Decision::Skip => records.push(record(issue, FixStatus::Skipped, None)),
                Decision::NotFixable => {
                    records.push(record(issue, FixStatus::Remaining, None));
                }
                Decision::Abort => {
                    debug!("interactive fix aborted by user");
                    aborted = true;
                    remaining(&mut records, &file_issues[i..]);
                    continue 'files;
                }
            }
        }
    }

    Ok(FixSummary::from_records(records, false))
}

enum Decision {
    Apply(EditOp),
    Skip,
    NotFixable,
    Abort,
}

/// Build the prompt for one issue from its current value and the
/// schema-derived valid choices.
fn decide(
    schema: &ResolvedSchema,
    ctx: &CorpusContext,
    issue: &AuditIssue,
    prompt: &mut dyn Prompt,
) -> anyhow::Result<Decision> {
    let message = format!("{}: [{}] {}", issue.file, issue.code, issue.message);

    match issue.code {
        IssueCode::InvalidOption | IssueCode::MissingRequired => {
            let Some(field_name) = issue.field.as_deref() else {
                return Ok(Decision::NotFixable);
            };
            let field = ctx
                .declared_types
                .get(&issue.file)
                .and_then(|t| t.as_deref())
                .and_then(|t| schema.get(t))
                .and_then(|ty| ty.field(field_name));
            let Some(field) = field else {
                return Ok(Decision::NotFixable);
            };

            if let FieldKind::Select { enum_ref } = &field.kind {
                let choices: Vec<String> = schema.enum_values(enum_ref).to_vec();
                if choices.is_empty() {
                    return Ok(Decision::NotFixable);
                }
                return Ok(match prompt.select(&message, &choices)? {
                    PromptOutcome::Answer(idx) => Decision::Apply(EditOp::SetField {
                        field: field_name.to_string(),
                        value: Value::String(choices[idx].clone()),
                    }),
                    PromptOutcome::Skipped => Decision::Skip,
                    PromptOutcome::Aborted => Decision::Abort,
                });
            }

            let default = issue
                .suggestion
                .clone()
                .or_else(|| field.default.as_ref().map(ToString::to_string));
            Ok(match prompt.input(&message, default.as_deref())? {
                PromptOutcome::Answer(text) if !text.is_empty() => {
                    Decision::Apply(EditOp::SetField {
                        field: field_name.to_string(),
                        value: Value::String(text),
                    })
                }
                PromptOutcome::Answer(_) => Decision::Skip,
                PromptOutcome::Skipped => Decision::Skip,
                PromptOutcome::Aborted => Decision::Abort,
            })
        }

        IssueCode::MalformedWikilink => {
            let Some(snippet) = issue
                .extra
                .as_ref()
                .and_then(|e| e.get("snippet"))
                .and_then(|s| s.as_str())
            else {
                return Ok(Decision::NotFixable);
            };
            Ok(match prompt.input(&message, issue.suggestion.as_deref())? {
                PromptOutcome::Answer(text) if !text.is_empty() => {
                    Decision::Apply(EditOp::ReplaceRaw {
                        from: snippet.to_string(),
                        to: text,
                    })
                }
                PromptOutcome::Answer(_) => Decision::Skip,
                PromptOutcome::Skipped => Decision::Skip,
                PromptOutcome::Aborted => Decision::Abort,
            })
        }

        IssueCode::DuplicateFrontmatterKeys | IssueCode::FrontmatterNotAtTop => {
            // The edit itself is deterministic; the prompt only confirms.
            let Some(op) = classify_auto(issue, schema, ctx) else {
                return Ok(Decision::NotFixable);
            };
            let choices = vec!["apply".to_string()];
            Ok(match prompt.select(&message, &choices)? {
                PromptOutcome::Answer(_) => Decision::Apply(op),
                PromptOutcome::Skipped => Decision::Skip,
                PromptOutcome::Aborted => Decision::Abort,
            })
        }

        _ => Ok(Decision::NotFixable),
    }
}

fn remaining(records: &mut Vec<FixRecord>, issues: &[&AuditIssue]) {
    for issue in issues {
        records.push(record(issue, FixStatus::Remaining, None));
    }
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
