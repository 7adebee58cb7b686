//! Per-file validation and corpus-wide structural checks.

use crate::context::CorpusContext;
use crate::distance::unique_suggestion;
use crate::options::AuditOptions;
use camino::{Utf8Path, Utf8PathBuf};
use notefix_schema::{ResolvedSchema, ResolvedType, TYPE_FIELD};
use notefix_types::issue::{AuditIssue, IssueCode, Severity};
use notefix_types::schema_doc::FieldKind;
use notefix_types::value::Value;
use notefix_vault::frontmatter::{self, Frontmatter, HygieneFinding};
use notefix_vault::{ManagedFile, OwnershipIndex, ReferenceCheck, wikilink};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::debug;

/// One cross-reference occurrence inside a document.
#[derive(Debug, Clone)]
struct RefSite {
    field: String,
    target: String,
}

/// Per-file examination result, collected before corpus-wide checks.
#[derive(Debug, Clone)]
struct FileRecord {
    rel: Utf8PathBuf,
    stem: Option<String>,
    hash: Option<String>,
    declared_type: Option<String>,
    recursive: bool,
    refs: Vec<RefSite>,
    parent_target: Option<String>,
    issues: Vec<AuditIssue>,
}

/// Audit the whole corpus. Returns the issue list (sorted, filtered) and
/// the corpus context for later file-scoped re-audits.
pub fn audit_vault(
    schema: &ResolvedSchema,
    index: &OwnershipIndex,
    root: &Utf8Path,
    files: &[ManagedFile],
    opts: &AuditOptions,
) -> anyhow::Result<(Vec<AuditIssue>, CorpusContext)> {
    let records: Vec<FileRecord> = files
        .par_iter()
        .map(|file| examine_file(schema, index, root, file, opts))
        .collect();

    let ctx = build_context(root, &records);

    let mut issues: Vec<AuditIssue> = Vec::new();
    for record in &records {
        issues.extend(record.issues.iter().cloned());
        issues.extend(reference_checks(record, &ctx, index));
    }
    issues.extend(parent_cycle_checks(&ctx));

    sort_issues(&mut issues);
    Ok((apply_filters(issues, opts), ctx))
}

/// Re-audit one file against the prebuilt corpus context. Used by the
/// repair pipeline to verify a fix; filenames cannot have changed, so the
/// snapshot indexes stay valid.
pub fn audit_single_file(
    schema: &ResolvedSchema,
    index: &OwnershipIndex,
    ctx: &CorpusContext,
    file: &ManagedFile,
    opts: &AuditOptions,
) -> anyhow::Result<Vec<AuditIssue>> {
    let record = examine_file(schema, index, &ctx.root, file, opts);

    let mut issues = record.issues.clone();
    issues.extend(reference_checks(&record, ctx, index));
    issues.extend(scoped_parent_cycle(&record, ctx));

    sort_issues(&mut issues);
    Ok(apply_filters(issues, opts))
}

fn build_context(root: &Utf8Path, records: &[FileRecord]) -> CorpusContext {
    let mut ctx = CorpusContext {
        root: root.to_path_buf(),
        ..Default::default()
    };

    for record in records {
        if let Some(stem) = &record.stem {
            ctx.filename_index
                .entry(stem.clone())
                .or_default()
                .push(record.rel.clone());
        }
        if let Some(hash) = &record.hash {
            ctx.file_hashes.insert(record.rel.clone(), hash.clone());
        }
        ctx.declared_types
            .insert(record.rel.clone(), record.declared_type.clone());
    }

    // Parent edges only resolve through unique targets; stale or ambiguous
    // parents are reported by the reference checks instead.
    for record in records {
        let Some(target) = &record.parent_target else {
            continue;
        };
        let candidates = ctx.resolve_target(target);
        if candidates.len() == 1 {
            ctx.parent_edges
                .insert(record.rel.clone(), candidates[0].clone());
        }
    }

    ctx
}

fn examine_file(
    schema: &ResolvedSchema,
    index: &OwnershipIndex,
    root: &Utf8Path,
    file: &ManagedFile,
    opts: &AuditOptions,
) -> FileRecord {
    let rel = file.relative_path.clone();
    let mut record = FileRecord {
        stem: rel.file_stem().map(str::to_string),
        rel,
        hash: None,
        declared_type: None,
        recursive: false,
        refs: Vec::new(),
        parent_target: None,
        issues: Vec::new(),
    };

    let text = match fs_err::read_to_string(&file.path) {
        Ok(text) => text,
        Err(err) => {
            record.issues.push(AuditIssue::new(
                IssueCode::InvalidFrontmatter,
                Severity::Error,
                record.rel.clone(),
                format!("cannot read file: {err}"),
            ));
            return record;
        }
    };
    record.hash = Some(sha256_hex(text.as_bytes()));

    let doc = match frontmatter::parse_document(&text) {
        Ok(doc) => doc,
        Err(err) => {
            // Parse failure isolates the file: one issue, no further checks.
            record.issues.push(AuditIssue::new(
                IssueCode::InvalidFrontmatter,
                Severity::Error,
                record.rel.clone(),
                err.to_string(),
            ));
            return record;
        }
    };

    hygiene_issues(&text, &record.rel, &mut record.issues);

    let ty = match declared_type_of(schema, &doc.frontmatter, &record.rel, &mut record.issues) {
        Some(ty) => ty,
        None => return record,
    };
    record.declared_type = Some(ty.name.clone());
    record.recursive = ty.recursive;

    field_checks(schema, ty, &doc.frontmatter, opts, &mut record);
    directory_checks(schema, index, root, file, ty, &mut record.issues);

    record
}

fn hygiene_issues(text: &str, rel: &Utf8Path, issues: &mut Vec<AuditIssue>) {
    for finding in frontmatter::scan_hygiene(text) {
        match finding {
            HygieneFinding::BlockNotAtTop { start_line } => issues.push(
                AuditIssue::new(
                    IssueCode::FrontmatterNotAtTop,
                    Severity::Warning,
                    rel.to_path_buf(),
                    format!("frontmatter block starts at line {}", start_line + 1),
                ),
            ),
            HygieneFinding::DuplicateKey { key } => issues.push(
                AuditIssue::new(
                    IssueCode::DuplicateFrontmatterKeys,
                    Severity::Warning,
                    rel.to_path_buf(),
                    format!("key `{key}` appears more than once; later values are ignored"),
                )
                .with_field(key),
            ),
            HygieneFinding::MalformedWikilink { snippet } => {
                let repaired = wikilink::repair(&snippet);
                let mut issue = AuditIssue::new(
                    IssueCode::MalformedWikilink,
                    Severity::Warning,
                    rel.to_path_buf(),
                    format!("`{snippet}` is not a well-formed [[wikilink]]"),
                )
                .with_extra(serde_json::json!({ "snippet": snippet }));
                if let Some(repaired) = repaired {
                    issue = issue.with_suggestion(repaired);
                }
                issues.push(issue);
            }
        }
    }
}

fn declared_type_of<'s>(
    schema: &'s ResolvedSchema,
    fm: &Frontmatter,
    rel: &Utf8Path,
    issues: &mut Vec<AuditIssue>,
) -> Option<&'s ResolvedType> {
    match fm.get(TYPE_FIELD) {
        None | Some(Value::Null) => {
            issues.push(AuditIssue::new(
                IssueCode::OrphanFile,
                Severity::Error,
                rel.to_path_buf(),
                "no `type` declared in frontmatter",
            ));
            None
        }
        Some(Value::String(name)) => match schema.get(name) {
            Some(ty) => Some(ty),
            None => {
                issues.push(
                    AuditIssue::new(
                        IssueCode::InvalidType,
                        Severity::Error,
                        rel.to_path_buf(),
                        format!("`{name}` is not a known type"),
                    )
                    .with_field(TYPE_FIELD),
                );
                None
            }
        },
        Some(other) => {
            issues.push(
                AuditIssue::new(
                    IssueCode::InvalidType,
                    Severity::Error,
                    rel.to_path_buf(),
                    format!("`type` must be a string, found `{other}`"),
                )
                .with_field(TYPE_FIELD),
            );
            None
        }
    }
}

fn field_checks(
    schema: &ResolvedSchema,
    ty: &ResolvedType,
    fm: &Frontmatter,
    opts: &AuditOptions,
    record: &mut FileRecord,
) {
    let rel = record.rel.clone();

    for (name, field) in &ty.fields {
        let value = fm.get(name);
        let missing = matches!(value, None | Some(Value::Null));

        if field.required && missing {
            let mut issue = AuditIssue::new(
                IssueCode::MissingRequired,
                Severity::Error,
                rel.clone(),
                format!("required field `{name}` is missing"),
            )
            .with_field(name.clone());
            if let Some(default) = &field.default {
                issue = issue
                    .with_suggestion(default.to_string())
                    .with_extra(serde_json::json!({ "default": default }));
            }
            record.issues.push(issue);
            continue;
        }
        let Some(value) = value else { continue };
        if value.is_null() {
            continue;
        }

        if let FieldKind::Select { enum_ref } = &field.kind {
            let options = schema.enum_values(enum_ref);
            match value.as_str() {
                Some(s) if options.iter().any(|o| o == s) => {}
                Some(s) => {
                    let mut issue = AuditIssue::new(
                        IssueCode::InvalidOption,
                        Severity::Error,
                        rel.clone(),
                        format!(
                            "`{s}` is not a valid option for `{name}` (expected one of: {})",
                            options.join(", ")
                        ),
                    )
                    .with_field(name.clone())
                    .with_extra(serde_json::json!({ "value": s, "options": options }));
                    if let Some(suggestion) = unique_suggestion(
                        s,
                        options.iter().map(String::as_str),
                        opts.suggestion_distance,
                    ) {
                        issue = issue.with_suggestion(suggestion);
                    }
                    record.issues.push(issue);
                }
                None => {
                    record.issues.push(
                        AuditIssue::new(
                            IssueCode::InvalidOption,
                            Severity::Error,
                            rel.clone(),
                            format!("`{name}` must be a string from: {}", options.join(", ")),
                        )
                        .with_field(name.clone()),
                    );
                }
            }
        }

        if field.kind.is_list()
            && let Value::List(items) = value
        {
            let offending: Vec<usize> = items
                .iter()
                .enumerate()
                .filter(|(_, v)| v.as_str().is_none())
                .map(|(i, _)| i)
                .collect();
            if !offending.is_empty() {
                record.issues.push(
                    AuditIssue::new(
                        IssueCode::InvalidListElement,
                        Severity::Warning,
                        rel.clone(),
                        format!("`{name}` contains non-string elements"),
                    )
                    .with_field(name.clone())
                    .with_extra(serde_json::json!({ "indexes": offending })),
                );
            }
        }

        if field.is_reference() {
            for entry in value.iter_entries() {
                match entry.as_str() {
                    Some(s) => match wikilink::parse(s) {
                        Some(link) => {
                            if ty.recursive && name == "parent" && record.parent_target.is_none() {
                                record.parent_target = Some(link.target.clone());
                            }
                            record.refs.push(RefSite {
                                field: name.clone(),
                                target: link.target,
                            });
                        }
                        None => record.issues.push(
                            AuditIssue::new(
                                IssueCode::FormatViolation,
                                Severity::Warning,
                                rel.clone(),
                                format!("`{name}` value `{s}` is not a [[wikilink]]"),
                            )
                            .with_field(name.clone()),
                        ),
                    },
                    None if !field.kind.is_list() => record.issues.push(
                        AuditIssue::new(
                            IssueCode::FormatViolation,
                            Severity::Warning,
                            rel.clone(),
                            format!("`{name}` must be a [[wikilink]] string"),
                        )
                        .with_field(name.clone()),
                    ),
                    None => {}
                }
            }
        }
    }

    let allowed = |key: &str| {
        opts.allowed_extra_fields.iter().any(|k| k == key)
            || schema.config.allowed_extra_fields.iter().any(|k| k == key)
    };
    for key in fm.keys() {
        if ty.fields.contains_key(key) || allowed(key) {
            continue;
        }
        let severity = if opts.strict {
            Severity::Error
        } else {
            Severity::Warning
        };
        record.issues.push(
            AuditIssue::new(
                IssueCode::UnknownField,
                severity,
                rel.clone(),
                format!("`{key}` is not a field of type `{}`", ty.name),
            )
            .with_field(key.to_string()),
        );
    }
}

fn directory_checks(
    schema: &ResolvedSchema,
    index: &OwnershipIndex,
    root: &Utf8Path,
    file: &ManagedFile,
    ty: &ResolvedType,
    issues: &mut Vec<AuditIssue>,
) {
    let rel = &file.relative_path;

    // Owned files live where the ownership geometry put them.
    if index.owner_of(rel).is_some() {
        return;
    }

    let Some(expected) = schema.storage_dir(&ty.name) else {
        return;
    };
    let actual = rel.parent().unwrap_or(Utf8Path::new(""));

    let in_storage = actual == expected;
    let in_instance_folder = file
        .instance_folder
        .as_deref()
        .and_then(Utf8Path::parent)
        .map(|p| p == expected)
        .unwrap_or(false);
    if in_storage || in_instance_folder {
        return;
    }

    // An owned-capable type sitting inside someone's instance folder but
    // not in the right child subdirectory.
    if schema.ownership.can_be_owned(&ty.name) {
        let mut dir = actual;
        loop {
            if let Some(name) = dir.file_name() {
                let owner_doc = root.join(dir).join(format!("{name}.md"));
                if owner_doc.is_file() {
                    issues.push(
                        AuditIssue::new(
                            IssueCode::OwnedWrongLocation,
                            Severity::Error,
                            rel.to_path_buf(),
                            format!(
                                "owned-capable `{}` sits under owner folder `{dir}` but not in a declared child directory",
                                ty.name
                            ),
                        )
                        .with_extra(serde_json::json!({ "owner_folder": dir.as_str() })),
                    );
                    return;
                }
            }
            match dir.parent() {
                Some(parent) if !parent.as_str().is_empty() => dir = parent,
                _ => break,
            }
        }
    }

    issues.push(
        AuditIssue::new(
            IssueCode::WrongDirectory,
            Severity::Error,
            rel.to_path_buf(),
            format!("expected under `{expected}`, found under `{actual}`"),
        )
        .with_extra(serde_json::json!({ "expected": expected.as_str(), "actual": actual.as_str() })),
    );
}

fn reference_checks(
    record: &FileRecord,
    ctx: &CorpusContext,
    index: &OwnershipIndex,
) -> Vec<AuditIssue> {
    let mut issues = Vec::new();
    let rel = &record.rel;

    for site in &record.refs {
        let candidates = ctx.resolve_target(&site.target);
        match candidates {
            [] => issues.push(
                AuditIssue::new(
                    IssueCode::StaleReference,
                    Severity::Error,
                    rel.clone(),
                    format!("`[[{}]]` does not resolve to any known file", site.target),
                )
                .with_field(site.field.clone())
                .with_extra(serde_json::json!({ "target": site.target })),
            ),
            [only] => {
                if only == rel {
                    issues.push(
                        AuditIssue::new(
                            IssueCode::SelfReference,
                            Severity::Warning,
                            rel.clone(),
                            format!("`[[{}]]` points back at this file", site.target),
                        )
                        .with_field(site.field.clone()),
                    );
                } else if let ReferenceCheck::ReferencingOwned { owner_path } =
                    index.can_reference(rel, only)
                {
                    issues.push(
                        AuditIssue::new(
                            IssueCode::OwnedNoteReferenced,
                            Severity::Error,
                            rel.clone(),
                            format!(
                                "`[[{}]]` is owned by `{owner_path}` and may only be referenced from there",
                                site.target
                            ),
                        )
                        .with_field(site.field.clone())
                        .with_extra(serde_json::json!({ "owner": owner_path.as_str() })),
                    );
                }
            }
            many => issues.push(
                AuditIssue::new(
                    IssueCode::AmbiguousLinkTarget,
                    Severity::Error,
                    rel.clone(),
                    format!(
                        "`[[{}]]` matches {} files by basename",
                        site.target,
                        many.len()
                    ),
                )
                .with_field(site.field.clone())
                .with_extra(serde_json::json!({
                    "candidates": many.iter().map(|p| p.as_str()).collect::<Vec<_>>()
                })),
            ),
        }
    }

    issues
}

/// Walk every recursive file's parent chain with a visited set; each
/// distinct cycle is reported exactly once, anchored at its
/// lexicographically smallest member.
fn parent_cycle_checks(ctx: &CorpusContext) -> Vec<AuditIssue> {
    let mut cycles: BTreeSet<Vec<Utf8PathBuf>> = BTreeSet::new();

    for start in ctx.parent_edges.keys() {
        if let Some(cycle) = walk_for_cycle(start, &ctx.parent_edges) {
            cycles.insert(cycle);
        }
    }

    cycles.into_iter().map(cycle_issue).collect()
}

fn scoped_parent_cycle(record: &FileRecord, ctx: &CorpusContext) -> Vec<AuditIssue> {
    if !record.recursive {
        return Vec::new();
    }

    // Overlay this file's freshly parsed parent edge on the snapshot.
    let mut edges = ctx.parent_edges.clone();
    edges.remove(&record.rel);
    if let Some(target) = &record.parent_target {
        let candidates = ctx.resolve_target(target);
        if candidates.len() == 1 {
            edges.insert(record.rel.clone(), candidates[0].clone());
        }
    }

    match walk_for_cycle(&record.rel, &edges) {
        Some(cycle) if cycle.contains(&record.rel) => vec![cycle_issue(cycle)],
        _ => Vec::new(),
    }
}

fn walk_for_cycle(
    start: &Utf8PathBuf,
    edges: &std::collections::BTreeMap<Utf8PathBuf, Utf8PathBuf>,
) -> Option<Vec<Utf8PathBuf>> {
    let mut path: Vec<&Utf8PathBuf> = vec![start];
    let mut current = start;
    while let Some(next) = edges.get(current) {
        if let Some(pos) = path.iter().position(|p| *p == next) {
            let mut cycle: Vec<Utf8PathBuf> = path[pos..].iter().map(|p| (*p).clone()).collect();
            let min_idx = cycle
                .iter()
                .enumerate()
                .min_by_key(|(_, p)| (*p).clone())
                .map(|(i, _)| i)
                .unwrap_or(0);
            cycle.rotate_left(min_idx);
            return Some(cycle);
        }
        path.push(next);
        current = next;
    }
    None
}

fn cycle_issue(cycle: Vec<Utf8PathBuf>) -> AuditIssue {
    let mut display: Vec<&str> = cycle.iter().map(|p| p.as_str()).collect();
    display.push(cycle[0].as_str());
    AuditIssue::new(
        IssueCode::ParentCycle,
        Severity::Error,
        cycle[0].clone(),
        format!("parent chain loops: {}", display.join(" -> ")),
    )
    .with_field("parent")
    .with_extra(serde_json::json!({
        "cycle": cycle.iter().map(|p| p.as_str()).collect::<Vec<_>>()
    }))
}

fn sort_issues(issues: &mut [AuditIssue]) {
    issues.sort_by(|a, b| {
        (&a.file, a.code, &a.field, &a.message).cmp(&(&b.file, b.code, &b.field, &b.message))
    });
}

/// `only`/`ignore` restrict the emitted set to/excluding exactly one code.
/// Applied last, after all detection.
fn apply_filters(issues: Vec<AuditIssue>, opts: &AuditOptions) -> Vec<AuditIssue> {
    let before = issues.len();
    let out: Vec<AuditIssue> = issues
        .into_iter()
        .filter(|issue| match (opts.only_issue, opts.ignore_issue) {
            (Some(only), _) => issue.code == only,
            (None, Some(ignored)) => issue.code != ignored,
            (None, None) => true,
        })
        .collect();
    if out.len() != before {
        debug!(before, after = out.len(), "issue filters applied");
    }
    out
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
