//! The audit and fix pipelines: load schema, resolve, scan, index, audit,
//! then (optionally) repair.

use crate::error::CoreError;
use crate::settings::{AuditSettings, FixSettings};
use anyhow::Context;
use camino::Utf8Path;
use notefix_audit::{AuditOptions, CorpusContext, audit_vault};
use notefix_fix::{FixOptions, Prompt, run_auto_fix as fix_auto, run_interactive_fix as fix_interactive};
use notefix_schema::{ResolvedSchema, resolve_schema};
use notefix_types::issue::AuditIssue;
use notefix_types::report::{AuditReport, FixReport, RunInfo};
use notefix_types::schema_doc::SchemaDoc;
use notefix_vault::{ManagedFile, OwnershipIndex, SCHEMA_FILE, ScanOptions, scan_vault};
use tracing::{debug, info};

/// Caller-supplied pre-selection of which files a run is scoped to. The
/// core never parses filter expressions itself; a caller that supports
/// them evaluates each file through this seam.
pub trait ScopeFilter: Sync {
    fn matches(&self, file: &ManagedFile) -> bool;
}

/// Everything a fix run (or a reporting caller) needs from an audit.
#[derive(Debug)]
pub struct AuditOutcome {
    pub report: AuditReport,
    pub issues: Vec<AuditIssue>,
    pub schema: ResolvedSchema,
    pub index: OwnershipIndex,
    pub ctx: CorpusContext,
}

pub struct FixRunOutcome {
    pub report: FixReport,
    pub patches: Vec<notefix_fix::FilePatch>,
}

/// Load `meta/schema.json` and resolve the type graph. A `SchemaError`
/// aborts the run before any scanning, with no partial output.
pub fn load_and_resolve(vault_root: &Utf8Path) -> Result<ResolvedSchema, CoreError> {
    let path = vault_root.join(SCHEMA_FILE);
    let raw = fs_err::read_to_string(&path)
        .with_context(|| format!("read schema document {path}"))
        .map_err(CoreError::Runtime)?;
    let doc: SchemaDoc = serde_json::from_str(&raw)
        .with_context(|| format!("parse schema document {path}"))
        .map_err(CoreError::Runtime)?;

    let schema = resolve_schema(&doc)?;
    debug!(types = schema.types.len(), "schema resolved");
    Ok(schema)
}

/// Run the audit pipeline.
pub fn run_audit(
    settings: &AuditSettings,
    scope: Option<&dyn ScopeFilter>,
) -> Result<AuditOutcome, CoreError> {
    let mut run = RunInfo::started_now();
    let schema = load_and_resolve(&settings.vault_root)?;

    let result = with_worker_pool(settings.config.workers, || {
        audit_snapshot(&schema, settings, scope)
    })??;
    let (files_scanned, issues, index, ctx) = result;

    run.finish();
    let report = AuditReport::new(
        settings.vault_root.to_string(),
        files_scanned,
        run,
        issues.clone(),
    );
    info!(
        files = files_scanned,
        issues = report.summary.total,
        "audit complete"
    );

    Ok(AuditOutcome {
        report,
        issues,
        schema,
        index,
        ctx,
    })
}

/// Audit, then apply every deterministic fix. Independent files are
/// processed concurrently under the bounded pool.
pub fn run_auto_fix(settings: &FixSettings) -> Result<FixRunOutcome, CoreError> {
    let mut run = RunInfo::started_now();
    let audit = run_audit(&settings.audit, None)?;
    let audit_opts = audit_options(&settings.audit);
    let fix_opts = FixOptions {
        dry_run: settings.dry_run,
    };

    let outcome = with_worker_pool(settings.audit.config.workers, || {
        fix_auto(
            &audit.schema,
            &audit.index,
            &audit.ctx,
            &audit.issues,
            &audit_opts,
            &fix_opts,
        )
    })?
    .map_err(CoreError::Runtime)?;

    run.finish();
    Ok(FixRunOutcome {
        report: FixReport::new(settings.audit.vault_root.to_string(), run, outcome.summary),
        patches: outcome.patches,
    })
}

/// Audit, then walk the issues interactively. Strictly sequential; the
/// caller is responsible for refusing to start without a terminal.
pub fn run_interactive_fix(
    settings: &FixSettings,
    prompt: &mut dyn Prompt,
) -> Result<FixRunOutcome, CoreError> {
    let mut run = RunInfo::started_now();
    let audit = run_audit(&settings.audit, None)?;
    let audit_opts = audit_options(&settings.audit);

    let summary = fix_interactive(
        &audit.schema,
        &audit.index,
        &audit.ctx,
        &audit.issues,
        &audit_opts,
        prompt,
    )
    .map_err(CoreError::Runtime)?;

    run.finish();
    Ok(FixRunOutcome {
        report: FixReport::new(settings.audit.vault_root.to_string(), run, summary),
        patches: Vec::new(),
    })
}

type Snapshot = (u64, Vec<AuditIssue>, OwnershipIndex, CorpusContext);

fn audit_snapshot(
    schema: &ResolvedSchema,
    settings: &AuditSettings,
    scope: Option<&dyn ScopeFilter>,
) -> anyhow::Result<Snapshot> {
    let root = &settings.vault_root;
    let index = OwnershipIndex::build(schema, root).context("build ownership index")?;

    let scan_opts = ScanOptions {
        type_filter: settings.type_filter.clone(),
        excludes: settings.config.extra_excludes.clone(),
        ignore: build_ignore_set(&settings.ignore_patterns)?,
    };
    let mut files = scan_vault(schema, root, &index, &scan_opts).context("scan vault")?;
    if let Some(scope) = scope {
        files.retain(|f| scope.matches(f));
    }

    let audit_opts = audit_options(settings);
    let (issues, ctx) =
        audit_vault(schema, &index, root, &files, &audit_opts).context("audit vault")?;

    Ok((files.len() as u64, issues, index, ctx))
}

fn audit_options(settings: &AuditSettings) -> AuditOptions {
    AuditOptions {
        strict: settings.strict,
        only_issue: settings.only_issue,
        ignore_issue: settings.ignore_issue,
        allowed_extra_fields: settings.allowed_extra_fields.clone(),
        suggestion_distance: settings.config.suggestion_distance,
    }
}

fn build_ignore_set(patterns: &[String]) -> anyhow::Result<Option<globset::GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            globset::Glob::new(pattern).with_context(|| format!("ignore pattern `{pattern}`"))?,
        );
    }
    Ok(Some(builder.build().context("compile ignore patterns")?))
}

/// Run `f` inside a bounded rayon pool when a worker cap is set; with no
/// cap, the global pool is used as-is.
fn with_worker_pool<T: Send>(
    workers: usize,
    f: impl FnOnce() -> T + Send,
) -> Result<T, CoreError> {
    if workers == 0 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("build worker pool")
        .map_err(CoreError::Runtime)?;
    Ok(pool.install(f))
}
