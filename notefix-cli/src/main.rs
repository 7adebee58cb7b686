mod config;
mod term;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::ConfigMerger;
use notefix_core::{
    AuditSettings, CoreError, FixSettings, RunConfig, exit, run_audit, run_auto_fix,
    run_interactive_fix,
};
use notefix_render::{render_audit_text, render_fix_text};
use notefix_types::issue::IssueCode;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "notefix",
    version,
    about = "Schema-driven audit and repair for vaults of typed markdown notes."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate every note against the vault schema and report deviations.
    Audit(AuditArgs),
    /// Repair issues: deterministic fixes by default, or one at a time
    /// with --interactive.
    Fix(FixArgs),
}

#[derive(Debug, Parser)]
struct SharedArgs {
    /// Vault root directory (default: current directory).
    #[arg(long, default_value = ".")]
    vault_root: Utf8PathBuf,

    /// Restrict the run to one type and its descendants.
    #[arg(long = "type")]
    type_filter: Option<String>,

    /// Treat unknown frontmatter fields as errors.
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Emit only this issue code.
    #[arg(long, value_parser = parse_issue_code)]
    only: Option<IssueCode>,

    /// Suppress this issue code.
    #[arg(long, value_parser = parse_issue_code)]
    ignore: Option<IssueCode>,

    /// Tolerate this extra frontmatter field (repeatable).
    #[arg(long = "allow-field")]
    allow_fields: Vec<String>,

    /// Skip this directory name while scanning (repeatable). Also read
    /// from NOTEFIX_EXCLUDE (colon-separated).
    #[arg(long = "exclude", env = "NOTEFIX_EXCLUDE", value_delimiter = ':')]
    excludes: Vec<String>,

    /// Skip vault-relative paths matching this glob (repeatable).
    #[arg(long = "ignore-path")]
    ignore_paths: Vec<String>,

    /// Bounded worker count for parallel phases.
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Debug, Parser)]
struct AuditArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct FixArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Confirm each fix interactively instead of applying deterministic
    /// fixes in bulk. Requires an attached terminal.
    #[arg(long, default_value_t = false)]
    interactive: bool,

    /// Classify and preview fixes without writing anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_issue_code(s: &str) -> Result<IssueCode, String> {
    IssueCode::parse(s).ok_or_else(|| {
        let known: Vec<&str> = IssueCode::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown issue code `{s}`; known codes: {}", known.join(", "))
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Audit(args) => cmd_audit(args),
        Command::Fix(args) => cmd_fix(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err @ CoreError::Schema(_)) => {
            // Reported once, clearly, before any per-file output would
            // have been produced.
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn build_audit_settings(shared: &SharedArgs) -> Result<AuditSettings, CoreError> {
    let file_config = config::load_or_default(&shared.vault_root)
        .map_err(|e| CoreError::Runtime(e.context("load notefix.toml")))?;
    let merger = ConfigMerger::new(file_config);

    Ok(AuditSettings {
        vault_root: shared.vault_root.clone(),
        type_filter: shared.type_filter.clone(),
        strict: merger.strict(shared.strict),
        only_issue: shared.only,
        ignore_issue: shared.ignore,
        allowed_extra_fields: merger.allowed_extra_fields(&shared.allow_fields),
        ignore_patterns: merger.ignore_patterns(&shared.ignore_paths),
        config: RunConfig {
            workers: merger.workers(shared.workers),
            suggestion_distance: merger.suggestion_distance(None),
            extra_excludes: merger.excludes(&shared.excludes),
        },
    })
}

fn cmd_audit(args: AuditArgs) -> Result<u8, CoreError> {
    let settings = build_audit_settings(&args.shared)?;
    let outcome = run_audit(&settings, None)?;

    match args.format {
        OutputFormat::Text => print!("{}", render_audit_text(&outcome.report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&outcome.report)
                .map_err(|e| CoreError::Runtime(e.into()))?;
            println!("{json}");
        }
    }

    if outcome.report.summary.is_clean() {
        Ok(exit::SUCCESS)
    } else {
        Ok(exit::VALIDATION_FAILED)
    }
}

fn cmd_fix(args: FixArgs) -> Result<u8, CoreError> {
    let settings = FixSettings {
        audit: build_audit_settings(&args.shared)?,
        dry_run: args.dry_run,
    };

    let outcome = if args.interactive {
        if args.dry_run {
            return Err(CoreError::Runtime(anyhow::anyhow!(
                "--interactive and --dry-run are mutually exclusive"
            )));
        }
        let mut prompt = term::TerminalPrompt::new().map_err(CoreError::Runtime)?;
        run_interactive_fix(&settings, &mut prompt)?
    } else {
        run_auto_fix(&settings)?
    };

    for patch in &outcome.patches {
        println!("--- {}", patch.file);
        print!("{}", patch.diff);
    }
    print!("{}", render_fix_text(&outcome.report.summary));

    if outcome.report.summary.is_clean() {
        Ok(exit::SUCCESS)
    } else {
        Ok(exit::VALIDATION_FAILED)
    }
}
