//! Plain settings structs for the pipelines. The CLI (or any embedder)
//! fills these in; the core never reads argv or the environment.

use camino::Utf8PathBuf;
use notefix_types::issue::IssueCode;

/// Run-wide knobs threaded through the call graph.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Bounded worker count for parallel phases. `0` uses the machine
    /// default.
    pub workers: usize,

    /// Edit-distance bound for `invalid-option` suggestions.
    pub suggestion_distance: usize,

    /// Extra excluded directory names (the caller resolves environment
    /// sources like `NOTEFIX_EXCLUDE` into this list).
    pub extra_excludes: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            suggestion_distance: 2,
            extra_excludes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub vault_root: Utf8PathBuf,

    /// Restrict the scan to one type and its descendants.
    pub type_filter: Option<String>,

    pub strict: bool,
    pub only_issue: Option<IssueCode>,
    pub ignore_issue: Option<IssueCode>,
    pub allowed_extra_fields: Vec<String>,

    /// Glob patterns over vault-relative paths to ignore while scanning.
    pub ignore_patterns: Vec<String>,

    pub config: RunConfig,
}

impl AuditSettings {
    pub fn new(vault_root: Utf8PathBuf) -> Self {
        Self {
            vault_root,
            type_filter: None,
            strict: false,
            only_issue: None,
            ignore_issue: None,
            allowed_extra_fields: Vec::new(),
            ignore_patterns: Vec::new(),
            config: RunConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixSettings {
    pub audit: AuditSettings,
    pub dry_run: bool,
}
