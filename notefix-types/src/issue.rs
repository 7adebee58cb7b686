//! Audit issue types: the closed code enumeration, severities, and the
//! per-finding record emitted by the audit engine.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One class of schema/structural deviation.
///
/// Closed enumeration: adding a variant is a schema change for serialized
/// reports, so wire names are stable kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    InvalidFrontmatter,
    OrphanFile,
    InvalidType,
    MissingRequired,
    InvalidOption,
    InvalidListElement,
    UnknownField,
    FormatViolation,
    WrongDirectory,
    OwnedWrongLocation,
    StaleReference,
    AmbiguousLinkTarget,
    SelfReference,
    ParentCycle,
    OwnedNoteReferenced,
    FrontmatterNotAtTop,
    DuplicateFrontmatterKeys,
    MalformedWikilink,
}

impl IssueCode {
    pub const ALL: [IssueCode; 18] = [
        IssueCode::InvalidFrontmatter,
        IssueCode::OrphanFile,
        IssueCode::InvalidType,
        IssueCode::MissingRequired,
        IssueCode::InvalidOption,
        IssueCode::InvalidListElement,
        IssueCode::UnknownField,
        IssueCode::FormatViolation,
        IssueCode::WrongDirectory,
        IssueCode::OwnedWrongLocation,
        IssueCode::StaleReference,
        IssueCode::AmbiguousLinkTarget,
        IssueCode::SelfReference,
        IssueCode::ParentCycle,
        IssueCode::OwnedNoteReferenced,
        IssueCode::FrontmatterNotAtTop,
        IssueCode::DuplicateFrontmatterKeys,
        IssueCode::MalformedWikilink,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::InvalidFrontmatter => "invalid-frontmatter",
            IssueCode::OrphanFile => "orphan-file",
            IssueCode::InvalidType => "invalid-type",
            IssueCode::MissingRequired => "missing-required",
            IssueCode::InvalidOption => "invalid-option",
            IssueCode::InvalidListElement => "invalid-list-element",
            IssueCode::UnknownField => "unknown-field",
            IssueCode::FormatViolation => "format-violation",
            IssueCode::WrongDirectory => "wrong-directory",
            IssueCode::OwnedWrongLocation => "owned-wrong-location",
            IssueCode::StaleReference => "stale-reference",
            IssueCode::AmbiguousLinkTarget => "ambiguous-link-target",
            IssueCode::SelfReference => "self-reference",
            IssueCode::ParentCycle => "parent-cycle",
            IssueCode::OwnedNoteReferenced => "owned-note-referenced",
            IssueCode::FrontmatterNotAtTop => "frontmatter-not-at-top",
            IssueCode::DuplicateFrontmatterKeys => "duplicate-frontmatter-keys",
            IssueCode::MalformedWikilink => "malformed-wikilink",
        }
    }

    pub fn parse(s: &str) -> Option<IssueCode> {
        IssueCode::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One deviation found by the audit engine.
///
/// Issues are never mutated after creation; a fix produces a fresh audit
/// pass, not an edit of the old issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    pub code: IssueCode,
    pub severity: Severity,

    /// Vault-relative path of the offending file.
    pub file: Utf8PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    pub message: String,

    /// Unique deterministic correction, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Structured payload: candidate paths for ambiguous links, cycle
    /// members for parent cycles, the schema default for missing fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl AuditIssue {
    pub fn new(
        code: IssueCode,
        severity: Severity,
        file: impl Into<Utf8PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            file: file.into(),
            field: None,
            message: message.into(),
            suggestion: None,
            extra: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Stable sort key: file, then code, then field.
    pub fn sort_key(&self) -> (String, IssueCode, String) {
        (
            self.file.to_string(),
            self.code,
            self.field.clone().unwrap_or_default(),
        )
    }
}

/// Aggregate counts over an issue collection. A pure projection,
/// recomputed, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: u64,
    pub errors: u64,
    pub warnings: u64,
    pub files_affected: u64,
    #[serde(default)]
    pub by_code: BTreeMap<String, u64>,
}

impl AuditSummary {
    pub fn from_issues(issues: &[AuditIssue]) -> Self {
        let mut summary = AuditSummary {
            total: issues.len() as u64,
            ..Default::default()
        };
        let mut files = std::collections::BTreeSet::new();
        for issue in issues {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
            files.insert(issue.file.as_str());
            *summary.by_code.entry(issue.code.as_str().to_string()).or_default() += 1;
        }
        summary.files_affected = files.len() as u64;
        summary
    }

    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn code_wire_names_are_kebab_case() {
        let json = serde_json::to_string(&IssueCode::DuplicateFrontmatterKeys).unwrap();
        assert_eq!(json, "\"duplicate-frontmatter-keys\"");
        for code in IssueCode::ALL {
            assert_eq!(IssueCode::parse(code.as_str()), Some(code));
        }
    }

    #[test]
    fn summary_counts_by_severity_and_code() {
        let issues = vec![
            AuditIssue::new(IssueCode::MissingRequired, Severity::Error, "a.md", "m")
                .with_field("status"),
            AuditIssue::new(IssueCode::UnknownField, Severity::Warning, "a.md", "m"),
            AuditIssue::new(IssueCode::StaleReference, Severity::Error, "b.md", "m"),
        ];
        let summary = AuditSummary::from_issues(&issues);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.files_affected, 2);
        assert_eq!(summary.by_code["missing-required"], 1);
        assert!(!summary.is_clean());
        assert!(AuditSummary::from_issues(&[]).is_clean());
    }
}
