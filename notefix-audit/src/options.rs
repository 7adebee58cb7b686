use notefix_types::issue::IssueCode;

/// Run options for the audit engine.
#[derive(Debug, Clone)]
pub struct AuditOptions {
    /// Escalate `unknown-field` to an error.
    pub strict: bool,

    /// Emit only this code. Applied after detection, so summaries built
    /// upstream still reflect ground truth.
    pub only_issue: Option<IssueCode>,

    /// Suppress exactly this code. Applied after detection.
    pub ignore_issue: Option<IssueCode>,

    /// Frontmatter keys tolerated on every type, in addition to the
    /// schema's own allowance list.
    pub allowed_extra_fields: Vec<String>,

    /// Edit-distance bound for `invalid-option` suggestions.
    pub suggestion_distance: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            strict: false,
            only_issue: None,
            ignore_issue: None,
            allowed_extra_fields: Vec::new(),
            suggestion_distance: 2,
        }
    }
}
