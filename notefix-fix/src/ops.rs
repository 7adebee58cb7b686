//! Edit operations and the deterministic-fix classifier.

use camino::Utf8Path;
use notefix_audit::CorpusContext;
use notefix_schema::ResolvedSchema;
use notefix_types::issue::{AuditIssue, IssueCode};
use notefix_types::value::Value;
use notefix_vault::frontmatter::{self, BlockSpan};

/// One concrete edit to a document.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// Set a frontmatter field, re-serializing the block in schema order.
    SetField { field: String, value: Value },
    /// Replace the first occurrence of a raw snippet inside the block.
    ReplaceRaw { from: String, to: String },
    /// Keep the first occurrence of each duplicated key, drop the rest.
    DedupeKeys,
    /// Move the frontmatter block to the very top of the file.
    RelocateBlock,
}

/// Classify an issue as deterministically fixable. Issues without a
/// unique resolution return `None` and are left untouched.
pub fn classify_auto(
    issue: &AuditIssue,
    schema: &ResolvedSchema,
    ctx: &CorpusContext,
) -> Option<EditOp> {
    match issue.code {
        IssueCode::MissingRequired => {
            let field = issue.field.as_deref()?;
            let declared = ctx.declared_types.get(&issue.file)?.as_deref()?;
            let default = schema.get(declared)?.field(field)?.default.clone()?;
            Some(EditOp::SetField {
                field: field.to_string(),
                value: default,
            })
        }
        IssueCode::InvalidOption => {
            let field = issue.field.clone()?;
            let suggestion = issue.suggestion.clone()?;
            Some(EditOp::SetField {
                field,
                value: Value::String(suggestion),
            })
        }
        IssueCode::MalformedWikilink => {
            let snippet = issue.extra.as_ref()?.get("snippet")?.as_str()?.to_string();
            let to = issue.suggestion.clone()?;
            Some(EditOp::ReplaceRaw { from: snippet, to })
        }
        IssueCode::DuplicateFrontmatterKeys => Some(EditOp::DedupeKeys),
        IssueCode::FrontmatterNotAtTop => Some(EditOp::RelocateBlock),
        _ => None,
    }
}

/// Apply one edit to file contents. `field_order` is the declared type's
/// resolved order, used when the block is re-serialized.
pub fn apply_op(text: &str, op: &EditOp, field_order: &[String]) -> anyhow::Result<String> {
    match op {
        EditOp::SetField { field, value } => {
            let mut doc = frontmatter::parse_document(text)
                .map_err(|e| anyhow::anyhow!("reparse before edit: {e}"))?;
            doc.frontmatter.set(field, value.clone());
            Ok(frontmatter::render_document(&doc, field_order))
        }
        EditOp::ReplaceRaw { from, to } => {
            let block = located_block(text)?;
            if !block.raw.contains(from.as_str()) {
                anyhow::bail!("snippet `{from}` not found in frontmatter block");
            }
            let new_raw = block.raw.replacen(from.as_str(), to, 1);
            Ok(replace_block(text, &block, &new_raw))
        }
        EditOp::DedupeKeys => {
            let block = located_block(text)?;
            let new_raw = frontmatter::dedupe_block(&block.raw);
            Ok(replace_block(text, &block, &new_raw))
        }
        EditOp::RelocateBlock => {
            let block = located_block(text)?;
            Ok(relocate_block(text, &block))
        }
    }
}

fn located_block(text: &str) -> anyhow::Result<BlockSpan> {
    frontmatter::locate_block(text)
        .ok_or_else(|| anyhow::anyhow!("no frontmatter block to edit"))
}

fn replace_block(text: &str, block: &BlockSpan, new_raw: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<&str> = Vec::new();
    out.extend(&lines[..=block.start_line]);
    out.extend(new_raw.lines());
    out.extend(&lines[block.end_line..]);
    finish_lines(out, text)
}

fn relocate_block(text: &str, block: &BlockSpan) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<&str> = vec!["---"];
    out.extend(block.raw.lines());
    out.push("---");
    for (i, line) in lines.iter().enumerate() {
        if i >= block.start_line && i <= block.end_line {
            continue;
        }
        out.push(line);
    }
    finish_lines(out, text)
}

fn finish_lines(lines: Vec<&str>, original: &str) -> String {
    let mut out = lines.join("\n");
    if original.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Schema field order for a file's declared type, empty when unknown.
pub(crate) fn field_order_for(
    schema: &ResolvedSchema,
    ctx: &CorpusContext,
    rel: &Utf8Path,
) -> Vec<String> {
    ctx.declared_types
        .get(rel)
        .and_then(|t| t.as_deref())
        .and_then(|t| schema.get(t))
        .map(|ty| ty.field_order.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_field_reserializes_in_order() {
        let text = "---\nstatus: rae\ntype: idea\n---\nBody\n";
        let order = vec!["type".to_string(), "status".to_string()];
        let out = apply_op(
            text,
            &EditOp::SetField {
                field: "status".into(),
                value: Value::String("raw".into()),
            },
            &order,
        )
        .unwrap();
        assert_eq!(out, "---\ntype: idea\nstatus: raw\n---\nBody\n");
    }

    #[test]
    fn replace_raw_rewrites_first_occurrence() {
        let text = "---\nparent: \"[[Broken]\"\n---\n";
        let out = apply_op(
            text,
            &EditOp::ReplaceRaw {
                from: "[[Broken]".into(),
                to: "[[Broken]]".into(),
            },
            &[],
        )
        .unwrap();
        assert_eq!(out, "---\nparent: \"[[Broken]]\"\n---\n");
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let text = "---\nstatus: raw\nstatus: active\n---\nBody\n";
        let out = apply_op(text, &EditOp::DedupeKeys, &[]).unwrap();
        assert_eq!(out, "---\nstatus: raw\n---\nBody\n");
    }

    #[test]
    fn relocate_moves_block_to_top() {
        let text = "# Title\n---\ntype: idea\n---\nBody\n";
        let out = apply_op(text, &EditOp::RelocateBlock, &[]).unwrap();
        assert_eq!(out, "---\ntype: idea\n---\n# Title\nBody\n");
    }

    #[test]
    fn replace_raw_fails_when_snippet_gone() {
        let text = "---\ntype: idea\n---\n";
        let err = apply_op(
            text,
            &EditOp::ReplaceRaw {
                from: "[[x]".into(),
                to: "[[x]]".into(),
            },
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
