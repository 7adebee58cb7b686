//! The write-then-reverify-or-rollback contract shared by auto and
//! interactive modes.

use crate::ops::{EditOp, apply_op, field_order_for};
use camino::{Utf8Path, Utf8PathBuf};
use notefix_audit::{AuditOptions, CorpusContext, audit_single_file};
use notefix_schema::ResolvedSchema;
use notefix_types::issue::AuditIssue;
use notefix_vault::{ManagedFile, OwnershipIndex, instance_folder_of, write_atomic};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FixError {
    /// The file on disk no longer matches the audited snapshot.
    #[error("precondition mismatch: {path} changed since the audit")]
    Precondition { path: Utf8PathBuf },

    /// The re-audit still reported the issue; the write was rolled back.
    #[error("fix did not resolve `{code}` on {path}; write rolled back")]
    Unresolved { path: Utf8PathBuf, code: String },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Mutable per-file state for a sequence of fixes against one document.
pub(crate) struct FileFixer<'a> {
    schema: &'a ResolvedSchema,
    index: &'a OwnershipIndex,
    ctx: &'a CorpusContext,
    audit_opts: &'a AuditOptions,
    rel: Utf8PathBuf,
    abs: Utf8PathBuf,
    text: String,
}

impl<'a> FileFixer<'a> {
    /// Load the file and check it still matches the audited snapshot.
    pub(crate) fn open(
        schema: &'a ResolvedSchema,
        index: &'a OwnershipIndex,
        ctx: &'a CorpusContext,
        audit_opts: &'a AuditOptions,
        rel: &Utf8Path,
    ) -> Result<Self, FixError> {
        let abs = ctx.root.join(rel);
        let text = fs_err::read_to_string(&abs)
            .map_err(|e| FixError::Io(anyhow::Error::new(e).context(format!("read {abs}"))))?;

        if let Some(expected) = ctx.hash_of(rel)
            && sha256_hex(text.as_bytes()) != expected
        {
            return Err(FixError::Precondition {
                path: rel.to_path_buf(),
            });
        }

        Ok(Self {
            schema,
            index,
            ctx,
            audit_opts,
            rel: rel.to_path_buf(),
            abs,
            text,
        })
    }

    pub(crate) fn current_text(&self) -> &str {
        &self.text
    }

    /// Apply one edit in memory without touching disk. Used by dry runs.
    pub(crate) fn preview(&mut self, op: &EditOp) -> anyhow::Result<()> {
        let order = field_order_for(self.schema, self.ctx, &self.rel);
        self.text = apply_op(&self.text, op, &order)?;
        Ok(())
    }

    /// Apply one edit, write atomically, re-audit this file, and roll the
    /// write back if the originating `(code, field)` pair is still
    /// reported.
    pub(crate) fn attempt(&mut self, issue: &AuditIssue, op: &EditOp) -> Result<(), FixError> {
        let order = field_order_for(self.schema, self.ctx, &self.rel);
        let new_text = apply_op(&self.text, op, &order)?;

        write_atomic(&self.abs, &new_text)?;

        let reverified = audit_single_file(
            self.schema,
            self.index,
            self.ctx,
            &self.managed_file(),
            self.audit_opts,
        )?;

        let still_present = reverified
            .iter()
            .any(|i| i.code == issue.code && i.field == issue.field);
        if still_present {
            write_atomic(&self.abs, &self.text)?;
            debug!(path = %self.rel, code = %issue.code, "fix reverify failed; rolled back");
            return Err(FixError::Unresolved {
                path: self.rel.clone(),
                code: issue.code.to_string(),
            });
        }

        self.text = new_text;
        Ok(())
    }

    fn managed_file(&self) -> ManagedFile {
        ManagedFile {
            path: self.abs.clone(),
            relative_path: self.rel.clone(),
            expected_type: None,
            instance_folder: instance_folder_of(&self.rel),
            ownership: self.index.owner_of(&self.rel).cloned(),
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
