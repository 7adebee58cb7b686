//! The corpus snapshot shared by reference-graph checks and by the repair
//! pipeline's file-scoped re-audits.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;

/// Indexes built once per audit run from the complete file set. Read-only
/// afterwards; file-scoped re-audits reuse them because a frontmatter
/// rewrite never changes filenames.
#[derive(Debug, Clone, Default)]
pub struct CorpusContext {
    pub root: Utf8PathBuf,

    /// Basename (file stem) to every vault-relative path carrying it.
    pub filename_index: BTreeMap<String, Vec<Utf8PathBuf>>,

    /// Content hash of each file as audited, hex sha256. The repair
    /// pipeline checks these before writing.
    pub file_hashes: BTreeMap<Utf8PathBuf, String>,

    /// Declared type per file (None when missing or unparsable).
    pub declared_types: BTreeMap<Utf8PathBuf, Option<String>>,

    /// Resolved `parent` reference per recursive-typed file.
    pub parent_edges: BTreeMap<Utf8PathBuf, Utf8PathBuf>,
}

impl CorpusContext {
    /// Resolve a wikilink target by basename. Targets may carry a folder
    /// qualifier (`folder/Note`); only the final component is indexed.
    pub fn resolve_target(&self, target: &str) -> &[Utf8PathBuf] {
        let basename = target.rsplit('/').next().unwrap_or(target).trim();
        self.filename_index
            .get(basename)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn hash_of(&self, rel: &Utf8Path) -> Option<&str> {
        self.file_hashes.get(rel).map(String::as_str)
    }
}
