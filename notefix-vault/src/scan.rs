//! Corpus discovery: enumerate candidate documents from the vault root
//! according to each type's storage location, respecting exclusions.

use crate::ownership::{OwnershipIndex, OwnershipInfo};
use crate::META_DIR;
use camino::{Utf8Path, Utf8PathBuf};
use globset::GlobSet;
use notefix_schema::ResolvedSchema;
use std::collections::BTreeMap;
use tracing::debug;
use walkdir::WalkDir;

/// A document discovered by the scanner. Created fresh each run, never
/// persisted. `expected_type` comes from the directory scan and is not
/// yet confirmed against the document's own frontmatter.
#[derive(Debug, Clone)]
pub struct ManagedFile {
    pub path: Utf8PathBuf,
    pub relative_path: Utf8PathBuf,
    pub expected_type: Option<String>,
    pub instance_folder: Option<Utf8PathBuf>,
    pub ownership: Option<OwnershipInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Restrict the scan to one type and its descendants.
    pub type_filter: Option<String>,
    /// Directory names to skip, in addition to the schema metadata
    /// directory. Trailing separators are stripped.
    pub excludes: Vec<String>,
    /// Optional ignore-pattern matcher over vault-relative paths.
    pub ignore: Option<GlobSet>,
}

/// Enumerate the corpus. With a type filter set, collects from the
/// storage directories of the type and its descendants plus owned
/// instances reachable through the ownership index.
pub fn scan_vault(
    schema: &ResolvedSchema,
    root: &Utf8Path,
    index: &OwnershipIndex,
    opts: &ScanOptions,
) -> anyhow::Result<Vec<ManagedFile>> {
    let excludes = normalized_excludes(schema, opts);

    let mut files: BTreeMap<Utf8PathBuf, ManagedFile> = BTreeMap::new();
    match &opts.type_filter {
        None => scan_all(schema, root, index, &excludes, opts, &mut files),
        Some(type_name) => scan_typed(schema, root, index, &excludes, opts, type_name, &mut files),
    }

    debug!(count = files.len(), "scan complete");
    Ok(files.into_values().collect())
}

fn normalized_excludes(schema: &ResolvedSchema, opts: &ScanOptions) -> Vec<String> {
    let mut out = vec![META_DIR.to_string()];
    let configured = schema.config.ignored_directories.iter();
    for name in configured.chain(opts.excludes.iter()) {
        let trimmed = name.trim_end_matches(['/', '\\']).to_string();
        if !trimmed.is_empty() && !out.contains(&trimmed) {
            out.push(trimmed);
        }
    }
    out
}

fn is_excluded(rel: &Utf8Path, excludes: &[String], ignore: &Option<GlobSet>) -> bool {
    for component in rel.components() {
        let name = component.as_str();
        if name.starts_with('.') || excludes.iter().any(|e| e == name) {
            return true;
        }
    }
    if let Some(set) = ignore
        && set.is_match(rel.as_std_path())
    {
        return true;
    }
    false
}

fn scan_all(
    schema: &ResolvedSchema,
    root: &Utf8Path,
    index: &OwnershipIndex,
    excludes: &[String],
    opts: &ScanOptions,
    files: &mut BTreeMap<Utf8PathBuf, ManagedFile>,
) {
    // Longest storage prefix wins when type directories nest.
    let mut dirs: Vec<(Utf8PathBuf, String)> = schema
        .types
        .keys()
        .filter_map(|name| schema.storage_dir(name).map(|d| (d, name.clone())))
        .collect();
    dirs.sort_by_key(|(d, _)| std::cmp::Reverse(d.components().count()));

    for entry in WalkDir::new(root).sort_by_file_name() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = Utf8Path::from_path(entry.path()) else {
            continue;
        };
        if path.extension() != Some("md") {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        if is_excluded(rel, excludes, &opts.ignore) {
            continue;
        }

        let expected_type = rel.parent().and_then(|parent| {
            dirs.iter()
                .find(|(dir, _)| parent.starts_with(dir))
                .map(|(_, name)| name.clone())
        });

        insert_file(files, root, rel, expected_type, index);
    }
}

fn scan_typed(
    schema: &ResolvedSchema,
    root: &Utf8Path,
    index: &OwnershipIndex,
    excludes: &[String],
    opts: &ScanOptions,
    type_name: &str,
    files: &mut BTreeMap<Utf8PathBuf, ManagedFile>,
) {
    let selected = schema.with_descendants(type_name);

    for name in &selected {
        let Some(storage) = schema.storage_dir(name) else {
            continue;
        };
        let abs = root.join(&storage);
        if !abs.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&abs).sort_by_file_name() {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                continue;
            };
            if path.extension() != Some("md") {
                continue;
            }
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            if is_excluded(rel, excludes, &opts.ignore) {
                continue;
            }
            // Owned instances are collected through the index below, with
            // their ownership metadata attached.
            if index.owner_of(rel).is_some() {
                continue;
            }
            insert_typed(files, root, rel, Some(name.clone()), None);
        }
    }

    for (rel, info, child_type) in index.owned_notes() {
        if !selected.iter().any(|n| n == child_type) {
            continue;
        }
        if is_excluded(rel, excludes, &opts.ignore) {
            continue;
        }
        insert_typed(
            files,
            root,
            rel,
            Some(child_type.to_string()),
            Some(info.clone()),
        );
    }
}

fn insert_file(
    files: &mut BTreeMap<Utf8PathBuf, ManagedFile>,
    root: &Utf8Path,
    rel: &Utf8Path,
    expected_type: Option<String>,
    index: &OwnershipIndex,
) {
    let ownership = index.owner_of(rel).cloned();
    files.insert(
        rel.to_path_buf(),
        ManagedFile {
            path: root.join(rel),
            relative_path: rel.to_path_buf(),
            expected_type,
            instance_folder: instance_folder_of(rel),
            ownership,
        },
    );
}

fn insert_typed(
    files: &mut BTreeMap<Utf8PathBuf, ManagedFile>,
    root: &Utf8Path,
    rel: &Utf8Path,
    expected_type: Option<String>,
    ownership: Option<OwnershipInfo>,
) {
    files.insert(
        rel.to_path_buf(),
        ManagedFile {
            path: root.join(rel),
            relative_path: rel.to_path_buf(),
            expected_type,
            instance_folder: instance_folder_of(rel),
            ownership,
        },
    );
}

/// `drafts/X/X.md` sits in its own instance folder `drafts/X`.
pub fn instance_folder_of(rel: &Utf8Path) -> Option<Utf8PathBuf> {
    let stem = rel.file_stem()?;
    let parent = rel.parent()?;
    if parent.file_name() == Some(stem) {
        Some(parent.to_path_buf())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notefix_schema::resolve_schema;
    use notefix_types::schema_doc::SchemaDoc;
    use tempfile::TempDir;

    fn schema() -> ResolvedSchema {
        let doc: SchemaDoc = serde_json::from_str(
            r#"{ "version": 1,
                 "types": {
                   "idea": {},
                   "research": {},
                   "draft": {
                     "fields": {
                       "research": { "kind": "dynamic", "source_types": ["research"], "multiple": true, "owned": true }
                     }
                   },
                   "spark": { "extends": "idea" }
                 },
                 "config": { "ignored_directories": ["templates/"] } }"#,
        )
        .unwrap();
        resolve_schema(&doc).unwrap()
    }

    fn vault() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (temp, root)
    }

    fn write(root: &Utf8Path, rel: &str) {
        let abs = root.join(rel);
        fs_err::create_dir_all(abs.parent().unwrap()).unwrap();
        fs_err::write(&abs, "---\ntype: idea\n---\n").unwrap();
    }

    fn rels(files: &[ManagedFile]) -> Vec<&str> {
        files.iter().map(|f| f.relative_path.as_str()).collect()
    }

    #[test]
    fn unfiltered_scan_skips_hidden_excluded_and_meta() {
        let s = schema();
        let (_t, root) = vault();
        write(&root, "ideas/a.md");
        write(&root, "meta/schema-notes.md");
        write(&root, "templates/t.md");
        write(&root, ".obsidian/cache.md");
        write(&root, "stray.md");

        let index = OwnershipIndex::default();
        let files = scan_vault(&s, &root, &index, &ScanOptions::default()).unwrap();
        assert_eq!(rels(&files), vec!["ideas/a.md", "stray.md"]);

        let idea = files.iter().find(|f| f.relative_path == "ideas/a.md").unwrap();
        assert_eq!(idea.expected_type.as_deref(), Some("idea"));
        let stray = files.iter().find(|f| f.relative_path == "stray.md").unwrap();
        assert!(stray.expected_type.is_none());
    }

    #[test]
    fn extra_excludes_are_normalized() {
        let s = schema();
        let (_t, root) = vault();
        write(&root, "ideas/a.md");
        write(&root, "archive/old.md");

        let index = OwnershipIndex::default();
        let opts = ScanOptions {
            excludes: vec!["archive/".to_string()],
            ..Default::default()
        };
        let files = scan_vault(&s, &root, &index, &opts).unwrap();
        assert_eq!(rels(&files), vec!["ideas/a.md"]);
    }

    #[test]
    fn ignore_patterns_filter_paths() {
        let s = schema();
        let (_t, root) = vault();
        write(&root, "ideas/a.md");
        write(&root, "ideas/scratch-a.md");

        let mut builder = globset::GlobSetBuilder::new();
        builder.add(globset::Glob::new("**/scratch-*.md").unwrap());
        let opts = ScanOptions {
            ignore: Some(builder.build().unwrap()),
            ..Default::default()
        };

        let index = OwnershipIndex::default();
        let files = scan_vault(&s, &root, &index, &opts).unwrap();
        assert_eq!(rels(&files), vec!["ideas/a.md"]);
    }

    #[test]
    fn type_filter_includes_descendants_and_owned() {
        let s = schema();
        let (_t, root) = vault();
        write(&root, "ideas/a.md");
        write(&root, "ideas/sparks/s.md");
        write(&root, "drafts/X/X.md");
        write(&root, "drafts/X/research/Y.md");
        write(&root, "researches/standalone.md");

        let index = OwnershipIndex::build(&s, &root).unwrap();

        // `idea` + descendant `spark`.
        let opts = ScanOptions {
            type_filter: Some("idea".to_string()),
            ..Default::default()
        };
        let files = scan_vault(&s, &root, &index, &opts).unwrap();
        assert_eq!(rels(&files), vec!["ideas/a.md", "ideas/sparks/s.md"]);
        let spark = files
            .iter()
            .find(|f| f.relative_path == "ideas/sparks/s.md")
            .unwrap();
        assert_eq!(spark.expected_type.as_deref(), Some("spark"));

        // `research` pulls in the owned instance with metadata.
        let opts = ScanOptions {
            type_filter: Some("research".to_string()),
            ..Default::default()
        };
        let files = scan_vault(&s, &root, &index, &opts).unwrap();
        assert_eq!(
            rels(&files),
            vec!["drafts/X/research/Y.md", "researches/standalone.md"]
        );
        let owned = files
            .iter()
            .find(|f| f.relative_path == "drafts/X/research/Y.md")
            .unwrap();
        let info = owned.ownership.as_ref().unwrap();
        assert_eq!(info.owner_path, Utf8PathBuf::from("drafts/X/X.md"));
        assert_eq!(info.field_name, "research");
    }

    #[test]
    fn instance_folder_detected() {
        assert_eq!(
            instance_folder_of(Utf8Path::new("drafts/X/X.md")),
            Some(Utf8PathBuf::from("drafts/X"))
        );
        assert_eq!(instance_folder_of(Utf8Path::new("drafts/X/notes.md")), None);
    }
}
