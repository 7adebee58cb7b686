//! Bidirectional ownership index over a filesystem snapshot.
//!
//! Owned documents live in `<owner-storage>/<Instance>/<child-type>/`;
//! the index records which owner instance claims each of them. Built once
//! per run, read-only afterwards.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use notefix_schema::ResolvedSchema;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipInfo {
    /// Vault-relative path of the owner instance document.
    pub owner_path: Utf8PathBuf,
    pub owner_type: String,
    pub field_name: String,
}

#[derive(Debug, Clone)]
struct OwnedEntry {
    info: OwnershipInfo,
    child_type: String,
}

/// Verdict of `can_reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceCheck {
    Valid,
    /// The target is owned and the referencing file is not its owner.
    ReferencingOwned { owner_path: Utf8PathBuf },
}

impl ReferenceCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, ReferenceCheck::Valid)
    }
}

/// Verdict of `validate_new_owned`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedClaimCheck {
    Valid,
    /// The path is already indexed under a different owner.
    AlreadyOwned { owner_path: Utf8PathBuf },
}

impl OwnedClaimCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, OwnedClaimCheck::Valid)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OwnershipIndex {
    owned: BTreeMap<Utf8PathBuf, OwnedEntry>,
    owner_to_owned: BTreeMap<Utf8PathBuf, BTreeSet<Utf8PathBuf>>,
}

impl OwnershipIndex {
    /// Build the index from the vault snapshot. Empty when no type
    /// declares ownership.
    pub fn build(schema: &ResolvedSchema, root: &Utf8Path) -> anyhow::Result<Self> {
        let mut index = OwnershipIndex::default();

        for owner_type in schema.ownership.owner_types() {
            let Some(storage) = schema.storage_dir(owner_type) else {
                continue;
            };
            let abs_storage = root.join(&storage);
            if !abs_storage.is_dir() {
                continue;
            }

            let mut subdirs: Vec<Utf8PathBuf> = Vec::new();
            for entry in fs::read_dir(abs_storage.as_std_path())
                .with_context(|| format!("read {abs_storage}"))?
            {
                let entry = entry?;
                let path = Utf8PathBuf::from_path_buf(entry.path())
                    .map_err(|p| anyhow::anyhow!("non-utf8 path: {}", p.display()))?;
                if path.is_dir() {
                    subdirs.push(path);
                }
            }
            subdirs.sort();

            for dir in subdirs {
                let Some(instance) = dir.file_name() else {
                    continue;
                };
                // Owner instance: a folder containing a same-named document.
                let owner_doc = dir.join(format!("{instance}.md"));
                if !owner_doc.is_file() {
                    continue;
                }
                let owner_rel = storage.join(instance).join(format!("{instance}.md"));

                for entry in schema.ownership.owned_fields_of(owner_type) {
                    let child_dir = dir.join(&entry.child_type);
                    if !child_dir.is_dir() {
                        continue;
                    }
                    index.claim_dir(
                        root,
                        &child_dir,
                        &owner_rel,
                        owner_type,
                        &entry.field_name,
                        &entry.child_type,
                    );
                }
            }
        }

        Ok(index)
    }

    fn claim_dir(
        &mut self,
        root: &Utf8Path,
        child_dir: &Utf8Path,
        owner_rel: &Utf8Path,
        owner_type: &str,
        field_name: &str,
        child_type: &str,
    ) {
        for entry in WalkDir::new(child_dir).sort_by_file_name() {
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

            if let Some(existing) = self.owned.get(rel) {
                // Directory geometry makes double claims impossible, but
                // assert it defensively.
                debug!(
                    path = %rel,
                    first = %existing.info.owner_path,
                    second = %owner_rel,
                    "owned path claimed twice; keeping first claim"
                );
                continue;
            }

            self.owned.insert(
                rel.to_path_buf(),
                OwnedEntry {
                    info: OwnershipInfo {
                        owner_path: owner_rel.to_path_buf(),
                        owner_type: owner_type.to_string(),
                        field_name: field_name.to_string(),
                    },
                    child_type: child_type.to_string(),
                },
            );
            self.owner_to_owned
                .entry(owner_rel.to_path_buf())
                .or_default()
                .insert(rel.to_path_buf());
        }
    }

    /// O(1) owner lookup by vault-relative path.
    pub fn owner_of(&self, rel: &Utf8Path) -> Option<&OwnershipInfo> {
        self.owned.get(rel).map(|e| &e.info)
    }

    /// All owned notes: `(path, owner info, child type)`.
    pub fn owned_notes(&self) -> impl Iterator<Item = (&Utf8PathBuf, &OwnershipInfo, &str)> {
        self.owned
            .iter()
            .map(|(rel, e)| (rel, &e.info, e.child_type.as_str()))
    }

    pub fn owned_by_owner(&self, owner_rel: &Utf8Path) -> Option<&BTreeSet<Utf8PathBuf>> {
        self.owner_to_owned.get(owner_rel)
    }

    /// A reference is valid when the target is unowned or when the
    /// referencing file is the owner itself.
    pub fn can_reference(&self, from: &Utf8Path, to: &Utf8Path) -> ReferenceCheck {
        match self.owner_of(to) {
            None => ReferenceCheck::Valid,
            Some(info) if info.owner_path == from => ReferenceCheck::Valid,
            Some(info) => ReferenceCheck::ReferencingOwned {
                owner_path: info.owner_path.clone(),
            },
        }
    }

    /// Claiming under the same owner is idempotent; a claim under a
    /// different owner is rejected.
    pub fn validate_new_owned(&self, new: &Utf8Path, proposed_owner: &Utf8Path) -> OwnedClaimCheck {
        match self.owner_of(new) {
            Some(info) if info.owner_path != proposed_owner => OwnedClaimCheck::AlreadyOwned {
                owner_path: info.owner_path.clone(),
            },
            _ => OwnedClaimCheck::Valid,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notefix_schema::resolve_schema;
    use notefix_types::schema_doc::SchemaDoc;
    use tempfile::TempDir;

    fn draft_schema() -> ResolvedSchema {
        let doc: SchemaDoc = serde_json::from_str(
            r#"{ "version": 1, "types": {
                "research": {},
                "draft": {
                  "fields": {
                    "research": { "kind": "dynamic", "source_types": ["research"], "multiple": true, "owned": true }
                  }
                }
            } }"#,
        )
        .unwrap();
        resolve_schema(&doc).unwrap()
    }

    fn vault() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (temp, root)
    }

    fn write(root: &Utf8Path, rel: &str, contents: &str) {
        let abs = root.join(rel);
        fs::create_dir_all(abs.parent().unwrap()).unwrap();
        fs::write(abs.as_std_path(), contents).unwrap();
    }

    #[test]
    fn standalone_note_is_unowned() {
        let schema = draft_schema();
        let (_t, root) = vault();
        write(&root, "researches/Y.md", "---\ntype: research\n---\n");

        let index = OwnershipIndex::build(&schema, &root).unwrap();
        assert!(index.owner_of(Utf8Path::new("researches/Y.md")).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn nested_note_is_owned_by_instance() {
        let schema = draft_schema();
        let (_t, root) = vault();
        write(&root, "drafts/X/X.md", "---\ntype: draft\n---\n");
        write(&root, "drafts/X/research/Y.md", "---\ntype: research\n---\n");

        let index = OwnershipIndex::build(&schema, &root).unwrap();
        let info = index
            .owner_of(Utf8Path::new("drafts/X/research/Y.md"))
            .expect("owned");
        assert_eq!(info.owner_path, Utf8PathBuf::from("drafts/X/X.md"));
        assert_eq!(info.owner_type, "draft");
        assert_eq!(info.field_name, "research");

        let owned = index
            .owned_by_owner(Utf8Path::new("drafts/X/X.md"))
            .unwrap();
        assert!(owned.contains(Utf8Path::new("drafts/X/research/Y.md")));
    }

    #[test]
    fn folder_without_owner_doc_claims_nothing() {
        let schema = draft_schema();
        let (_t, root) = vault();
        // No drafts/X/X.md, so X is not an owner instance.
        write(&root, "drafts/X/research/Y.md", "---\ntype: research\n---\n");

        let index = OwnershipIndex::build(&schema, &root).unwrap();
        assert!(index.owner_of(Utf8Path::new("drafts/X/research/Y.md")).is_none());
    }

    #[test]
    fn can_reference_enforces_owner_exclusivity() {
        let schema = draft_schema();
        let (_t, root) = vault();
        write(&root, "drafts/X/X.md", "---\ntype: draft\n---\n");
        write(&root, "drafts/X/research/Y.md", "---\ntype: research\n---\n");
        write(&root, "drafts/Other/Other.md", "---\ntype: draft\n---\n");

        let index = OwnershipIndex::build(&schema, &root).unwrap();

        assert!(index
            .can_reference(
                Utf8Path::new("drafts/X/X.md"),
                Utf8Path::new("drafts/X/research/Y.md")
            )
            .is_valid());

        let check = index.can_reference(
            Utf8Path::new("drafts/Other/Other.md"),
            Utf8Path::new("drafts/X/research/Y.md"),
        );
        assert_eq!(
            check,
            ReferenceCheck::ReferencingOwned {
                owner_path: Utf8PathBuf::from("drafts/X/X.md")
            }
        );

        // Unowned targets are always fine.
        assert!(index
            .can_reference(
                Utf8Path::new("drafts/Other/Other.md"),
                Utf8Path::new("drafts/X/X.md")
            )
            .is_valid());
    }

    #[test]
    fn validate_new_owned_is_idempotent_for_same_owner() {
        let schema = draft_schema();
        let (_t, root) = vault();
        write(&root, "drafts/X/X.md", "---\ntype: draft\n---\n");
        write(&root, "drafts/X/research/Y.md", "---\ntype: research\n---\n");

        let index = OwnershipIndex::build(&schema, &root).unwrap();

        assert!(index
            .validate_new_owned(
                Utf8Path::new("drafts/X/research/Y.md"),
                Utf8Path::new("drafts/X/X.md")
            )
            .is_valid());

        let check = index.validate_new_owned(
            Utf8Path::new("drafts/X/research/Y.md"),
            Utf8Path::new("drafts/Other/Other.md"),
        );
        assert_eq!(
            check,
            OwnedClaimCheck::AlreadyOwned {
                owner_path: Utf8PathBuf::from("drafts/X/X.md")
            }
        );
    }
}
