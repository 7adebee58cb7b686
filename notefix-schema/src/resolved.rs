//! Resolved type graph: the immutable output of schema resolution,
//! computed once at the start of a run.

use crate::pluralize::pluralize;
use camino::Utf8PathBuf;
use notefix_types::schema_doc::{FieldKind, RawField, SchemaConfig};
use notefix_types::value::Value;
use std::collections::BTreeMap;

/// The implicit root type. Synthesized when the raw schema omits it.
pub const ROOT_TYPE: &str = "meta";

/// The frontmatter key that declares a document's type.
pub const TYPE_FIELD: &str = "type";

/// An effective (merged) field on a resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub label: Option<String>,
    pub format: Option<String>,
    pub filter: Option<String>,
}

impl Field {
    pub fn from_raw(name: &str, raw: &RawField) -> Self {
        Self {
            name: name.to_string(),
            kind: raw.kind.clone(),
            required: raw.required,
            default: raw.default.clone(),
            label: raw.label.clone(),
            format: raw.format.clone(),
            filter: raw.filter.clone(),
        }
    }

    /// Whether this field holds cross-references to other notes.
    pub fn is_reference(&self) -> bool {
        self.kind.is_reference()
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    /// Parent chain, immediate parent first, root last. Never contains a
    /// repeated element (guaranteed by cycle validation).
    pub ancestors: Vec<String>,
    /// Effective field set: every name reachable from any ancestor plus
    /// the type's own.
    pub fields: BTreeMap<String, Field>,
    /// Complete permutation of `fields` keys.
    pub field_order: Vec<String>,
    pub body_sections: Vec<String>,
    pub recursive: bool,
    pub output_dir: Option<Utf8PathBuf>,
    pub filename_pattern: Option<String>,
    pub plural: String,
}

impl ResolvedType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnsEntry {
    pub field_name: String,
    pub child_type: String,
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedByEntry {
    pub owner_type: String,
    pub field_name: String,
    pub multiple: bool,
}

/// Bidirectional index of ownership declarations, derived from resolved
/// fields with `owned = true`.
#[derive(Debug, Clone, Default)]
pub struct OwnershipMap {
    owns: BTreeMap<String, Vec<OwnsEntry>>,
    owned_by: BTreeMap<String, Vec<OwnedByEntry>>,
}

impl OwnershipMap {
    pub fn insert(&mut self, owner_type: &str, entry: OwnsEntry) {
        self.owned_by
            .entry(entry.child_type.clone())
            .or_default()
            .push(OwnedByEntry {
                owner_type: owner_type.to_string(),
                field_name: entry.field_name.clone(),
                multiple: entry.multiple,
            });
        self.owns.entry(owner_type.to_string()).or_default().push(entry);
    }

    /// Sort `canBeOwnedBy` entries by owner type for determinism.
    pub fn finish(&mut self) {
        for entries in self.owned_by.values_mut() {
            entries.sort_by(|a, b| {
                (&a.owner_type, &a.field_name).cmp(&(&b.owner_type, &b.field_name))
            });
        }
    }

    pub fn owned_fields_of(&self, owner_type: &str) -> &[OwnsEntry] {
        self.owns.get(owner_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn owners_of(&self, child_type: &str) -> &[OwnedByEntry] {
        self.owned_by
            .get(child_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn can_be_owned(&self, child_type: &str) -> bool {
        !self.owners_of(child_type).is_empty()
    }

    pub fn owner_types(&self) -> impl Iterator<Item = &String> {
        self.owns.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.owns.is_empty()
    }
}

/// The resolved type graph plus enums, ownership, and schema config.
/// Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub types: BTreeMap<String, ResolvedType>,
    pub enums: BTreeMap<String, Vec<String>>,
    pub ownership: OwnershipMap,
    pub config: SchemaConfig,
}

impl ResolvedSchema {
    pub fn get(&self, name: &str) -> Option<&ResolvedType> {
        self.types.get(name)
    }

    pub fn enum_values(&self, name: &str) -> &[String] {
        self.enums.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Storage-location rule: the type's own explicit directory, else the
    /// nearest ancestor's explicit directory, else the pluralized ancestor
    /// chain joined root-to-leaf (root type excluded).
    pub fn storage_dir(&self, type_name: &str) -> Option<Utf8PathBuf> {
        let ty = self.get(type_name)?;
        if let Some(dir) = &ty.output_dir {
            return Some(dir.clone());
        }
        for ancestor in &ty.ancestors {
            if let Some(anc) = self.get(ancestor)
                && let Some(dir) = &anc.output_dir
            {
                return Some(dir.clone());
            }
        }

        let mut dir = Utf8PathBuf::new();
        for ancestor in ty.ancestors.iter().rev() {
            if ancestor == ROOT_TYPE {
                continue;
            }
            let plural = self
                .get(ancestor)
                .map(|a| a.plural.clone())
                .unwrap_or_else(|| pluralize(ancestor));
            dir.push(plural);
        }
        dir.push(&ty.plural);
        Some(dir)
    }

    /// The type plus all descendant types, depth-first in name order.
    pub fn with_descendants(&self, type_name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![type_name.to_string()];
        while let Some(name) = stack.pop() {
            if out.contains(&name) {
                continue;
            }
            if let Some(ty) = self.get(&name) {
                for child in ty.children.iter().rev() {
                    stack.push(child.clone());
                }
            }
            out.push(name);
        }
        out
    }
}
