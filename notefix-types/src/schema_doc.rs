//! The user-authored schema document, loaded from `meta/schema.json`
//! under the vault root. Source-of-truth, never mutated by the engine.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDoc {
    pub version: u32,

    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub types: BTreeMap<String, RawType>,

    #[serde(default)]
    pub config: SchemaConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Directory names excluded from scanning, in addition to the schema's
    /// own metadata directory.
    pub ignored_directories: Vec<String>,

    /// Extra frontmatter keys tolerated on every type without an
    /// `unknown-field` issue.
    pub allowed_extra_fields: Vec<String>,
}

/// A raw, possibly-inheriting type definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(default)]
    pub fields: BTreeMap<String, RawField>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_order: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_sections: Vec<String>,

    #[serde(default)]
    pub recursive: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawField {
    #[serde(flatten)]
    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Field kind, tagged by `kind` in the schema document.
///
/// `owned` only exists on `Dynamic`: the invariant that owned fields are
/// relation fields is structural, not a runtime check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Static {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    Select {
        #[serde(rename = "enum")]
        enum_ref: String,
    },
    Dynamic {
        #[serde(default)]
        source_types: Vec<String>,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        owned: bool,
    },
    MultiInput,
    Date,
    PlainInput,
}

impl FieldKind {
    /// Whether values of this kind are cross-references to other notes.
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldKind::Dynamic { .. })
    }

    /// Whether values of this kind are list-shaped.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            FieldKind::MultiInput | FieldKind::Dynamic { multiple: true, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_minimal_schema_doc() {
        let json = r#"{
            "version": 1,
            "enums": { "status": ["raw", "active"] },
            "types": {
                "idea": {
                    "fields": {
                        "status": { "kind": "select", "enum": "status", "required": true },
                        "tags": { "kind": "multi_input" }
                    },
                    "field_order": ["status", "tags"]
                },
                "task": {
                    "extends": "idea",
                    "recursive": true,
                    "fields": {
                        "status": { "kind": "select", "enum": "status", "default": "raw" }
                    }
                }
            },
            "config": { "ignored_directories": ["templates/"] }
        }"#;
        let doc: SchemaDoc = serde_json::from_str(json).unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.enums["status"], vec!["raw", "active"]);

        let idea = &doc.types["idea"];
        assert!(idea.extends.is_none());
        match &idea.fields["status"].kind {
            FieldKind::Select { enum_ref } => assert_eq!(enum_ref, "status"),
            other => panic!("expected select, got {other:?}"),
        }
        assert!(idea.fields["status"].required);
        assert!(idea.fields["tags"].kind.is_list());

        let task = &doc.types["task"];
        assert_eq!(task.extends.as_deref(), Some("idea"));
        assert!(task.recursive);
        assert_eq!(
            task.fields["status"].default,
            Some(Value::String("raw".into()))
        );
    }

    #[test]
    fn dynamic_field_carries_ownership() {
        let json = r#"{
            "kind": "dynamic",
            "source_types": ["research"],
            "multiple": true,
            "owned": true
        }"#;
        let field: RawField = serde_json::from_str(json).unwrap();
        match &field.kind {
            FieldKind::Dynamic {
                source_types,
                multiple,
                owned,
            } => {
                assert_eq!(source_types, &["research"]);
                assert!(*multiple);
                assert!(*owned);
            }
            other => panic!("expected dynamic, got {other:?}"),
        }
        assert!(field.kind.is_reference());
    }
}
