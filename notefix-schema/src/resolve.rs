//! The resolution passes: parent defaulting, graph validation, ancestor
//! computation, field merging, field ordering, recursive-field injection,
//! and ownership-map construction.

use crate::error::SchemaError;
use crate::pluralize::pluralize;
use crate::resolved::{
    Field, OwnershipMap, OwnsEntry, ResolvedSchema, ResolvedType, ROOT_TYPE, TYPE_FIELD,
};
use notefix_types::schema_doc::{FieldKind, RawField, RawType, SchemaDoc};
use notefix_types::value::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Resolve a raw schema document into the full type graph.
///
/// Validation failures abort before any field merging; there is no
/// partially resolved schema.
pub fn resolve_schema(doc: &SchemaDoc) -> Result<ResolvedSchema, SchemaError> {
    let raw = normalized_raw_types(doc);
    let parents = assign_parents(&raw);

    validate_graph(&raw, &parents)?;

    let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, parent) in &parents {
        if let Some(parent) = parent {
            children.entry(parent.clone()).or_default().push(name.clone());
        }
    }

    let mut types = BTreeMap::new();
    for name in raw.keys() {
        let ancestors = ancestors_of(name, &parents);
        let (fields, insertion_order) = merge_fields(name, &ancestors, &raw);
        let mut resolved = ResolvedType {
            name: name.clone(),
            parent: parents[name].clone(),
            children: children.remove(name).unwrap_or_default(),
            ancestors,
            field_order: synthesize_field_order(name, &raw, &fields, &insertion_order),
            fields,
            body_sections: raw[name].body_sections.clone(),
            recursive: raw[name].recursive,
            output_dir: raw[name].output_dir.clone().map(Into::into),
            filename_pattern: raw[name].filename_pattern.clone(),
            plural: raw[name]
                .plural
                .clone()
                .unwrap_or_else(|| pluralize(name)),
        };
        inject_recursive_parent(&mut resolved);
        types.insert(name.clone(), resolved);
    }

    let ownership = build_ownership(&types);

    Ok(ResolvedSchema {
        types,
        enums: doc.enums.clone(),
        ownership,
        config: doc.config.clone(),
    })
}

/// Raw types with the implicit root synthesized. The root always carries
/// the `type` discriminator field so every type inherits it.
fn normalized_raw_types(doc: &SchemaDoc) -> BTreeMap<String, RawType> {
    let mut raw = doc.types.clone();
    let root = raw.entry(ROOT_TYPE.to_string()).or_default();
    root.fields
        .entry(TYPE_FIELD.to_string())
        .or_insert_with(|| RawField {
            kind: FieldKind::Static { value: None },
            required: true,
            default: None,
            label: None,
            format: None,
            filter: None,
        });
    raw
}

fn assign_parents(raw: &BTreeMap<String, RawType>) -> BTreeMap<String, Option<String>> {
    raw.iter()
        .map(|(name, ty)| {
            let parent = ty.extends.clone().or_else(|| {
                if name == ROOT_TYPE {
                    None
                } else {
                    Some(ROOT_TYPE.to_string())
                }
            });
            (name.clone(), parent)
        })
        .collect()
}

/// Unknown-parent and inheritance-cycle checks. Both run before any field
/// merging.
fn validate_graph(
    raw: &BTreeMap<String, RawType>,
    parents: &BTreeMap<String, Option<String>>,
) -> Result<(), SchemaError> {
    for (name, parent) in parents {
        if let Some(parent) = parent
            && !raw.contains_key(parent)
        {
            return Err(SchemaError::UnknownParent {
                child: name.clone(),
                parent: parent.clone(),
            });
        }
    }

    for start in raw.keys() {
        let mut path = vec![start.clone()];
        loop {
            let current = path.last().unwrap().clone();
            let Some(Some(parent)) = parents.get(&current) else {
                break;
            };
            if path.contains(parent) {
                let first = path.iter().position(|n| n == parent).unwrap();
                let mut cycle: Vec<String> = path[first..].to_vec();
                cycle.push(parent.clone());
                return Err(SchemaError::InheritanceCycle { cycle });
            }
            path.push(parent.clone());
        }
    }

    Ok(())
}

/// Parent chain from the immediate parent up to and including the root.
fn ancestors_of(name: &str, parents: &BTreeMap<String, Option<String>>) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = name.to_string();
    while let Some(Some(parent)) = parents.get(&current) {
        out.push(parent.clone());
        current = parent.clone();
    }
    out
}

/// What a child definition may override on an inherited field: the default
/// and the static identity payload, nothing else. The restriction is
/// structural; a full `RawField` never reaches the override phase.
struct FieldOverride {
    default: Option<Value>,
    static_value: Option<Value>,
}

impl FieldOverride {
    fn from_raw(raw: &RawField) -> Self {
        let static_value = match &raw.kind {
            FieldKind::Static { value } => value.clone(),
            _ => None,
        };
        Self {
            default: raw.default.clone(),
            static_value,
        }
    }

    fn apply(self, field: &mut Field) {
        if self.default.is_some() {
            field.default = self.default;
        }
        if let Some(value) = self.static_value
            && let FieldKind::Static { value: existing } = &mut field.kind
        {
            *existing = Some(value);
        }
    }
}

/// Two-phase merge: copy-if-absent from the most distant ancestor to the
/// nearest, then apply the type's own raw fields (new names inserted in
/// full, existing names restricted to `FieldOverride`).
fn merge_fields(
    name: &str,
    ancestors: &[String],
    raw: &BTreeMap<String, RawType>,
) -> (BTreeMap<String, Field>, Vec<String>) {
    let mut fields: BTreeMap<String, Field> = BTreeMap::new();
    let mut insertion_order: Vec<String> = Vec::new();

    for ancestor in ancestors.iter().rev() {
        for (fname, fraw) in &raw[ancestor].fields {
            if !fields.contains_key(fname) {
                fields.insert(fname.clone(), Field::from_raw(fname, fraw));
                insertion_order.push(fname.clone());
            }
        }
    }

    for (fname, fraw) in &raw[name].fields {
        match fields.get_mut(fname) {
            Some(existing) => FieldOverride::from_raw(fraw).apply(existing),
            None => {
                fields.insert(fname.clone(), Field::from_raw(fname, fraw));
                insertion_order.push(fname.clone());
            }
        }
    }

    (fields, insertion_order)
}

/// Explicit complete permutations are used verbatim; otherwise the order
/// is synthesized from ancestor declarations (root to nearest), the type's
/// own declaration, and finally insertion order for anything unplaced.
fn synthesize_field_order(
    name: &str,
    raw: &BTreeMap<String, RawType>,
    fields: &BTreeMap<String, Field>,
    insertion_order: &[String],
) -> Vec<String> {
    let own_order = &raw[name].field_order;
    if is_complete_permutation(own_order, fields) {
        return own_order.clone();
    }

    let mut order: Vec<String> = Vec::new();
    let place = |names: &[String], order: &mut Vec<String>| {
        for n in names {
            if fields.contains_key(n) && !order.contains(n) {
                order.push(n.clone());
            }
        }
    };

    let ancestors = {
        // Recompute here rather than threading the list through: the raw
        // parent chain is already validated acyclic.
        let mut chain: Vec<String> = Vec::new();
        let mut current = name.to_string();
        while let Some(parent) = effective_parent(&current, raw) {
            chain.push(parent.clone());
            current = parent.clone();
        }
        chain
    };

    for ancestor in ancestors.iter().rev() {
        place(&raw[ancestor].field_order, &mut order);
    }
    place(own_order, &mut order);
    place(insertion_order, &mut order);

    order
}

fn effective_parent<'a>(name: &str, raw: &'a BTreeMap<String, RawType>) -> Option<&'a String> {
    match &raw.get(name)?.extends {
        Some(parent) => Some(parent),
        None if name == ROOT_TYPE => None,
        None => raw.keys().find(|k| k.as_str() == ROOT_TYPE),
    }
}

fn is_complete_permutation(order: &[String], fields: &BTreeMap<String, Field>) -> bool {
    if order.len() != fields.len() {
        return false;
    }
    let mut seen = std::collections::BTreeSet::new();
    for name in order {
        if !fields.contains_key(name) || !seen.insert(name) {
            return false;
        }
    }
    true
}

/// Recursive types get a synthesized `parent` relation field unless they
/// define one of their own.
fn inject_recursive_parent(ty: &mut ResolvedType) {
    if !ty.recursive || ty.fields.contains_key("parent") {
        return;
    }

    let source_types = match &ty.parent {
        Some(parent) if parent != ROOT_TYPE => vec![parent.clone(), ty.name.clone()],
        _ => vec![ty.name.clone()],
    };

    ty.fields.insert(
        "parent".to_string(),
        Field {
            name: "parent".to_string(),
            kind: FieldKind::Dynamic {
                source_types,
                multiple: false,
                owned: false,
            },
            required: false,
            default: None,
            label: None,
            format: Some("wikilink".to_string()),
            filter: None,
        },
    );
    if !ty.field_order.iter().any(|n| n == "parent") {
        ty.field_order.push("parent".to_string());
    }
}

fn build_ownership(types: &BTreeMap<String, ResolvedType>) -> OwnershipMap {
    let mut map = OwnershipMap::default();
    for (name, ty) in types {
        for field in ty.fields.values() {
            let FieldKind::Dynamic {
                source_types,
                multiple,
                owned: true,
            } = &field.kind
            else {
                continue;
            };
            if source_types.is_empty() {
                debug!(type_name = %name, field = %field.name, "owned field without source types; ignored");
                continue;
            }
            for child_type in source_types {
                map.insert(
                    name,
                    OwnsEntry {
                        field_name: field.name.clone(),
                        child_type: child_type.clone(),
                        multiple: *multiple,
                    },
                );
            }
        }
    }
    map.finish();
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(json: &str) -> SchemaDoc {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn synthesizes_root_with_type_field() {
        let schema = resolve_schema(&doc(r#"{ "version": 1, "types": {} }"#)).unwrap();
        let meta = schema.get(ROOT_TYPE).unwrap();
        assert!(meta.parent.is_none());
        assert!(meta.ancestors.is_empty());
        assert!(meta.fields[TYPE_FIELD].required);
    }

    #[test]
    fn parent_defaults_to_root() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": { "idea": {} } }"#,
        ))
        .unwrap();
        let idea = schema.get("idea").unwrap();
        assert_eq!(idea.parent.as_deref(), Some(ROOT_TYPE));
        assert_eq!(idea.ancestors, vec![ROOT_TYPE.to_string()]);
        // Inherits the discriminator from the root.
        assert!(idea.fields.contains_key(TYPE_FIELD));

        let meta = schema.get(ROOT_TYPE).unwrap();
        assert_eq!(meta.children, vec!["idea".to_string()]);
    }

    #[test]
    fn unknown_parent_is_fatal() {
        let err = resolve_schema(&doc(
            r#"{ "version": 1, "types": { "idea": { "extends": "ghost" } } }"#,
        ))
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownParent {
                child: "idea".into(),
                parent: "ghost".into()
            }
        );
    }

    #[test]
    fn inheritance_cycle_is_fatal() {
        let err = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "a": { "extends": "b" },
                "b": { "extends": "a" }
            } }"#,
        ))
        .unwrap_err();
        match err {
            SchemaError::InheritanceCycle { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.len() >= 3);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn override_is_restricted_to_default_and_static_value() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1,
                 "enums": { "s": ["raw", "active"] },
                 "types": {
                   "meta": {
                     "fields": {
                       "status": { "kind": "select", "enum": "s", "required": true }
                     }
                   },
                   "idea": {
                     "fields": {
                       "status": { "kind": "select", "enum": "other", "required": false, "default": "raw" }
                     }
                   }
                 } }"#,
        ))
        .unwrap();

        let status = schema.get("idea").unwrap().field("status").unwrap();
        // Structural shape and `required` come from the ancestor.
        assert!(status.required);
        match &status.kind {
            FieldKind::Select { enum_ref } => assert_eq!(enum_ref, "s"),
            other => panic!("expected select, got {other:?}"),
        }
        // Only the default crossed the merge boundary.
        assert_eq!(status.default, Some(Value::String("raw".into())));
    }

    #[test]
    fn static_value_override_applies() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "idea": {
                  "fields": { "type": { "kind": "static", "value": "idea" } }
                }
            } }"#,
        ))
        .unwrap();
        let ty_field = schema.get("idea").unwrap().field(TYPE_FIELD).unwrap();
        assert!(ty_field.required, "required inherited from root definition");
        match &ty_field.kind {
            FieldKind::Static { value } => {
                assert_eq!(value, &Some(Value::String("idea".into())))
            }
            other => panic!("expected static, got {other:?}"),
        }
    }

    #[test]
    fn distant_ancestor_definition_wins_copy_if_absent() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "meta": { "fields": { "note": { "kind": "plain_input", "required": true } } },
                "mid": { "fields": { "note": { "kind": "multi_input" } } },
                "leaf": { "extends": "mid" }
            } }"#,
        ))
        .unwrap();
        // `note` is first defined by the root; `mid`'s redefinition can only
        // contribute the override payload, so the leaf sees the root shape.
        let note = schema.get("leaf").unwrap().field("note").unwrap();
        assert_eq!(note.kind, FieldKind::PlainInput);
        assert!(note.required);
    }

    #[test]
    fn field_order_explicit_permutation_used_verbatim() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "meta": { "fields": {} },
                "idea": {
                  "fields": {
                    "a": { "kind": "plain_input" },
                    "b": { "kind": "plain_input" }
                  },
                  "field_order": ["b", "type", "a"]
                }
            } }"#,
        ))
        .unwrap();
        assert_eq!(
            schema.get("idea").unwrap().field_order,
            vec!["b", "type", "a"]
        );
    }

    #[test]
    fn field_order_synthesized_when_incomplete() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "idea": {
                  "fields": {
                    "a": { "kind": "plain_input" },
                    "b": { "kind": "plain_input" }
                  },
                  "field_order": ["b"]
                }
            } }"#,
        ))
        .unwrap();
        // Declared prefix first, then unplaced fields in insertion order
        // (root's `type` was inserted before the type's own fields).
        assert_eq!(
            schema.get("idea").unwrap().field_order,
            vec!["b", "type", "a"]
        );
    }

    #[test]
    fn field_order_is_complete_permutation() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "objective": { "fields": { "goal": { "kind": "plain_input" } } },
                "task": {
                  "extends": "objective",
                  "recursive": true,
                  "fields": { "effort": { "kind": "plain_input" } }
                }
            } }"#,
        ))
        .unwrap();
        for ty in schema.types.values() {
            let mut order = ty.field_order.clone();
            order.sort();
            let mut keys: Vec<String> = ty.fields.keys().cloned().collect();
            keys.sort();
            assert_eq!(order, keys, "field order of `{}` must be a permutation", ty.name);
        }
    }

    #[test]
    fn recursive_type_gets_parent_field() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "objective": {},
                "task": { "extends": "objective", "recursive": true },
                "area": { "recursive": true }
            } }"#,
        ))
        .unwrap();

        let task_parent = schema.get("task").unwrap().field("parent").unwrap();
        assert!(!task_parent.required);
        assert_eq!(task_parent.format.as_deref(), Some("wikilink"));
        match &task_parent.kind {
            FieldKind::Dynamic { source_types, multiple, owned } => {
                assert_eq!(source_types, &["objective", "task"]);
                assert!(!multiple);
                assert!(!owned);
            }
            other => panic!("expected dynamic, got {other:?}"),
        }

        // Extending the root directly: own name only.
        let area_parent = schema.get("area").unwrap().field("parent").unwrap();
        match &area_parent.kind {
            FieldKind::Dynamic { source_types, .. } => {
                assert_eq!(source_types, &["area"])
            }
            other => panic!("expected dynamic, got {other:?}"),
        }
    }

    #[test]
    fn ownership_map_is_bidirectional_and_sorted() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "research": {},
                "draft": {
                  "fields": {
                    "research": { "kind": "dynamic", "source_types": ["research"], "multiple": true, "owned": true }
                  }
                },
                "book": {
                  "fields": {
                    "chapters": { "kind": "dynamic", "source_types": ["research"], "owned": true }
                  }
                }
            } }"#,
        ))
        .unwrap();

        let owns = schema.ownership.owned_fields_of("draft");
        assert_eq!(owns.len(), 1);
        assert_eq!(owns[0].field_name, "research");
        assert_eq!(owns[0].child_type, "research");
        assert!(owns[0].multiple);

        let owners = schema.ownership.owners_of("research");
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].owner_type, "book");
        assert_eq!(owners[1].owner_type, "draft");
        assert!(schema.ownership.can_be_owned("research"));
        assert!(!schema.ownership.can_be_owned("draft"));
    }

    #[test]
    fn storage_dir_joins_pluralized_chain() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "objective": {},
                "task": { "extends": "objective" },
                "entity": { "plural": "entities" },
                "note": { "output_dir": "inbox" },
                "subnote": { "extends": "note" }
            } }"#,
        ))
        .unwrap();

        assert_eq!(schema.storage_dir("objective").unwrap(), "objectives");
        assert_eq!(schema.storage_dir("task").unwrap(), "objectives/tasks");
        assert_eq!(schema.storage_dir("entity").unwrap(), "entities");
        assert_eq!(schema.storage_dir("note").unwrap(), "inbox");
        // Nearest ancestor with an explicit directory wins.
        assert_eq!(schema.storage_dir("subnote").unwrap(), "inbox");
    }

    #[test]
    fn descendants_include_self_and_transitive_children() {
        let schema = resolve_schema(&doc(
            r#"{ "version": 1, "types": {
                "objective": {},
                "task": { "extends": "objective" },
                "subtask": { "extends": "task" }
            } }"#,
        ))
        .unwrap();
        assert_eq!(
            schema.with_descendants("objective"),
            vec!["objective", "task", "subtask"]
        );
    }
}
