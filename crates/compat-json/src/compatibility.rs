//! JSON Schema compatibility comparison
//!
//! Every location of the previous document is paired with the same location
//! in the current one. Paired nodes run the check group for their declared
//! types; standalone checks then run over every current node on its own.
//! As with protobuf, everything detected goes through a [`DiffCollector`] and
//! only kinds the [`RuleSet`] disallows survive.

use crate::navigator::{Draft, Explored};
use compat_core::{CompatibilityError, DiffCollector, DiffKind, RuleSet};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// A sub-schema together with its location and the draft it was written in
#[derive(Debug, Clone, Copy)]
pub struct SchemaNode<'a> {
    pub location: &'a str,
    pub value: &'a Value,
    pub draft: Draft,
}

impl<'a> SchemaNode<'a> {
    /// Declared `type` members
    pub fn types(&self) -> BTreeSet<&'a str> {
        match self.value.get("type") {
            Some(Value::String(t)) => BTreeSet::from([t.as_str()]),
            Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
            _ => BTreeSet::new(),
        }
    }

    fn keyword(&self, name: &str) -> Option<&'a Value> {
        self.value.get(name)
    }

    fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.value.get(*name).is_some())
    }
}

/// Check over a (current, previous) pair at the same location
pub type CompareCheck = fn(&SchemaNode<'_>, &SchemaNode<'_>, &mut DiffCollector);

/// Check over a single current node
pub type StandaloneCheck = fn(&SchemaNode<'_>, &mut DiffCollector);

/// Check groups selected by the previous node's declared types
#[derive(Debug, Clone, Copy)]
pub struct TypeChecks {
    /// Nodes without a `type`: `$ref` and composition holders
    pub untyped: &'static [CompareCheck],
    pub object: &'static [CompareCheck],
    pub array: &'static [CompareCheck],
    /// string, number, integer, boolean, null
    pub scalar: &'static [CompareCheck],
}

const OBJECT_KEYWORDS: &[&str] = &["properties", "required"];
const ARRAY_KEYWORDS: &[&str] = &["items", "prefixItems", "additionalItems"];

impl TypeChecks {
    fn select(&self, current: &SchemaNode<'_>, previous: &SchemaNode<'_>) -> Vec<CompareCheck> {
        let types = previous.types();
        let mut checks = Vec::new();
        if types.is_empty() {
            checks.extend_from_slice(self.untyped);
            // Untyped nodes can still constrain objects and arrays
            if previous.has_any(OBJECT_KEYWORDS) || current.has_any(OBJECT_KEYWORDS) {
                checks.extend_from_slice(self.object);
            }
            if previous.has_any(ARRAY_KEYWORDS) || current.has_any(ARRAY_KEYWORDS) {
                checks.extend_from_slice(self.array);
            }
            return checks;
        }
        if types.contains("object") {
            checks.extend_from_slice(self.object);
        }
        if types.contains("array") {
            checks.extend_from_slice(self.array);
        }
        if types.iter().any(|t| !matches!(*t, "object" | "array")) {
            checks.extend_from_slice(self.scalar);
        }
        checks
    }
}

/// Default pair-wise checks
pub const STRUCTURAL_CHECKS: TypeChecks = TypeChecks {
    untyped: &[check_enum, check_ref, check_all_of, check_any_of, check_one_of],
    object: &[check_required, check_property_addition],
    array: &[check_items, check_additional_items],
    scalar: &[check_enum],
};

/// Default schema-level checks over the current document
pub const STANDALONE_CHECKS: &[StandaloneCheck] = &[check_additional_properties];

/// Compare with the default check groups
pub fn compare(current: &Explored, previous: &Explored, rules: &RuleSet) -> CompatibilityError {
    compare_with(current, previous, rules, &STRUCTURAL_CHECKS, STANDALONE_CHECKS)
}

/// Compare with explicit check groups
pub fn compare_with(
    current: &Explored,
    previous: &Explored,
    rules: &RuleSet,
    structural: &TypeChecks,
    standalone: &[StandaloneCheck],
) -> CompatibilityError {
    let mut collector = DiffCollector::new(rules);

    for (location, prev_value) in previous.nodes() {
        let Some(cur_value) = current.node(location) else {
            collector.record(DiffKind::SchemaDeleted, location, "schema was deleted");
            continue;
        };
        let prev = SchemaNode {
            location,
            value: prev_value,
            draft: previous.draft(),
        };
        let cur = SchemaNode {
            location,
            value: cur_value,
            draft: current.draft(),
        };

        let (prev_types, cur_types) = (prev.types(), cur.types());
        if prev_types != cur_types {
            collector.record(
                DiffKind::SubschemaTypeChanged,
                location,
                format!("type changed from {prev_types:?} to {cur_types:?}"),
            );
            continue;
        }

        for check in structural.select(&cur, &prev) {
            check(&cur, &prev, &mut collector);
        }
    }

    for (location, value) in current.nodes() {
        let node = SchemaNode {
            location,
            value,
            draft: current.draft(),
        };
        for check in standalone {
            check(&node, &mut collector);
        }
    }

    let dropped = collector.dropped();
    let report = collector.finish();
    debug!(
        rules = rules.name(),
        surfaced = report.len(),
        allowed = dropped,
        "compared json schemas"
    );
    report
}

fn check_enum(current: &SchemaNode<'_>, previous: &SchemaNode<'_>, c: &mut DiffCollector) {
    let location = previous.location;
    match (
        previous.keyword("enum").and_then(Value::as_array),
        current.keyword("enum").and_then(Value::as_array),
    ) {
        (None, Some(_)) => c.record(DiffKind::EnumCreation, location, "enum was added"),
        (Some(_), None) => c.record(DiffKind::EnumDeletion, location, "enum was removed"),
        (Some(prev), Some(cur)) => {
            for value in prev.iter().filter(|v| !cur.contains(v)) {
                c.record(
                    DiffKind::EnumElementDeleted,
                    location,
                    format!("enum value {value} was removed"),
                );
            }
        }
        (None, None) => {}
    }
}

fn check_ref(current: &SchemaNode<'_>, previous: &SchemaNode<'_>, c: &mut DiffCollector) {
    let prev = previous.keyword("$ref").and_then(Value::as_str);
    let cur = current.keyword("$ref").and_then(Value::as_str);
    if prev == cur {
        return;
    }
    let message = match (prev, cur) {
        (None, Some(cur)) => format!("$ref '{cur}' was added"),
        (Some(prev), None) => format!("$ref '{prev}' was removed"),
        (Some(prev), Some(cur)) => format!("$ref changed from '{prev}' to '{cur}'"),
        (None, None) => return,
    };
    c.record(DiffKind::RefChanged, previous.location, message);
}

fn check_composition(
    keyword: &str,
    kind: DiffKind,
    current: &SchemaNode<'_>,
    previous: &SchemaNode<'_>,
    c: &mut DiffCollector,
) {
    let count = |node: &SchemaNode<'_>| node.keyword(keyword).and_then(Value::as_array).map(Vec::len);
    let message = match (count(previous), count(current)) {
        (None, Some(_)) => format!("{keyword} was added"),
        (Some(_), None) => format!("{keyword} was removed"),
        (Some(prev), Some(cur)) if prev != cur => {
            format!("{keyword} changed from {prev} to {cur} schemas")
        }
        _ => return,
    };
    c.record(kind, previous.location, message);
}

fn check_all_of(current: &SchemaNode<'_>, previous: &SchemaNode<'_>, c: &mut DiffCollector) {
    check_composition("allOf", DiffKind::AllOfModified, current, previous, c);
}

fn check_any_of(current: &SchemaNode<'_>, previous: &SchemaNode<'_>, c: &mut DiffCollector) {
    check_composition("anyOf", DiffKind::AnyOfModified, current, previous, c);
}

fn check_one_of(current: &SchemaNode<'_>, previous: &SchemaNode<'_>, c: &mut DiffCollector) {
    check_composition("oneOf", DiffKind::OneOfModified, current, previous, c);
}

fn required_set<'a>(node: &SchemaNode<'a>) -> BTreeSet<&'a str> {
    node.keyword("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn check_required(current: &SchemaNode<'_>, previous: &SchemaNode<'_>, c: &mut DiffCollector) {
    let (prev, cur) = (required_set(previous), required_set(current));
    if prev == cur {
        return;
    }
    let added: Vec<&str> = cur.difference(&prev).copied().collect();
    let removed: Vec<&str> = prev.difference(&cur).copied().collect();
    c.record(
        DiffKind::RequiredFieldChanged,
        previous.location,
        format!("required properties changed (added {added:?}, removed {removed:?})"),
    );
}

fn check_property_addition(
    current: &SchemaNode<'_>,
    previous: &SchemaNode<'_>,
    c: &mut DiffCollector,
) {
    let Some(cur) = current.keyword("properties").and_then(Value::as_object) else {
        return;
    };
    let prev = previous.keyword("properties").and_then(Value::as_object);
    for name in cur.keys() {
        if !prev.is_some_and(|p| p.contains_key(name)) {
            c.record(
                DiffKind::PropertyAddition,
                previous.location,
                format!("property '{name}' was added"),
            );
        }
    }
}

/// Positional item schemas of an array node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Items {
    /// One schema for every element
    Single,
    /// Tuple of positional schemas
    Tuple(usize),
}

fn items_of(node: &SchemaNode<'_>) -> Option<Items> {
    if node.draft.uses_prefix_items() {
        return node
            .keyword("prefixItems")
            .and_then(Value::as_array)
            .map(|items| Items::Tuple(items.len()));
    }
    match node.keyword("items") {
        Some(Value::Array(items)) => Some(Items::Tuple(items.len())),
        Some(_) => Some(Items::Single),
        None => None,
    }
}

/// Schema for elements past the positional ones
fn trailing_items_of<'a>(node: &SchemaNode<'a>) -> Option<&'a Value> {
    if node.draft.uses_prefix_items() {
        node.keyword("items")
    } else {
        node.keyword("additionalItems")
    }
}

fn check_items(current: &SchemaNode<'_>, previous: &SchemaNode<'_>, c: &mut DiffCollector) {
    let location = previous.location;
    match (items_of(previous), items_of(current)) {
        (None, Some(_)) => c.record(DiffKind::ItemSchemaAdded, location, "item schema was added"),
        (Some(_), None) => {
            c.record(DiffKind::ItemSchemaDeleted, location, "item schema was removed");
        }
        (Some(Items::Tuple(prev)), Some(Items::Tuple(cur))) if prev != cur => c.record(
            DiffKind::ItemSchemaModified,
            location,
            format!("item tuple changed from {prev} to {cur} schemas"),
        ),
        (Some(prev), Some(cur)) if prev != cur => c.record(
            DiffKind::ItemSchemaModified,
            location,
            "item schema changed between single and tuple form",
        ),
        _ => {}
    }
}

fn check_additional_items(
    current: &SchemaNode<'_>,
    previous: &SchemaNode<'_>,
    c: &mut DiffCollector,
) {
    let location = previous.location;
    match (trailing_items_of(previous), trailing_items_of(current)) {
        (None, Some(_)) => c.record(
            DiffKind::AdditionalItemsAdded,
            location,
            "additional items schema was added",
        ),
        (Some(_), None) => c.record(
            DiffKind::AdditionalItemsDeleted,
            location,
            "additional items schema was removed",
        ),
        // Object sub-schemas are compared at their own location
        (Some(prev), Some(cur)) if prev != cur && !(prev.is_object() && cur.is_object()) => c
            .record(
                DiffKind::AdditionalItemsModified,
                location,
                format!("additional items changed from {prev} to {cur}"),
            ),
        _ => {}
    }
}

fn check_additional_properties(node: &SchemaNode<'_>, c: &mut DiffCollector) {
    match node.keyword("additionalProperties") {
        None | Some(Value::Bool(true)) => {}
        Some(value) => c.record(
            DiffKind::AdditionalPropertiesNotOpen,
            node.location,
            format!("additionalProperties must be true, found {value}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn explored(value: Value) -> Explored {
        Explored::explore(value)
    }

    fn kinds(current: Value, previous: Value, rules: &RuleSet) -> Vec<DiffKind> {
        compare(&explored(current), &explored(previous), rules).kinds()
    }

    #[test]
    fn test_identical_open_schema_is_clean() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string", "enum": ["a", "b"]}},
            "required": ["name"]
        });
        assert!(kinds(schema.clone(), schema, &RuleSet::FULL).is_empty());
    }

    #[test]
    fn test_schema_deleted() {
        let prev = json!({"type": "object", "properties": {"a": {"type": "string"}}});
        let cur = json!({"type": "object"});
        assert_eq!(kinds(cur, prev, &RuleSet::BACKWARD), vec![DiffKind::SchemaDeleted]);
    }

    #[test]
    fn test_type_change_stops_type_checks() {
        let prev = json!({"type": "object", "required": ["a"]});
        let cur = json!({"type": ["object", "null"]});
        assert_eq!(
            kinds(cur, prev, &RuleSet::BACKWARD),
            vec![DiffKind::SubschemaTypeChanged]
        );
    }

    #[test]
    fn test_required_change_without_type() {
        let prev = json!({"required": ["a"]});
        let cur = json!({"required": ["a", "b"]});
        let report = compare(&explored(cur), &explored(prev), &RuleSet::BACKWARD);
        assert_eq!(report.kinds(), vec![DiffKind::RequiredFieldChanged]);
        assert_eq!(
            report.to_string(),
            "#: required properties changed (added [\"b\"], removed [])"
        );
    }

    #[test]
    fn test_property_addition_is_recorded_but_allowed_backward() {
        let prev = json!({"type": "object", "properties": {"a": {"type": "string"}}});
        let cur = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "string"}}
        });
        assert!(kinds(cur.clone(), prev.clone(), &RuleSet::BACKWARD).is_empty());
        assert!(kinds(cur.clone(), prev.clone(), &RuleSet::FULL).is_empty());
        let strict = RuleSet::new("strict", DiffKind::ALL);
        assert_eq!(kinds(cur, prev, &strict), vec![DiffKind::PropertyAddition]);
    }

    #[test]
    fn test_enum_checks() {
        let with_enum = json!({"enum": ["a", "b", "c"]});
        let narrowed = json!({"enum": ["a", "c"]});
        let without = json!({});

        assert_eq!(
            kinds(with_enum.clone(), without.clone(), &RuleSet::BACKWARD),
            vec![DiffKind::EnumCreation]
        );
        assert_eq!(
            kinds(without, with_enum.clone(), &RuleSet::BACKWARD),
            vec![DiffKind::EnumDeletion]
        );
        assert_eq!(
            kinds(narrowed, with_enum, &RuleSet::BACKWARD),
            vec![DiffKind::EnumElementDeleted]
        );
    }

    #[test]
    fn test_enum_on_typed_scalar() {
        let prev = json!({"type": "string", "enum": ["a", "b"]});
        let cur = json!({"type": "string", "enum": ["a"]});
        assert_eq!(kinds(cur, prev, &RuleSet::BACKWARD), vec![DiffKind::EnumElementDeleted]);
    }

    #[test]
    fn test_ref_changed() {
        let prev = json!({
            "$defs": {"a": {"type": "string"}, "b": {"type": "string"}},
            "$ref": "#/$defs/a"
        });
        let cur = json!({
            "$defs": {"a": {"type": "string"}, "b": {"type": "string"}},
            "$ref": "#/$defs/b"
        });
        let found = kinds(cur, prev, &RuleSet::BACKWARD);
        assert_eq!(found, vec![DiffKind::RefChanged, DiffKind::SchemaDeleted]);
    }

    #[test]
    fn test_composition_cardinality() {
        let prev = json!({"anyOf": [{"type": "string"}, {"type": "integer"}]});
        let cur = json!({
            "anyOf": [{"type": "string"}, {"type": "integer"}, {"type": "null"}],
            "allOf": [{"type": "string"}]
        });
        assert_eq!(
            kinds(cur, prev, &RuleSet::BACKWARD),
            vec![DiffKind::AllOfModified, DiffKind::AnyOfModified]
        );
    }

    #[test]
    fn test_prefix_items_2020_12() {
        let prev = json!({
            "type": "array",
            "prefixItems": [{"type": "string"}],
            "items": false
        });
        let cur = json!({
            "type": "array",
            "prefixItems": [{"type": "string"}, {"type": "integer"}],
            "items": true
        });
        assert_eq!(
            kinds(cur, prev, &RuleSet::BACKWARD),
            vec![DiffKind::ItemSchemaModified, DiffKind::AdditionalItemsModified]
        );
    }

    #[test]
    fn test_items_draft_07() {
        let prev = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "array",
            "items": {"type": "string"}
        });
        let cur = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "array",
            "additionalItems": false
        });
        assert_eq!(
            kinds(cur, prev, &RuleSet::BACKWARD),
            vec![
                DiffKind::ItemSchemaDeleted,
                DiffKind::AdditionalItemsAdded,
                DiffKind::SchemaDeleted,
            ]
        );
    }

    #[test]
    fn test_additional_properties_not_open_per_node() {
        let cur = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "nested": {"type": "object", "additionalProperties": {"type": "string"}},
                "open": {"type": "object", "additionalProperties": true}
            }
        });
        let prev = json!({"type": "object"});

        let report = compare(&explored(cur), &explored(prev), &RuleSet::BACKWARD);
        let not_open: Vec<&str> = report
            .diffs()
            .iter()
            .filter(|d| d.kind == DiffKind::AdditionalPropertiesNotOpen)
            .map(|d| d.location.as_str())
            .collect();
        assert_eq!(not_open, vec!["#", "#/properties/nested"]);
    }

    #[test]
    fn test_custom_check_groups() {
        const NONE: TypeChecks = TypeChecks {
            untyped: &[],
            object: &[],
            array: &[],
            scalar: &[],
        };
        let prev = json!({"required": ["a"]});
        let cur = json!({"required": ["a", "b"], "additionalProperties": false});
        let everything = RuleSet::new("everything", DiffKind::ALL);
        let report = compare_with(&explored(cur), &explored(prev), &everything, &NONE, &[]);
        assert!(report.is_empty());
    }
}
