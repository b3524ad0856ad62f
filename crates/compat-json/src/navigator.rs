//! JSON Schema compilation and exploration
//!
//! A schema document is compiled once to reject invalid schemas, then
//! explored into a flat map of location to sub-schema. Locations are JSON
//! pointer fragments (`#/properties/name`), and a location already visited is
//! never entered again, which is what stops `$ref` cycles.
//!
//! References resolve against the base URI in scope, so `$id`-relative
//! references, `$anchor` names, and percent-encoded pointers all land on the
//! location of their target.

use crate::{Error, Result};
use jsonschema::{Retrieve, Uri};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};
use url::Url;

/// Keywords whose array members are sub-schemas
const COMPOSITION_KEYWORDS: [&str; 3] = ["allOf", "oneOf", "anyOf"];

/// Keywords holding instance data rather than sub-schemas
const DATA_KEYWORDS: [&str; 4] = ["const", "default", "enum", "examples"];

/// Base URI of a document that declares no `$id`
const DOCUMENT_BASE: &str = "file:///schema.json";

/// JSON Schema draft, taken from the root `$schema` keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Draft {
    Draft4,
    Draft6,
    Draft7,
    Draft201909,
    Draft202012,
}

impl Draft {
    /// Detect the draft from a `$schema` URI; unknown or missing means 2020-12
    pub fn from_schema_uri(uri: Option<&str>) -> Self {
        match uri {
            Some(u) if u.contains("draft-04") => Draft::Draft4,
            Some(u) if u.contains("draft-06") => Draft::Draft6,
            Some(u) if u.contains("draft-07") => Draft::Draft7,
            Some(u) if u.contains("2019-09") => Draft::Draft201909,
            _ => Draft::Draft202012,
        }
    }

    /// Whether tuple validation uses `prefixItems` (2020-12) rather than an
    /// `items` array
    pub fn uses_prefix_items(self) -> bool {
        self == Draft::Draft202012
    }

    /// Keyword naming a resource's base URI
    fn id_keyword(self) -> &'static str {
        if self == Draft::Draft4 { "id" } else { "$id" }
    }

    /// Whether an `$id` of the form `#name` declares an anchor
    fn has_fragment_ids(self) -> bool {
        self < Draft::Draft201909
    }
}

/// Refuses remote `$ref` resolution; only in-document references are followed.
struct NoRemote;

impl Retrieve for NoRemote {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        trace!(uri = uri.as_str(), "remote reference treated as open schema");
        Ok(Value::Bool(true))
    }
}

/// An explored schema document
#[derive(Debug, Clone)]
pub struct Explored {
    root: Value,
    draft: Draft,
    locations: BTreeSet<String>,
}

impl Explored {
    /// Parse, compile, and explore a schema document.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidJson`] when the text is not JSON, and
    /// [`Error::InvalidSchema`] when it does not compile as a schema.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let root: Value = serde_json::from_slice(data)?;
        compile(&root)?;
        Ok(Self::explore(root))
    }

    /// Explore an already compiled document
    pub fn explore(root: Value) -> Self {
        let draft = Draft::from_schema_uri(root.get("$schema").and_then(Value::as_str));
        let references = References::index(&root, draft);
        let mut locations = BTreeSet::new();
        Walker {
            root: &root,
            references: &references,
            seen: &mut locations,
        }
        .visit(&root, "#".to_string());
        debug!(nodes = locations.len(), ?draft, "explored json schema");
        Self {
            root,
            draft,
            locations,
        }
    }

    /// Root document
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Draft the document declares
    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// Number of distinct sub-schemas
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Sub-schema at a location
    pub fn node(&self, location: &str) -> Option<&Value> {
        if !self.locations.contains(location) {
            return None;
        }
        self.root.pointer(location.strip_prefix('#').unwrap_or(location))
    }

    /// Every explored sub-schema, ordered by location
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.locations.iter().filter_map(|location| {
            self.root
                .pointer(location.strip_prefix('#').unwrap_or(location))
                .map(|value| (location.as_str(), value))
        })
    }

    /// Normalized bytes: compact JSON with object keys sorted
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonicalize(&self.root).to_string().into_bytes()
    }
}

fn compile(root: &Value) -> Result<()> {
    jsonschema::options()
        .with_retriever(NoRemote)
        .build(root)
        .map(|_| ())
        .map_err(|e| Error::InvalidSchema(e.to_string()))
}

/// Where each resource and anchor of a document lives, as JSON pointers
#[derive(Debug)]
struct References {
    draft: Draft,
    /// Resource URI without fragment
    resources: BTreeMap<String, String>,
    /// Resource URI with the anchor name as fragment
    anchors: BTreeMap<String, String>,
    /// Base URI in scope inside each object
    scopes: BTreeMap<String, Url>,
}

impl References {
    fn index(root: &Value, draft: Draft) -> Self {
        let base = Url::parse(DOCUMENT_BASE).ok();
        let mut references = Self {
            draft,
            resources: BTreeMap::new(),
            anchors: BTreeMap::new(),
            scopes: BTreeMap::new(),
        };
        if let Some(base) = &base {
            references.resources.insert(base.to_string(), String::new());
        }
        references.collect(root, String::new(), base.as_ref());
        trace!(
            resources = references.resources.len(),
            anchors = references.anchors.len(),
            "indexed schema references"
        );
        references
    }

    fn collect(&mut self, value: &Value, pointer: String, base: Option<&Url>) {
        match value {
            Value::Object(object) => {
                let scoped = self.enter(object, &pointer, base);
                for (key, child) in object {
                    if DATA_KEYWORDS.contains(&key.as_str()) {
                        continue;
                    }
                    let child_pointer = format!("{pointer}/{}", escape_pointer(key));
                    self.collect(child, child_pointer, scoped.as_ref());
                }
            }
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.collect(item, format!("{pointer}/{idx}"), base);
                }
            }
            _ => {}
        }
    }

    /// Record the resource or anchors an object declares; returns the base
    /// in scope for its children
    fn enter(
        &mut self,
        object: &Map<String, Value>,
        pointer: &str,
        base: Option<&Url>,
    ) -> Option<Url> {
        let scoped = self.scope(object, base)?;
        if let Some(id) = self.declared_id(object) {
            if self.is_fragment_id(id) {
                self.anchors.insert(format!("{scoped}{id}"), pointer.to_string());
            } else {
                self.resources.insert(scoped.to_string(), pointer.to_string());
            }
        }
        for keyword in ["$anchor", "$dynamicAnchor"] {
            if let Some(name) = object.get(keyword).and_then(Value::as_str) {
                self.anchors.insert(format!("{scoped}#{name}"), pointer.to_string());
            }
        }
        self.scopes.insert(pointer.to_string(), scoped.clone());
        Some(scoped)
    }

    /// Base URI in scope inside `object`
    fn scope(&self, object: &Map<String, Value>, base: Option<&Url>) -> Option<Url> {
        let base = base?;
        match self.declared_id(object) {
            Some(id) if !self.is_fragment_id(id) => {
                let mut resolved = base.join(id).ok()?;
                resolved.set_fragment(None);
                Some(resolved)
            }
            _ => Some(base.clone()),
        }
    }

    fn declared_id<'v>(&self, object: &'v Map<String, Value>) -> Option<&'v str> {
        object.get(self.draft.id_keyword()).and_then(Value::as_str)
    }

    fn is_fragment_id(&self, id: &str) -> bool {
        id.starts_with('#') && self.draft.has_fragment_ids()
    }

    /// Resolve a reference made at `location` to the pointer of its target
    fn resolve(&self, reference: &str, location: &str) -> Option<String> {
        let base = self.scopes.get(location.strip_prefix('#').unwrap_or(location))?;
        let mut target = base.join(reference).ok()?;
        let fragment = target
            .fragment()
            .map(|f| percent_decode_str(f).decode_utf8().map(|d| d.into_owned()))
            .transpose()
            .ok()?
            .unwrap_or_default();
        target.set_fragment(None);

        let resource = self.resources.get(target.as_str())?;
        let pointer = if fragment.is_empty() {
            resource.clone()
        } else if fragment.starts_with('/') {
            format!("{resource}{fragment}")
        } else {
            self.anchors.get(&format!("{target}#{fragment}"))?.clone()
        };
        Some(pointer)
    }
}

/// Depth-first exploration state
struct Walker<'a> {
    root: &'a Value,
    references: &'a References,
    seen: &'a mut BTreeSet<String>,
}

impl Walker<'_> {
    fn visit(&mut self, node: &Value, location: String) {
        let Some(object) = node.as_object() else {
            return;
        };
        if !self.seen.insert(location.clone()) {
            return;
        }
        trace!(%location, "exploring sub-schema");

        if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
            let root = self.root;
            match self.references.resolve(reference, &location) {
                Some(pointer) => match root.pointer(&pointer) {
                    Some(target) => self.visit(target, format!("#{pointer}")),
                    None => trace!(reference, %pointer, "reference points outside the document"),
                },
                None => trace!(reference, "reference not resolvable in document"),
            }
        }

        for keyword in COMPOSITION_KEYWORDS {
            if let Some(members) = object.get(keyword).and_then(Value::as_array) {
                for (idx, member) in members.iter().enumerate() {
                    self.visit(member, format!("{location}/{keyword}/{idx}"));
                }
            }
        }

        if let Some(properties) = object.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let child = format!("{location}/properties/{}", escape_pointer(name));
                self.visit(property, child);
            }
        }

        match object.get("items") {
            Some(Value::Array(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    self.visit(item, format!("{location}/items/{idx}"));
                }
            }
            Some(item) => self.visit(item, format!("{location}/items")),
            None => {}
        }

        if let Some(prefix) = object.get("prefixItems").and_then(Value::as_array) {
            for (idx, item) in prefix.iter().enumerate() {
                self.visit(item, format!("{location}/prefixItems/{idx}"));
            }
        }
    }
}

fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&object[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn locations(explored: &Explored) -> Vec<&str> {
        explored.nodes().map(|(location, _)| location).collect()
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = Explored::parse(b"{not json").unwrap_err();
        assert!(matches!(err, Error::InvalidJson(_)));
    }

    #[test]
    fn test_parse_rejects_invalid_schema() {
        let err = Explored::parse(br#"{"type": 12}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn test_explores_properties_items_and_composition() {
        let explored = Explored::explore(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "a/b": {"type": "integer"}
            },
            "anyOf": [{"required": ["name"]}, {"required": ["tags"]}]
        }));

        assert_eq!(
            locations(&explored),
            vec![
                "#",
                "#/anyOf/0",
                "#/anyOf/1",
                "#/properties/a~1b",
                "#/properties/name",
                "#/properties/tags",
                "#/properties/tags/items",
            ]
        );
        assert_eq!(explored.node("#/properties/a~1b"), Some(&json!({"type": "integer"})));
    }

    #[test]
    fn test_recursive_ref_terminates() {
        let explored = Explored::explore(json!({
            "$ref": "#/$defs/node",
            "$defs": {
                "node": {
                    "type": "object",
                    "properties": {
                        "children": {"type": "array", "items": {"$ref": "#/$defs/node"}}
                    }
                }
            }
        }));

        assert_eq!(
            locations(&explored),
            vec![
                "#",
                "#/$defs/node",
                "#/$defs/node/properties/children",
                "#/$defs/node/properties/children/items",
            ]
        );
    }

    #[test]
    fn test_anchor_ref_reaches_target() {
        let explored = Explored::explore(json!({
            "$ref": "#node",
            "$defs": {"n": {"$anchor": "node", "type": "object", "required": ["a"]}}
        }));

        assert_eq!(locations(&explored), vec!["#", "#/$defs/n"]);
    }

    #[test]
    fn test_id_relative_ref_reaches_target() {
        let explored = Explored::explore(json!({
            "$id": "https://example.com/schemas/root.json",
            "type": "object",
            "properties": {"item": {"$ref": "item.json"}},
            "$defs": {
                "item": {
                    "$id": "item.json",
                    "type": "object",
                    "properties": {"tag": {"$ref": "#/$defs/tag"}},
                    "$defs": {"tag": {"type": "string"}}
                }
            }
        }));

        assert_eq!(
            locations(&explored),
            vec![
                "#",
                "#/$defs/item",
                "#/$defs/item/$defs/tag",
                "#/$defs/item/properties/tag",
                "#/properties/item",
            ]
        );
    }

    #[test]
    fn test_percent_encoded_pointer_is_decoded() {
        let explored = Explored::explore(json!({
            "$ref": "#/$defs/a%20b",
            "$defs": {"a b": {"type": "string"}}
        }));

        assert_eq!(locations(&explored), vec!["#", "#/$defs/a b"]);
        assert_eq!(explored.node("#/$defs/a b"), Some(&json!({"type": "string"})));
    }

    #[test]
    fn test_draft7_fragment_id_is_an_anchor() {
        let explored = Explored::explore(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "properties": {"n": {"$ref": "#node"}},
            "definitions": {"node": {"$id": "#node", "type": "integer"}}
        }));

        assert_eq!(
            locations(&explored),
            vec!["#", "#/definitions/node", "#/properties/n"]
        );
    }

    #[test]
    fn test_unresolvable_ref_is_skipped() {
        let explored = Explored::explore(json!({"$ref": "#missing"}));
        assert_eq!(locations(&explored), vec!["#"]);
    }

    #[test]
    fn test_draft_detection() {
        assert_eq!(
            Draft::from_schema_uri(Some("http://json-schema.org/draft-07/schema#")),
            Draft::Draft7
        );
        assert_eq!(
            Draft::from_schema_uri(Some("https://json-schema.org/draft/2019-09/schema")),
            Draft::Draft201909
        );
        assert_eq!(Draft::from_schema_uri(None), Draft::Draft202012);
        assert!(Draft::Draft202012.uses_prefix_items());
        assert!(!Draft::Draft7.uses_prefix_items());
    }

    #[test]
    fn test_canonical_bytes_sort_keys() {
        let a = Explored::explore(json!({"type": "object", "properties": {"b": {}, "a": {}}}));
        let b = Explored::explore(json!({"properties": {"a": {}, "b": {}}, "type": "object"}));
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }
}
