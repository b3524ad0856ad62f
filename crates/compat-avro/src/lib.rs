#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # compat-avro
//!
//! Avro schemas behind the shared [`ParsedSchema`] contract.
//!
//! Structural checking is delegated to `apache-avro`'s schema resolution
//! rules: the current schema must be able to read data written with the
//! previous one. A refusal surfaces as a single
//! [`DiffKind::AvroIncompatible`] diff carrying the checker's reason.
//!
//! ## Example Usage
//!
//! ```rust
//! use compat_avro::AvroSchema;
//! use compat_core::ParsedSchema;
//!
//! let v1 = AvroSchema::parse(
//!     br#"{"type": "record", "name": "User", "fields": [{"name": "id", "type": "long"}]}"#,
//! ).unwrap();
//! let v2 = AvroSchema::parse(br#"{
//!     "type": "record", "name": "User",
//!     "fields": [
//!         {"name": "id", "type": "long"},
//!         {"name": "email", "type": ["null", "string"], "default": null}
//!     ]
//! }"#).unwrap();
//!
//! assert!(v2.is_full_compatible(&v1).is_ok());
//! ```

use apache_avro::schema_compatibility::SchemaCompatibility;
use compat_core::{
    CompatibilityError, DiffCollector, DiffKind, Format, ParsedSchema, RuleSet, SchemaFile,
};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading Avro schema documents
#[derive(Error, Debug)]
pub enum Error {
    #[error("avro schema is not UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid avro schema: {0}")]
    InvalidSchema(#[from] apache_avro::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A parsed Avro schema with its Parsing Canonical Form
#[derive(Debug, Clone)]
pub struct AvroSchema {
    schema: apache_avro::Schema,
    file: SchemaFile,
}

impl AvroSchema {
    /// Parse an Avro schema JSON document.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUtf8`] or [`Error::InvalidSchema`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)?;
        let schema = apache_avro::Schema::parse_str(text)?;
        let canonical = schema.canonical_form();
        let (types, fields) = named_parts(&canonical);
        let file = SchemaFile::new(canonical.into_bytes(), types, fields);
        Ok(Self { schema, file })
    }

    pub fn schema(&self) -> &apache_avro::Schema {
        &self.schema
    }

    /// Check that `self` can read data written with `previous`, reporting
    /// under the given rule set
    pub fn compare(&self, previous: &Self, rules: &RuleSet) -> CompatibilityError {
        let mut collector = DiffCollector::new(rules);
        if let Err(reason) = SchemaCompatibility::can_read(&previous.schema, &self.schema) {
            collector.record(
                DiffKind::AvroIncompatible,
                "#",
                format!("reader cannot resolve writer schema: {reason}"),
            );
        }
        let report = collector.finish();
        debug!(rules = rules.name(), surfaced = report.len(), "compared avro schemas");
        report
    }
}

impl ParsedSchema for AvroSchema {
    fn format(&self) -> Format {
        Format::Avro
    }

    fn canonical_value(&self) -> &SchemaFile {
        &self.file
    }

    fn is_backward_compatible(&self, previous: &Self) -> compat_core::Result<()> {
        self.compare(previous, &RuleSet::BACKWARD).into_result()
    }
}

/// Named types and record fields of a canonical form, sorted
fn named_parts(canonical: &str) -> (Vec<String>, Vec<String>) {
    let mut types = BTreeSet::new();
    let mut fields = BTreeSet::new();
    if let Ok(root) = serde_json::from_str::<Value>(canonical) {
        collect_names(&root, &mut types, &mut fields);
    }
    (types.into_iter().collect(), fields.into_iter().collect())
}

fn collect_names(node: &Value, types: &mut BTreeSet<String>, fields: &mut BTreeSet<String>) {
    match node {
        Value::Array(union) => {
            for member in union {
                collect_names(member, types, fields);
            }
        }
        Value::Object(object) => {
            let name = object.get("name").and_then(Value::as_str);
            if let Some(name) = name {
                types.insert(name.to_string());
            }
            for record_field in object
                .get("fields")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                if let (Some(owner), Some(field)) =
                    (name, record_field.get("name").and_then(Value::as_str))
                {
                    fields.insert(format!("{owner}.{field}"));
                }
                if let Some(field_type) = record_field.get("type") {
                    collect_names(field_type, types, fields);
                }
            }
            for nested in ["items", "values"] {
                if let Some(inner) = object.get(nested) {
                    collect_names(inner, types, fields);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_parts_walks_nested_records() {
        let (types, fields) = named_parts(
            r#"{"name":"shop.Order","type":"record","fields":[
                {"name":"id","type":"long"},
                {"name":"lines","type":{"type":"array","items":{"name":"shop.Line","type":"record","fields":[{"name":"sku","type":"string"}]}}},
                {"name":"state","type":["null",{"name":"shop.State","type":"enum","symbols":["OPEN"]}]}
            ]}"#,
        );
        assert_eq!(types, vec!["shop.Line", "shop.Order", "shop.State"]);
        assert_eq!(fields, vec!["shop.Line.sku", "shop.Order.id", "shop.Order.lines", "shop.Order.state"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(AvroSchema::parse(&[0xff, 0xfe]), Err(Error::InvalidUtf8(_))));
        assert!(matches!(
            AvroSchema::parse(br#"{"type": "record"}"#),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_primitive_schema_has_no_names() {
        let schema = AvroSchema::parse(br#""string""#).unwrap();
        assert!(schema.canonical_value().types.is_empty());
        assert!(schema.canonical_value().fields.is_empty());
    }
}
