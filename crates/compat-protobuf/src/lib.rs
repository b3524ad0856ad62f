#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # compat-protobuf
//!
//! Protobuf descriptor navigation and compatibility comparison.
//!
//! Schemas arrive as serialized `FileDescriptorSet`s that must contain every
//! transitive import. [`ProtobufSchema::parse`] links them into a
//! [`Registry`] and derives the canonical [`SchemaFile`]; comparisons walk the
//! previous registry and report every structural change the active rule set
//! disallows.
//!
//! ## Example Usage
//!
//! ```rust
//! use compat_core::ParsedSchema;
//! use compat_protobuf::ProtobufSchema;
//! use prost::Message;
//! use prost_types::field_descriptor_proto::{Label, Type};
//! use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};
//!
//! fn foo(fields: &[(&str, i32, Type)]) -> Vec<u8> {
//!     let field = fields
//!         .iter()
//!         .map(|&(name, number, kind)| FieldDescriptorProto {
//!             name: Some(name.to_string()),
//!             number: Some(number),
//!             label: Some(Label::Optional as i32),
//!             r#type: Some(kind as i32),
//!             ..Default::default()
//!         })
//!         .collect();
//!     let file = FileDescriptorProto {
//!         name: Some("a.proto".to_string()),
//!         package: Some("a".to_string()),
//!         syntax: Some("proto3".to_string()),
//!         message_type: vec![DescriptorProto {
//!             name: Some("Foo".to_string()),
//!             field,
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     };
//!     FileDescriptorSet { file: vec![file] }.encode_to_vec()
//! }
//!
//! let previous = ProtobufSchema::parse(&foo(&[("name", 1, Type::String)])).unwrap();
//! let current =
//!     ProtobufSchema::parse(&foo(&[("name", 1, Type::String), ("age", 2, Type::Int64)])).unwrap();
//! assert!(current.is_backward_compatible(&previous).is_ok());
//! ```

pub mod compatibility;
#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
pub mod navigator;

pub use compatibility::compare;
pub use navigator::{Registry, file_enums, file_messages, walk_messages};

use compat_core::{CompatibilityError, Format, ParsedSchema, RuleSet, SchemaFile};
use thiserror::Error;

/// Errors raised while reading descriptor sets
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed descriptor set: {0}")]
    MalformedDescriptorSet(#[from] prost::DecodeError),

    #[error("descriptor set is not fully contained: {0}")]
    NotFullyContained(String),

    #[error("invalid descriptor set: {0}")]
    InvalidDescriptorSet(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A parsed protobuf schema: linked registry plus canonical form
#[derive(Debug, Clone)]
pub struct ProtobufSchema {
    registry: Registry,
    file: SchemaFile,
}

impl ProtobufSchema {
    /// Parse descriptor-set bytes.
    ///
    /// # Errors
    ///
    /// See [`Registry::parse`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let registry = Registry::parse(data)?;
        let file = SchemaFile::new(
            registry.canonical_bytes(),
            registry.type_names(),
            registry.field_names(),
        );
        Ok(Self { registry, file })
    }

    /// Linked descriptor registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compare against `previous` under an explicit rule set
    pub fn compare(&self, previous: &Self, rules: &RuleSet) -> CompatibilityError {
        compare(&self.registry, &previous.registry, rules)
    }
}

impl ParsedSchema for ProtobufSchema {
    fn format(&self) -> Format {
        Format::Protobuf
    }

    fn canonical_value(&self) -> &SchemaFile {
        &self.file
    }

    fn is_backward_compatible(&self, previous: &Self) -> compat_core::Result<()> {
        self.compare(previous, &RuleSet::BACKWARD).into_result()
    }
}
