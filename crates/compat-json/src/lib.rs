#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # compat-json
//!
//! JSON Schema exploration and compatibility comparison.
//!
//! A document is compiled with `jsonschema` (remote references disabled),
//! explored into a location map, and compared node by node against the
//! previous version. Every node of the current document must also keep an
//! open content model: `additionalProperties` absent or `true`.
//!
//! ## Example Usage
//!
//! ```rust
//! use compat_core::{DiffKind, ParsedSchema};
//! use compat_json::JsonSchema;
//!
//! let previous = JsonSchema::parse(br#"{"required": ["a"]}"#).unwrap();
//! let current = JsonSchema::parse(br#"{"required": ["a", "b"]}"#).unwrap();
//!
//! let err = current.is_backward_compatible(&previous).unwrap_err();
//! assert_eq!(err.diffs()[0].kind, DiffKind::RequiredFieldChanged);
//! ```

pub mod compatibility;
pub mod navigator;

pub use compatibility::{
    CompareCheck, STANDALONE_CHECKS, STRUCTURAL_CHECKS, SchemaNode, StandaloneCheck, TypeChecks,
    compare, compare_with,
};
pub use navigator::{Draft, Explored};

use compat_core::{CompatibilityError, Format, ParsedSchema, RuleSet, SchemaFile};
use thiserror::Error;

/// Errors raised while reading schema documents
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid JSON schema: {0}")]
    InvalidSchema(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A parsed JSON Schema document
#[derive(Debug, Clone)]
pub struct JsonSchema {
    explored: Explored,
    file: SchemaFile,
}

impl JsonSchema {
    /// Parse schema bytes.
    ///
    /// # Errors
    ///
    /// See [`Explored::parse`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let explored = Explored::parse(data)?;
        let file = SchemaFile::new(explored.canonical_bytes(), Vec::new(), Vec::new());
        Ok(Self { explored, file })
    }

    pub fn explored(&self) -> &Explored {
        &self.explored
    }

    /// Compare against `previous` under an explicit rule set
    pub fn compare(&self, previous: &Self, rules: &RuleSet) -> CompatibilityError {
        compare(&self.explored, &previous.explored, rules)
    }
}

impl ParsedSchema for JsonSchema {
    fn format(&self) -> Format {
        Format::Json
    }

    fn canonical_value(&self) -> &SchemaFile {
        &self.file
    }

    fn is_backward_compatible(&self, previous: &Self) -> compat_core::Result<()> {
        self.compare(previous, &RuleSet::BACKWARD).into_result()
    }
}
