//! Schema formats and canonical schema files

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declared format of a schema document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Serialized `FileDescriptorSet`
    #[serde(rename = "FORMAT_PROTOBUF", alias = "protobuf")]
    Protobuf,
    /// JSON Schema document, any supported draft
    #[serde(rename = "FORMAT_JSON", alias = "json")]
    Json,
    /// Avro schema JSON document
    #[serde(rename = "FORMAT_AVRO", alias = "avro")]
    Avro,
}

impl Format {
    /// Wire tag of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Protobuf => "FORMAT_PROTOBUF",
            Format::Json => "FORMAT_JSON",
            Format::Avro => "FORMAT_AVRO",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FORMAT_PROTOBUF" | "PROTOBUF" | "PROTO" => Ok(Format::Protobuf),
            "FORMAT_JSON" | "JSON" => Ok(Format::Json),
            "FORMAT_AVRO" | "AVRO" => Ok(Format::Avro),
            _ => Err(format!("unknown schema format '{s}'")),
        }
    }
}

/// Canonical, content-addressed form of a parsed schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaFile {
    /// Deterministic identifier derived from `data`
    pub id: String,
    /// Fully-qualified type names declared by the schema
    pub types: Vec<String>,
    /// Fully-qualified field names declared by the schema
    pub fields: Vec<String>,
    /// Normalized bytes
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl SchemaFile {
    /// Build a schema file from normalized bytes; the ID is a UUIDv5 over
    /// `data`, so equal bytes always yield equal IDs.
    pub fn new(data: Vec<u8>, types: Vec<String>, fields: Vec<String>) -> Self {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, &data).to_string();
        Self {
            id,
            types,
            fields,
            data,
        }
    }
}
