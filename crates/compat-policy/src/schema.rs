//! Closed union over the supported schema formats

use crate::Result;
use compat_avro::AvroSchema;
use compat_core::{
    CompatibilityError, Error as CompatError, Format, ParsedSchema, RuleSet, SchemaFile,
};
use compat_json::JsonSchema;
use compat_protobuf::ProtobufSchema;
use tracing::debug;

/// A schema of any supported format
#[derive(Debug, Clone)]
pub enum Schema {
    Protobuf(ProtobufSchema),
    Json(JsonSchema),
    Avro(AvroSchema),
}

impl Schema {
    /// Parse raw bytes with the navigator for the declared format.
    ///
    /// # Errors
    ///
    /// Returns the format's input error wrapped in [`crate::Error`].
    pub fn parse(format: Format, data: &[u8]) -> Result<Self> {
        let schema = match format {
            Format::Protobuf => Self::Protobuf(ProtobufSchema::parse(data)?),
            Format::Json => Self::Json(JsonSchema::parse(data)?),
            Format::Avro => Self::Avro(AvroSchema::parse(data)?),
        };
        debug!(%format, id = %schema.canonical_value().id, "parsed schema");
        Ok(schema)
    }

    /// Run a single comparison under an explicit rule set, returning every
    /// surfaced diff rather than a pass/fail result.
    ///
    /// # Errors
    ///
    /// [`compat_core::Error::FormatMismatch`] when the formats differ.
    pub fn compare(
        &self,
        previous: &Self,
        rules: &RuleSet,
    ) -> compat_core::Result<CompatibilityError> {
        match (self, previous) {
            (Self::Protobuf(cur), Self::Protobuf(prev)) => Ok(cur.compare(prev, rules)),
            (Self::Json(cur), Self::Json(prev)) => Ok(cur.compare(prev, rules)),
            (Self::Avro(cur), Self::Avro(prev)) => Ok(cur.compare(prev, rules)),
            _ => Err(CompatError::format_mismatch(self.format(), previous.format())),
        }
    }
}

impl From<ProtobufSchema> for Schema {
    fn from(schema: ProtobufSchema) -> Self {
        Self::Protobuf(schema)
    }
}

impl From<JsonSchema> for Schema {
    fn from(schema: JsonSchema) -> Self {
        Self::Json(schema)
    }
}

impl From<AvroSchema> for Schema {
    fn from(schema: AvroSchema) -> Self {
        Self::Avro(schema)
    }
}

impl ParsedSchema for Schema {
    fn format(&self) -> Format {
        match self {
            Self::Protobuf(s) => s.format(),
            Self::Json(s) => s.format(),
            Self::Avro(s) => s.format(),
        }
    }

    fn canonical_value(&self) -> &SchemaFile {
        match self {
            Self::Protobuf(s) => s.canonical_value(),
            Self::Json(s) => s.canonical_value(),
            Self::Avro(s) => s.canonical_value(),
        }
    }

    fn is_backward_compatible(&self, previous: &Self) -> compat_core::Result<()> {
        match (self, previous) {
            (Self::Protobuf(cur), Self::Protobuf(prev)) => cur.is_backward_compatible(prev),
            (Self::Json(cur), Self::Json(prev)) => cur.is_backward_compatible(prev),
            (Self::Avro(cur), Self::Avro(prev)) => cur.is_backward_compatible(prev),
            _ => Err(CompatError::format_mismatch(self.format(), previous.format())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dispatches_on_format() {
        let json = Schema::parse(Format::Json, br#"{"type": "string"}"#).unwrap();
        assert!(matches!(json, Schema::Json(_)));
        assert_eq!(json.format(), Format::Json);

        let avro = Schema::parse(Format::Avro, br#""string""#).unwrap();
        assert_eq!(avro.format(), Format::Avro);
    }

    #[test]
    fn test_parse_wraps_format_errors() {
        let err = Schema::parse(Format::Protobuf, b"\xff\xff\xff").unwrap_err();
        assert!(matches!(err, crate::Error::Protobuf(_)));

        let err = Schema::parse(Format::Json, b"{").unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
    }

    #[test]
    fn test_mismatched_formats_fail_in_every_direction() {
        let json = Schema::parse(Format::Json, br#"{"type": "string"}"#).unwrap();
        let avro = Schema::parse(Format::Avro, br#""string""#).unwrap();

        let err = json.is_backward_compatible(&avro).unwrap_err();
        assert_eq!(err, CompatError::format_mismatch(Format::Json, Format::Avro));
        assert!(!err.is_incompatible());
        assert!(json.is_forward_compatible(&avro).is_err());
        assert!(matches!(
            json.is_full_compatible(&avro),
            Err(CompatError::Combined(ref errors)) if errors.len() == 2
        ));
    }
}
