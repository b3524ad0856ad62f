//! Structural change categories

use serde::Serialize;
use std::fmt;

/// Closed set of structural changes a comparator can detect.
///
/// Whether a kind fails a check is decided by the active [`crate::RuleSet`],
/// never by the comparator that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffKind {
    // Protobuf
    MessageDeleted,
    FieldDeleted,
    FieldDeleteWithoutReservedNumber,
    FieldDeleteWithoutReservedName,
    JsonNameChanged,
    FieldLabelChanged,
    FieldKindChanged,
    FieldTypeChanged,
    EnumDeleted,
    EnumValueDeleted,
    EnumValueDeleteWithoutReservedNumber,
    EnumValueDeleteWithoutReservedName,
    EnumValueNumberChanged,
    ReservedRangeNotInclusive,
    ReservedNameRemoved,
    SyntaxChanged,

    // JSON Schema
    SchemaDeleted,
    SubschemaTypeChanged,
    PropertyAddition,
    RequiredFieldChanged,
    EnumCreation,
    EnumDeletion,
    EnumElementDeleted,
    RefChanged,
    AllOfModified,
    AnyOfModified,
    OneOfModified,
    ItemSchemaAdded,
    ItemSchemaModified,
    ItemSchemaDeleted,
    AdditionalItemsAdded,
    AdditionalItemsModified,
    AdditionalItemsDeleted,
    AdditionalPropertiesNotOpen,

    // Avro
    AvroIncompatible,
}

impl DiffKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [DiffKind] = &[
        DiffKind::MessageDeleted,
        DiffKind::FieldDeleted,
        DiffKind::FieldDeleteWithoutReservedNumber,
        DiffKind::FieldDeleteWithoutReservedName,
        DiffKind::JsonNameChanged,
        DiffKind::FieldLabelChanged,
        DiffKind::FieldKindChanged,
        DiffKind::FieldTypeChanged,
        DiffKind::EnumDeleted,
        DiffKind::EnumValueDeleted,
        DiffKind::EnumValueDeleteWithoutReservedNumber,
        DiffKind::EnumValueDeleteWithoutReservedName,
        DiffKind::EnumValueNumberChanged,
        DiffKind::ReservedRangeNotInclusive,
        DiffKind::ReservedNameRemoved,
        DiffKind::SyntaxChanged,
        DiffKind::SchemaDeleted,
        DiffKind::SubschemaTypeChanged,
        DiffKind::PropertyAddition,
        DiffKind::RequiredFieldChanged,
        DiffKind::EnumCreation,
        DiffKind::EnumDeletion,
        DiffKind::EnumElementDeleted,
        DiffKind::RefChanged,
        DiffKind::AllOfModified,
        DiffKind::AnyOfModified,
        DiffKind::OneOfModified,
        DiffKind::ItemSchemaAdded,
        DiffKind::ItemSchemaModified,
        DiffKind::ItemSchemaDeleted,
        DiffKind::AdditionalItemsAdded,
        DiffKind::AdditionalItemsModified,
        DiffKind::AdditionalItemsDeleted,
        DiffKind::AdditionalPropertiesNotOpen,
        DiffKind::AvroIncompatible,
    ];

    /// Stable kebab-case tag used in reports and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageDeleted => "message-deleted",
            Self::FieldDeleted => "field-deleted",
            Self::FieldDeleteWithoutReservedNumber => "field-delete-without-reserved-number",
            Self::FieldDeleteWithoutReservedName => "field-delete-without-reserved-name",
            Self::JsonNameChanged => "json-name-changed",
            Self::FieldLabelChanged => "field-label-changed",
            Self::FieldKindChanged => "field-kind-changed",
            Self::FieldTypeChanged => "field-type-changed",
            Self::EnumDeleted => "enum-deleted",
            Self::EnumValueDeleted => "enum-value-deleted",
            Self::EnumValueDeleteWithoutReservedNumber => {
                "enum-value-delete-without-reserved-number"
            }
            Self::EnumValueDeleteWithoutReservedName => "enum-value-delete-without-reserved-name",
            Self::EnumValueNumberChanged => "enum-value-number-changed",
            Self::ReservedRangeNotInclusive => "reserved-range-not-inclusive",
            Self::ReservedNameRemoved => "reserved-name-removed",
            Self::SyntaxChanged => "syntax-changed",
            Self::SchemaDeleted => "schema-deleted",
            Self::SubschemaTypeChanged => "subschema-type-changed",
            Self::PropertyAddition => "property-addition",
            Self::RequiredFieldChanged => "required-field-changed",
            Self::EnumCreation => "enum-creation",
            Self::EnumDeletion => "enum-deletion",
            Self::EnumElementDeleted => "enum-element-deleted",
            Self::RefChanged => "ref-changed",
            Self::AllOfModified => "all-of-modified",
            Self::AnyOfModified => "any-of-modified",
            Self::OneOfModified => "one-of-modified",
            Self::ItemSchemaAdded => "item-schema-added",
            Self::ItemSchemaModified => "item-schema-modified",
            Self::ItemSchemaDeleted => "item-schema-deleted",
            Self::AdditionalItemsAdded => "additional-items-added",
            Self::AdditionalItemsModified => "additional-items-modified",
            Self::AdditionalItemsDeleted => "additional-items-deleted",
            Self::AdditionalPropertiesNotOpen => "additional-properties-not-open",
            Self::AvroIncompatible => "avro-incompatible",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Category of the change
    pub kind: DiffKind,
    /// File name (protobuf) or sub-schema location (JSON Schema)
    pub location: String,
    /// Human-readable description
    pub message: String,
}

impl Diff {
    /// Create a new diff
    pub fn new(kind: DiffKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}
