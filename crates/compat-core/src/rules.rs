//! Rule sets: which diff kinds fail a check
//!
//! The tables are constant data. Comparators evaluate every kind and the
//! table in force decides which of them are surfaced.

use crate::diff::DiffKind;

/// A named, immutable set of disallowed diff kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
    name: &'static str,
    kinds: &'static [DiffKind],
}

const BACKWARD_KINDS: &[DiffKind] = &[
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

// Plain deletion of a field or enum value is allowed here; deleting a slot
// without reserving it is not.
const FORWARD_KINDS: &[DiffKind] = &[
    DiffKind::MessageDeleted,
    DiffKind::FieldDeleteWithoutReservedNumber,
    DiffKind::FieldDeleteWithoutReservedName,
    DiffKind::JsonNameChanged,
    DiffKind::FieldLabelChanged,
    DiffKind::FieldKindChanged,
    DiffKind::FieldTypeChanged,
    DiffKind::EnumDeleted,
    DiffKind::EnumValueDeleteWithoutReservedNumber,
    DiffKind::EnumValueDeleteWithoutReservedName,
    DiffKind::EnumValueNumberChanged,
    DiffKind::ReservedRangeNotInclusive,
    DiffKind::ReservedNameRemoved,
    DiffKind::SyntaxChanged,
    DiffKind::SchemaDeleted,
    DiffKind::SubschemaTypeChanged,
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

impl RuleSet {
    /// Reader safety: the current schema must read data written with the
    /// previous one.
    pub const BACKWARD: RuleSet = RuleSet {
        name: "backward",
        kinds: BACKWARD_KINDS,
    };

    /// Writer safety: plain deletions are tolerated as long as the freed
    /// slot is reserved.
    pub const FORWARD: RuleSet = RuleSet {
        name: "forward",
        kinds: FORWARD_KINDS,
    };

    /// Union of both directions. Forward kinds are a subset of backward
    /// ones, so the union is the backward table.
    pub const FULL: RuleSet = RuleSet {
        name: "full",
        kinds: BACKWARD_KINDS,
    };

    /// A caller-defined table, e.g. one that also rejects
    /// [`DiffKind::PropertyAddition`]
    pub const fn new(name: &'static str, kinds: &'static [DiffKind]) -> Self {
        Self { name, kinds }
    }

    /// Look up a rule set by name (`backward`, `forward`, `full`).
    pub fn from_name(name: &str) -> Option<RuleSet> {
        match name.to_ascii_lowercase().as_str() {
            "backward" => Some(Self::BACKWARD),
            "forward" => Some(Self::FORWARD),
            "full" => Some(Self::FULL),
            _ => None,
        }
    }

    /// Name of the rule set
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Disallowed kinds
    pub fn kinds(&self) -> &'static [DiffKind] {
        self.kinds
    }

    /// Whether a diff of this kind fails the check
    pub fn disallows(&self, kind: DiffKind) -> bool {
        self.kinds.contains(&kind)
    }
}
