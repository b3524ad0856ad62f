//! Protobuf compatibility comparison
//!
//! Walks every message and enum of the previous registry and looks for its
//! counterpart in the current one. Fields are matched by number, enum values
//! by name. Each independent rule runs on its own scoped thread over the two
//! read-only registries; the results are joined in fixed rule order and then
//! filtered through the requested [`RuleSet`].

use crate::navigator::{Registry, file_enums, file_messages};
use compat_core::{CompatibilityError, Diff, DiffCollector, DiffKind, RuleSet};
use prost_reflect::{EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor};
use prost_types::{DescriptorProto, EnumDescriptorProto};
use std::collections::BTreeSet;
use std::thread;
use tracing::debug;

type Rule = fn(&Registry, &Registry) -> Vec<Diff>;

const RULES: &[(&str, Rule)] = &[
    ("messages", check_messages),
    ("enums", check_enums),
    ("syntax", check_syntax),
];

/// Compare `current` against `previous`, surfacing the diffs disallowed by
/// `rules`.
pub fn compare(current: &Registry, previous: &Registry, rules: &RuleSet) -> CompatibilityError {
    let results: Vec<Vec<Diff>> = thread::scope(|scope| {
        let handles: Vec<_> = RULES
            .iter()
            .map(|&(_, rule)| scope.spawn(move || rule(current, previous)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    let mut collector = DiffCollector::new(rules);
    for ((name, _), diffs) in RULES.iter().zip(results) {
        debug!(rule = name, detected = diffs.len(), "protobuf rule finished");
        collector.extend(diffs);
    }
    let dropped = collector.dropped();
    let report = collector.finish();
    debug!(
        rules = rules.name(),
        surfaced = report.len(),
        allowed = dropped,
        "compared protobuf schemas"
    );
    report
}

fn check_messages(current: &Registry, previous: &Registry) -> Vec<Diff> {
    let mut diffs = Vec::new();
    for file in previous.files() {
        let location = file.name().to_string();
        for prev in file_messages(&file) {
            match current.message(prev.full_name()) {
                None => diffs.push(Diff::new(
                    DiffKind::MessageDeleted,
                    &location,
                    format!("message '{}' was deleted", prev.full_name()),
                )),
                Some(cur) => compare_message(&location, &cur, &prev, &mut diffs),
            }
        }
    }
    diffs
}

fn compare_message(
    location: &str,
    current: &MessageDescriptor,
    previous: &MessageDescriptor,
    diffs: &mut Vec<Diff>,
) {
    let name = previous.full_name();
    let cur_reserved = Reserved::for_message(current.descriptor_proto());
    let prev_reserved = Reserved::for_message(previous.descriptor_proto());
    check_reserved(location, &format!("message '{name}'"), &cur_reserved, &prev_reserved, diffs);

    for prev_field in previous.fields() {
        let number = prev_field.number();
        let Some(cur_field) = current.get_field(number) else {
            diffs.push(Diff::new(
                DiffKind::FieldDeleted,
                location,
                format!("field '{}' ({number}) was deleted", prev_field.full_name()),
            ));
            if !cur_reserved.covers(i64::from(number)) {
                diffs.push(Diff::new(
                    DiffKind::FieldDeleteWithoutReservedNumber,
                    location,
                    format!(
                        "field '{}' was deleted without reserving number {number}",
                        prev_field.full_name()
                    ),
                ));
            }
            if !cur_reserved.has_name(prev_field.name()) {
                diffs.push(Diff::new(
                    DiffKind::FieldDeleteWithoutReservedName,
                    location,
                    format!(
                        "field '{}' was deleted without reserving name '{}'",
                        prev_field.full_name(),
                        prev_field.name()
                    ),
                ));
            }
            continue;
        };
        compare_field(location, &cur_field, &prev_field, diffs);
    }
}

fn compare_field(
    location: &str,
    current: &FieldDescriptor,
    previous: &FieldDescriptor,
    diffs: &mut Vec<Diff>,
) {
    let name = previous.full_name();

    if current.json_name() != previous.json_name() {
        diffs.push(Diff::new(
            DiffKind::JsonNameChanged,
            location,
            format!(
                "field '{name}' JSON name changed from '{}' to '{}'",
                previous.json_name(),
                current.json_name()
            ),
        ));
    }

    if current.cardinality() != previous.cardinality() {
        diffs.push(Diff::new(
            DiffKind::FieldLabelChanged,
            location,
            format!(
                "field '{name}' label changed from {:?} to {:?}",
                previous.cardinality(),
                current.cardinality()
            ),
        ));
    }

    let (cur_kind, prev_kind) = (current.kind(), previous.kind());
    if kind_name(&cur_kind) != kind_name(&prev_kind) {
        diffs.push(Diff::new(
            DiffKind::FieldKindChanged,
            location,
            format!(
                "field '{name}' kind changed from {} to {}",
                kind_name(&prev_kind),
                kind_name(&cur_kind)
            ),
        ));
    } else if let (Some(cur_type), Some(prev_type)) =
        (referenced_type(&cur_kind), referenced_type(&prev_kind))
    {
        if cur_type != prev_type {
            diffs.push(Diff::new(
                DiffKind::FieldTypeChanged,
                location,
                format!("field '{name}' type changed from '{prev_type}' to '{cur_type}'"),
            ));
        }
    }
}

fn check_enums(current: &Registry, previous: &Registry) -> Vec<Diff> {
    let mut diffs = Vec::new();
    for file in previous.files() {
        let location = file.name().to_string();
        for prev in file_enums(&file) {
            match current.enumeration(prev.full_name()) {
                None => diffs.push(Diff::new(
                    DiffKind::EnumDeleted,
                    &location,
                    format!("enum '{}' was deleted", prev.full_name()),
                )),
                Some(cur) => compare_enum(&location, &cur, &prev, &mut diffs),
            }
        }
    }
    diffs
}

fn compare_enum(
    location: &str,
    current: &EnumDescriptor,
    previous: &EnumDescriptor,
    diffs: &mut Vec<Diff>,
) {
    let name = previous.full_name();
    let cur_reserved = Reserved::for_enum(current.enum_descriptor_proto());
    let prev_reserved = Reserved::for_enum(previous.enum_descriptor_proto());
    check_reserved(location, &format!("enum '{name}'"), &cur_reserved, &prev_reserved, diffs);

    for prev_value in previous.values() {
        let value_name = prev_value.name();
        let number = prev_value.number();
        match current.get_value_by_name(value_name) {
            None => {
                diffs.push(Diff::new(
                    DiffKind::EnumValueDeleted,
                    location,
                    format!("enum '{name}' value '{value_name}' ({number}) was deleted"),
                ));
                if !cur_reserved.covers(i64::from(number)) {
                    diffs.push(Diff::new(
                        DiffKind::EnumValueDeleteWithoutReservedNumber,
                        location,
                        format!(
                            "enum '{name}' value '{value_name}' was deleted without reserving number {number}"
                        ),
                    ));
                }
                if !cur_reserved.has_name(value_name) {
                    diffs.push(Diff::new(
                        DiffKind::EnumValueDeleteWithoutReservedName,
                        location,
                        format!(
                            "enum '{name}' value '{value_name}' was deleted without reserving its name"
                        ),
                    ));
                }
            }
            Some(cur_value) if cur_value.number() != number => diffs.push(Diff::new(
                DiffKind::EnumValueNumberChanged,
                location,
                format!(
                    "enum '{name}' value '{value_name}' changed number from {number} to {}",
                    cur_value.number()
                ),
            )),
            Some(_) => {}
        }
    }
}

fn check_syntax(current: &Registry, previous: &Registry) -> Vec<Diff> {
    let mut diffs = Vec::new();
    for file in previous.files() {
        let location = file.name().to_string();
        let prev_syntax = syntax_of(file.file_descriptor_proto().syntax());
        for prev in file_messages(&file) {
            let Some(cur) = current.message(prev.full_name()) else {
                continue;
            };
            let cur_file = cur.parent_file();
            let cur_syntax = syntax_of(cur_file.file_descriptor_proto().syntax());
            if cur_syntax != prev_syntax {
                diffs.push(Diff::new(
                    DiffKind::SyntaxChanged,
                    &location,
                    format!(
                        "syntax of message '{}' changed from {prev_syntax} to {cur_syntax}",
                        prev.full_name()
                    ),
                ));
            }
        }
    }
    diffs
}

fn check_reserved(
    location: &str,
    owner: &str,
    current: &Reserved,
    previous: &Reserved,
    diffs: &mut Vec<Diff>,
) {
    for &(start, end) in &previous.ranges {
        if !current.covers_range(start, end) {
            let range = if start == end {
                start.to_string()
            } else {
                format!("{start} to {end}")
            };
            diffs.push(Diff::new(
                DiffKind::ReservedRangeNotInclusive,
                location,
                format!("{owner} no longer reserves {range}"),
            ));
        }
    }
    for reserved in &previous.names {
        if !current.has_name(reserved) {
            diffs.push(Diff::new(
                DiffKind::ReservedNameRemoved,
                location,
                format!("{owner} no longer reserves name '{reserved}'"),
            ));
        }
    }
}

/// Reserved numbers (as merged inclusive ranges) and names of a message or enum
#[derive(Debug, Default)]
struct Reserved {
    ranges: Vec<(i64, i64)>,
    names: BTreeSet<String>,
}

impl Reserved {
    fn for_message(proto: &DescriptorProto) -> Self {
        // Message ranges are end-exclusive
        let ranges = proto
            .reserved_range
            .iter()
            .map(|r| (i64::from(r.start()), i64::from(r.end()) - 1))
            .collect();
        Self::new(ranges, &proto.reserved_name)
    }

    fn for_enum(proto: &EnumDescriptorProto) -> Self {
        // Enum ranges are end-inclusive
        let ranges = proto
            .reserved_range
            .iter()
            .map(|r| (i64::from(r.start()), i64::from(r.end())))
            .collect();
        Self::new(ranges, &proto.reserved_name)
    }

    fn new(mut ranges: Vec<(i64, i64)>, names: &[String]) -> Self {
        ranges.retain(|&(start, end)| start <= end);
        ranges.sort_unstable();
        let mut merged: Vec<(i64, i64)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        Self {
            ranges: merged,
            names: names.iter().cloned().collect(),
        }
    }

    fn covers(&self, number: i64) -> bool {
        self.covers_range(number, number)
    }

    fn covers_range(&self, start: i64, end: i64) -> bool {
        self.ranges.iter().any(|&(s, e)| s <= start && end <= e)
    }

    fn has_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

fn syntax_of(token: &str) -> &str {
    if token.is_empty() { "proto2" } else { token }
}

/// Wire-level kind of a field, without the referenced type
pub(crate) fn kind_name(kind: &Kind) -> &'static str {
    match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Message(_) => "message",
        Kind::Enum(_) => "enum",
    }
}

/// Fully-qualified name of the message or enum a field refers to
pub(crate) fn referenced_type(kind: &Kind) -> Option<String> {
    match kind {
        Kind::Message(message) => Some(message.full_name().to_string()),
        Kind::Enum(enumeration) => Some(enumeration.full_name().to_string()),
        _ => None,
    }
}
