use crate::event::{ChangeRequest, SchemaChangedEvent};
use crate::graph::DependencyGraph;
use crate::{Error, Result};
use compat_protobuf::Registry;
use prost_reflect::{EnumDescriptor, FieldDescriptor, MessageDescriptor};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Types whose shape changed, with the members that changed in each
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Updated type names, deduplicated, in detection order
    pub updated: Vec<String>,
    /// Changed field, nested enum, or enum value names per type
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ChangeSet {
    /// Mark `name` as updated and append its changed members
    pub fn record(&mut self, name: &str, members: Vec<String>) {
        if !self.updated.iter().any(|n| n == name) {
            self.updated.push(name.to_string());
        }
        self.fields.entry(name.to_string()).or_default().extend(members);
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Detect the change described by `request` and compute its impact.
///
/// Finding no change is a success with an empty event.
///
/// # Errors
///
/// [`Error::EmptyPreviousData`] when there is nothing to compare against,
/// [`Error::OldSchema`] or [`Error::NewSchema`] when a side cannot be parsed.
pub fn identify_schema_change(request: &ChangeRequest) -> Result<SchemaChangedEvent> {
    if request.old_data.is_empty() {
        return Err(Error::EmptyPreviousData);
    }
    let old = Registry::parse(&request.old_data).map_err(Error::OldSchema)?;
    let new = Registry::parse(&request.new_data).map_err(Error::NewSchema)?;

    let changes = detect_changes(&old, &new);
    let graph = DependencyGraph::build(&new);
    let impacted: BTreeMap<String, Vec<String>> = changes
        .updated
        .iter()
        .map(|name| (name.clone(), graph.impacted_by(name)))
        .collect();

    let event = SchemaChangedEvent::new(request, changes.updated, changes.fields, impacted);
    info!(
        namespace = %event.namespace_name,
        schema = %event.schema_name,
        version = event.version,
        updated = event.updated_schemas.len(),
        event_id = %event.event_id,
        "identified schema change"
    );
    Ok(event)
}

/// Compare every message and top-level enum of `new` against `old`
pub fn detect_changes(old: &Registry, new: &Registry) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for message in new.all_messages() {
        match old.message(message.full_name()) {
            None => {
                debug!(message = message.full_name(), "message added");
                changes.record(message.full_name(), message_members(&message, None));
            }
            Some(previous) if previous.descriptor_proto() != message.descriptor_proto() => {
                debug!(message = message.full_name(), "message changed");
                changes.record(message.full_name(), message_members(&message, Some(&previous)));
            }
            Some(_) => {}
        }
    }

    let top_level = new
        .all_enums()
        .into_iter()
        .filter(|e| e.parent_message().is_none());
    for enumeration in top_level {
        match old.enumeration(enumeration.full_name()) {
            None => changes.record(enumeration.full_name(), enum_members(&enumeration, None)),
            Some(previous) if previous.enum_descriptor_proto() != enumeration.enum_descriptor_proto() => {
                changes.record(enumeration.full_name(), enum_members(&enumeration, Some(&previous)));
            }
            Some(_) => {}
        }
    }

    changes
}

/// Added or changed fields and nested enums; everything when `previous` is
/// `None`
fn message_members(current: &MessageDescriptor, previous: Option<&MessageDescriptor>) -> Vec<String> {
    let mut members: Vec<String> = current
        .fields()
        .filter(|field| {
            previous
                .and_then(|p| p.get_field(field.number()))
                .is_none_or(|old| field_changed(&old, field))
        })
        .map(|field| field.name().to_string())
        .collect();

    for nested in current.child_enums() {
        let old = previous.and_then(|p| p.child_enums().find(|e| e.name() == nested.name()));
        if old.is_none_or(|old| old.enum_descriptor_proto() != nested.enum_descriptor_proto()) {
            members.push(nested.name().to_string());
        }
    }
    members
}

fn field_changed(old: &FieldDescriptor, new: &FieldDescriptor) -> bool {
    let (old_proto, new_proto) = (old.field_descriptor_proto(), new.field_descriptor_proto());
    old.name() != new.name()
        || old_proto.r#type() != new_proto.r#type()
        || is_deprecated(old) != is_deprecated(new)
}

fn is_deprecated(field: &FieldDescriptor) -> bool {
    field
        .field_descriptor_proto()
        .options
        .as_ref()
        .and_then(|options| options.deprecated)
        .unwrap_or(false)
}

/// Added values and values whose number changed; everything when
/// `previous` is `None`
fn enum_members(current: &EnumDescriptor, previous: Option<&EnumDescriptor>) -> Vec<String> {
    current
        .values()
        .filter(|value| {
            previous
                .and_then(|p| p.get_value_by_name(value.name()))
                .is_none_or(|old| old.number() != value.number())
        })
        .map(|value| value.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use compat_protobuf::fixtures::{
        EnumBuilder, FileBuilder, MessageBuilder, deprecated, descriptor_set, scalar,
    };
    use prost_types::field_descriptor_proto::Type;

    fn registry(message: MessageBuilder, enumeration: EnumBuilder) -> Registry {
        let bytes = descriptor_set(vec![
            FileBuilder::new("a.proto", "a")
                .message(message)
                .enumeration(enumeration)
                .build(),
        ]);
        Registry::parse(&bytes).unwrap()
    }

    fn color_v1() -> EnumBuilder {
        EnumBuilder::new("Color").value("COLOR_UNSPECIFIED", 0).value("RED", 1)
    }

    fn foo_v1() -> MessageBuilder {
        MessageBuilder::new("Foo")
            .field(scalar("name", 1, Type::String))
            .field(scalar("age", 2, Type::Int32))
    }

    #[test]
    fn test_identical_registries_have_no_changes() {
        let old = registry(foo_v1(), color_v1());
        let new = registry(foo_v1(), color_v1());
        assert!(detect_changes(&old, &new).is_empty());
    }

    #[test]
    fn test_changed_fields_are_named() {
        let old = registry(foo_v1(), color_v1());
        let new = registry(
            MessageBuilder::new("Foo")
                .field(deprecated(scalar("name", 1, Type::String)))
                .field(scalar("age", 2, Type::Int64))
                .field(scalar("email", 3, Type::String)),
            color_v1(),
        );

        let changes = detect_changes(&old, &new);
        assert_eq!(changes.updated, vec!["a.Foo"]);
        assert_eq!(changes.fields["a.Foo"], vec!["name", "age", "email"]);
    }

    #[test]
    fn test_renamed_field_is_changed() {
        let old = registry(foo_v1(), color_v1());
        let new = registry(
            MessageBuilder::new("Foo")
                .field(scalar("full_name", 1, Type::String))
                .field(scalar("age", 2, Type::Int32)),
            color_v1(),
        );
        assert_eq!(detect_changes(&old, &new).fields["a.Foo"], vec!["full_name"]);
    }

    #[test]
    fn test_nested_enum_changes() {
        let status = |extra: bool| {
            let e = EnumBuilder::new("Status").value("STATUS_UNSPECIFIED", 0);
            if extra { e.value("DONE", 1) } else { e }
        };
        let old = registry(foo_v1().nested_enum(status(false)), color_v1());
        let new = registry(
            foo_v1()
                .nested_enum(status(true))
                .nested_enum(EnumBuilder::new("Kind").value("KIND_UNSPECIFIED", 0)),
            color_v1(),
        );

        let changes = detect_changes(&old, &new);
        assert_eq!(changes.updated, vec!["a.Foo"]);
        assert_eq!(changes.fields["a.Foo"], vec!["Status", "Kind"]);
    }

    #[test]
    fn test_top_level_enum_values() {
        let old = registry(foo_v1(), color_v1());
        let new = registry(
            foo_v1(),
            EnumBuilder::new("Color")
                .value("COLOR_UNSPECIFIED", 0)
                .value("RED", 2)
                .value("BLUE", 3),
        );

        let changes = detect_changes(&old, &new);
        assert_eq!(changes.updated, vec!["a.Color"]);
        assert_eq!(changes.fields["a.Color"], vec!["RED", "BLUE"]);
    }

    #[test]
    fn test_record_merges_members() {
        let mut changes = ChangeSet::default();
        changes.record("a.Foo", vec!["name".into()]);
        changes.record("a.Foo", vec!["Status".into()]);

        assert_eq!(changes.updated, vec!["a.Foo"]);
        assert_eq!(changes.fields["a.Foo"], vec!["name", "Status"]);
    }
}
