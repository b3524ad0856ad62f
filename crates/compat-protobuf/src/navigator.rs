//! Descriptor navigation
//!
//! A [`Registry`] is a fully linked view over a serialized
//! `FileDescriptorSet`. Parsing fails when the bytes do not decode, and
//! separately when the set references types or imports it does not contain.

use crate::{Error, Result};
use prost::Message;
use prost_reflect::{DescriptorPool, EnumDescriptor, FileDescriptor, MessageDescriptor};
use prost_types::{DescriptorProto, FileDescriptorSet};
use std::collections::BTreeSet;
use tracing::debug;

/// Linked registry of every file, message, enum, and field in a descriptor set
#[derive(Debug, Clone)]
pub struct Registry {
    pool: DescriptorPool,
    set: FileDescriptorSet,
}

impl Registry {
    /// Decode and link a serialized `FileDescriptorSet`.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedDescriptorSet`] when the bytes do not decode,
    /// [`Error::NotFullyContained`] when an import or a fully-qualified type
    /// reference is absent from the set, and [`Error::InvalidDescriptorSet`]
    /// when the set is otherwise rejected while linking.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut set = FileDescriptorSet::decode(data)?;
        if let Some(missing) = missing_reference(&set) {
            return Err(Error::NotFullyContained(missing));
        }
        let pool = DescriptorPool::from_file_descriptor_set(set.clone())
            .map_err(|e| Error::InvalidDescriptorSet(e.to_string()))?;

        // Stable file order so equal schemas re-serialize identically
        set.file.sort_by(|a, b| a.name().cmp(b.name()));

        debug!(files = set.file.len(), "parsed descriptor set");
        Ok(Self { pool, set })
    }

    /// Deterministic re-serialization of the descriptor set
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.set.encode_to_vec()
    }

    /// Underlying descriptor pool
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Files in the set, ordered by file name
    pub fn files(&self) -> impl Iterator<Item = FileDescriptor> + '_ {
        self.set
            .file
            .iter()
            .filter_map(|file| self.pool.get_file_by_name(file.name()))
    }

    /// Look up a message by fully-qualified name
    pub fn message(&self, full_name: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(full_name)
    }

    /// Look up an enum by fully-qualified name
    pub fn enumeration(&self, full_name: &str) -> Option<EnumDescriptor> {
        self.pool.get_enum_by_name(full_name)
    }

    /// Every message, depth-first, in file then document order
    pub fn all_messages(&self) -> Vec<MessageDescriptor> {
        self.files().flat_map(|file| file_messages(&file)).collect()
    }

    /// Every enum, top-level and nested, in file then document order
    pub fn all_enums(&self) -> Vec<EnumDescriptor> {
        self.files().flat_map(|file| file_enums(&file)).collect()
    }

    /// Sorted fully-qualified names of every declared message and enum
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .all_messages()
            .iter()
            .map(|m| m.full_name().to_string())
            .chain(self.all_enums().iter().map(|e| e.full_name().to_string()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Sorted fully-qualified names of every declared field
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .all_messages()
            .iter()
            .flat_map(|m| m.fields().map(|f| f.full_name().to_string()).collect::<Vec<_>>())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Depth-first walk over a message and all of its nested messages
pub fn walk_messages<F>(message: &MessageDescriptor, visit: &mut F)
where
    F: FnMut(&MessageDescriptor),
{
    visit(message);
    for child in message.child_messages() {
        walk_messages(&child, visit);
    }
}

/// Every message declared in a file, nested ones included, depth-first
pub fn file_messages(file: &FileDescriptor) -> Vec<MessageDescriptor> {
    let mut out = Vec::new();
    for message in file.messages() {
        walk_messages(&message, &mut |m| out.push(m.clone()));
    }
    out
}

/// Describe the first import or fully-qualified type reference that `set`
/// does not contain
fn missing_reference(set: &FileDescriptorSet) -> Option<String> {
    let files: BTreeSet<&str> = set.file.iter().map(|file| file.name()).collect();
    for file in &set.file {
        if let Some(import) = file.dependency.iter().find(|d| !files.contains(d.as_str())) {
            return Some(format!("'{}' imports '{import}', which is not in the set", file.name()));
        }
    }

    let mut messages = Vec::new();
    let mut declared = BTreeSet::new();
    for file in &set.file {
        let scope = match file.package() {
            "" => String::new(),
            package => format!(".{package}"),
        };
        declared.extend(file.enum_type.iter().map(|e| format!("{scope}.{}", e.name())));
        collect_messages(&scope, &file.message_type, &mut messages);
    }
    for (name, message) in &messages {
        declared.insert(name.clone());
        declared.extend(message.enum_type.iter().map(|e| format!("{name}.{}", e.name())));
    }

    let unresolved = |reference: &str| reference.starts_with('.') && !declared.contains(reference);
    for (name, message) in &messages {
        if let Some(field) = message.field.iter().find(|f| unresolved(f.type_name())) {
            return Some(format!(
                "field '{}.{}' references '{}', which is not in the set",
                name.trim_start_matches('.'),
                field.name(),
                field.type_name()
            ));
        }
    }
    for file in &set.file {
        for method in file.service.iter().flat_map(|service| &service.method) {
            for reference in [method.input_type(), method.output_type()] {
                if unresolved(reference) {
                    return Some(format!(
                        "method '{}' references '{reference}', which is not in the set",
                        method.name()
                    ));
                }
            }
        }
    }
    None
}

/// Messages at any depth with their fully-qualified names (leading '.')
fn collect_messages<'a>(
    scope: &str,
    messages: &'a [DescriptorProto],
    out: &mut Vec<(String, &'a DescriptorProto)>,
) {
    for message in messages {
        let name = format!("{scope}.{}", message.name());
        collect_messages(&name, &message.nested_type, out);
        out.push((name, message));
    }
}

/// Every enum declared in a file: top-level first, then nested ones in
/// message order
pub fn file_enums(file: &FileDescriptor) -> Vec<EnumDescriptor> {
    let mut out: Vec<EnumDescriptor> = file.enums().collect();
    for message in file_messages(file) {
        out.extend(message.child_enums());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{EnumBuilder, FileBuilder, MessageBuilder, descriptor_set, scalar};
    use prost_types::field_descriptor_proto::Type;

    fn nested_registry() -> Registry {
        let file = FileBuilder::new("a.proto", "a")
            .message(
                MessageBuilder::new("Outer")
                    .field(scalar("id", 1, Type::String))
                    .nested_message(
                        MessageBuilder::new("Inner")
                            .field(scalar("value", 1, Type::Int64))
                            .nested_enum(EnumBuilder::new("Kind").value("KIND_UNSPECIFIED", 0)),
                    ),
            )
            .enumeration(EnumBuilder::new("Color").value("COLOR_UNSPECIFIED", 0))
            .build();
        Registry::parse(&descriptor_set(vec![file])).unwrap()
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Registry::parse(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, Error::MalformedDescriptorSet(_)));
    }

    #[test]
    fn test_parse_rejects_missing_import() {
        let file = FileBuilder::new("b.proto", "b")
            .dependency("a.proto")
            .message(MessageBuilder::new("Holder").field(crate::fixtures::message_field(
                "foo", 1, ".a.Foo",
            )))
            .build();
        let err = Registry::parse(&descriptor_set(vec![file])).unwrap_err();
        assert!(matches!(err, Error::NotFullyContained(_)));
    }

    #[test]
    fn test_parse_rejects_unresolved_type() {
        let file = FileBuilder::new("b.proto", "b")
            .message(MessageBuilder::new("Holder").field(crate::fixtures::message_field(
                "foo", 1, ".b.Missing",
            )))
            .build();
        let err = Registry::parse(&descriptor_set(vec![file])).unwrap_err();
        assert!(matches!(err, Error::NotFullyContained(_)));
        assert!(err.to_string().contains("'b.Holder.foo' references '.b.Missing'"));
    }

    #[test]
    fn test_parse_accepts_nested_type_references() {
        let file = FileBuilder::new("a.proto", "a")
            .message(
                MessageBuilder::new("Outer")
                    .field(crate::fixtures::message_field("inner", 1, ".a.Outer.Inner"))
                    .nested_message(MessageBuilder::new("Inner").field(scalar("v", 1, Type::Int32))),
            )
            .build();
        assert!(Registry::parse(&descriptor_set(vec![file])).is_ok());
    }

    #[test]
    fn test_duplicate_field_number_is_not_a_containment_error() {
        let file = FileBuilder::new("a.proto", "a")
            .message(
                MessageBuilder::new("Foo")
                    .field(scalar("first", 1, Type::String))
                    .field(scalar("second", 1, Type::String)),
            )
            .build();
        let err = Registry::parse(&descriptor_set(vec![file])).unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptorSet(_)), "{err}");
    }

    #[test]
    fn test_walk_visits_nested_in_document_order() {
        let registry = nested_registry();
        let names: Vec<String> = registry
            .all_messages()
            .iter()
            .map(|m| m.full_name().to_string())
            .collect();
        assert_eq!(names, vec!["a.Outer", "a.Outer.Inner"]);

        let enums: Vec<String> = registry
            .all_enums()
            .iter()
            .map(|e| e.full_name().to_string())
            .collect();
        assert_eq!(enums, vec!["a.Color", "a.Outer.Inner.Kind"]);
    }

    #[test]
    fn test_type_and_field_names() {
        let registry = nested_registry();
        assert_eq!(
            registry.type_names(),
            vec!["a.Color", "a.Outer", "a.Outer.Inner", "a.Outer.Inner.Kind"]
        );
        assert_eq!(registry.field_names(), vec!["a.Outer.Inner.value", "a.Outer.id"]);
    }

    #[test]
    fn test_canonical_bytes_ignore_upload_order() {
        let a = FileBuilder::new("a.proto", "a")
            .message(MessageBuilder::new("Foo").field(scalar("name", 1, Type::String)))
            .build();
        let b = FileBuilder::new("b.proto", "b")
            .message(MessageBuilder::new("Bar").field(scalar("id", 1, Type::Int32)))
            .build();

        let first = Registry::parse(&descriptor_set(vec![a.clone(), b.clone()])).unwrap();
        let second = Registry::parse(&descriptor_set(vec![b, a])).unwrap();
        assert_eq!(first.canonical_bytes(), second.canonical_bytes());
    }
}
