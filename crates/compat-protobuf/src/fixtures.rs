//! Builders for in-memory descriptor sets
//!
//! Lets tests across the workspace describe `.proto` files directly as
//! descriptor structs, without a `protoc` step.

use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FieldOptions, FileDescriptorProto, FileDescriptorSet, descriptor_proto,
    enum_descriptor_proto,
};

/// Builder for a `.proto` file
#[derive(Debug, Clone)]
pub struct FileBuilder {
    proto: FileDescriptorProto,
}

impl FileBuilder {
    /// New proto3 file
    pub fn new(name: &str, package: &str) -> Self {
        Self {
            proto: FileDescriptorProto {
                name: Some(name.to_string()),
                package: Some(package.to_string()),
                syntax: Some("proto3".to_string()),
                ..Default::default()
            },
        }
    }

    /// Override the syntax token
    #[must_use]
    pub fn syntax(mut self, syntax: &str) -> Self {
        self.proto.syntax = Some(syntax.to_string());
        self
    }

    /// Add an import
    #[must_use]
    pub fn dependency(mut self, file: &str) -> Self {
        self.proto.dependency.push(file.to_string());
        self
    }

    /// Add a top-level message
    #[must_use]
    pub fn message(mut self, message: MessageBuilder) -> Self {
        self.proto.message_type.push(message.build());
        self
    }

    /// Add a top-level enum
    #[must_use]
    pub fn enumeration(mut self, enumeration: EnumBuilder) -> Self {
        self.proto.enum_type.push(enumeration.build());
        self
    }

    pub fn build(self) -> FileDescriptorProto {
        self.proto
    }
}

/// Builder for a message
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    proto: DescriptorProto,
}

impl MessageBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            proto: DescriptorProto {
                name: Some(name.to_string()),
                ..Default::default()
            },
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldDescriptorProto) -> Self {
        self.proto.field.push(field);
        self
    }

    #[must_use]
    pub fn nested_message(mut self, message: MessageBuilder) -> Self {
        self.proto.nested_type.push(message.build());
        self
    }

    #[must_use]
    pub fn nested_enum(mut self, enumeration: EnumBuilder) -> Self {
        self.proto.enum_type.push(enumeration.build());
        self
    }

    /// Reserve field numbers `start..end` (end exclusive, as in descriptors)
    #[must_use]
    pub fn reserved_range(mut self, start: i32, end: i32) -> Self {
        self.proto.reserved_range.push(descriptor_proto::ReservedRange {
            start: Some(start),
            end: Some(end),
        });
        self
    }

    #[must_use]
    pub fn reserved_name(mut self, name: &str) -> Self {
        self.proto.reserved_name.push(name.to_string());
        self
    }

    pub fn build(self) -> DescriptorProto {
        self.proto
    }
}

/// Builder for an enum
#[derive(Debug, Clone)]
pub struct EnumBuilder {
    proto: EnumDescriptorProto,
}

impl EnumBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            proto: EnumDescriptorProto {
                name: Some(name.to_string()),
                ..Default::default()
            },
        }
    }

    #[must_use]
    pub fn value(mut self, name: &str, number: i32) -> Self {
        self.proto.value.push(EnumValueDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            options: None,
        });
        self
    }

    /// Reserve values `start..=end` (end inclusive, as in enum descriptors)
    #[must_use]
    pub fn reserved_range(mut self, start: i32, end: i32) -> Self {
        self.proto
            .reserved_range
            .push(enum_descriptor_proto::EnumReservedRange {
                start: Some(start),
                end: Some(end),
            });
        self
    }

    #[must_use]
    pub fn reserved_name(mut self, name: &str) -> Self {
        self.proto.reserved_name.push(name.to_string());
        self
    }

    pub fn build(self) -> EnumDescriptorProto {
        self.proto
    }
}

/// Singular scalar field
pub fn scalar(name: &str, number: i32, field_type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(field_type as i32),
        ..Default::default()
    }
}

/// Singular message-typed field; `type_name` is fully qualified with a
/// leading dot
pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

/// Singular enum-typed field
pub fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Enum)
    }
}

/// Mark a field repeated
pub fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

/// Override a field's JSON name
pub fn with_json_name(mut field: FieldDescriptorProto, json_name: &str) -> FieldDescriptorProto {
    field.json_name = Some(json_name.to_string());
    field
}

/// Mark a field deprecated
pub fn deprecated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.options = Some(FieldOptions {
        deprecated: Some(true),
        ..Default::default()
    });
    field
}

/// Serialize files into descriptor-set bytes
pub fn descriptor_set(files: Vec<FileDescriptorProto>) -> Vec<u8> {
    FileDescriptorSet { file: files }.encode_to_vec()
}
