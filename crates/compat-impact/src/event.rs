use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A proposed schema write: the stored bytes and their replacement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub namespace_id: String,
    pub schema_name: String,
    pub version: i32,
    /// Serialized `FileDescriptorSet` currently stored
    #[serde(skip)]
    pub old_data: Vec<u8>,
    /// Serialized `FileDescriptorSet` being written
    #[serde(skip)]
    pub new_data: Vec<u8>,
}

impl ChangeRequest {
    pub fn new(
        namespace_id: impl Into<String>,
        schema_name: impl Into<String>,
        version: i32,
        old_data: Vec<u8>,
        new_data: Vec<u8>,
    ) -> Self {
        Self {
            namespace_id: namespace_id.into(),
            schema_name: schema_name.into(),
            version,
            old_data,
            new_data,
        }
    }
}

/// Outcome of a detected schema change.
///
/// The ID is random per event, so detecting the same change twice yields two
/// distinct events with identical content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaChangedEvent {
    pub event_id: Uuid,
    pub event_timestamp: DateTime<Utc>,
    pub namespace_name: String,
    pub schema_name: String,
    pub version: i32,
    /// Types added or changed, in detection order
    pub updated_schemas: Vec<String>,
    /// Changed fields (messages) or values (enums) per updated type
    pub updated_fields: BTreeMap<String, Vec<String>>,
    /// Every type transitively referencing an updated type, itself included
    pub impacted_schemas: BTreeMap<String, Vec<String>>,
}

impl SchemaChangedEvent {
    pub(crate) fn new(
        request: &ChangeRequest,
        updated_schemas: Vec<String>,
        updated_fields: BTreeMap<String, Vec<String>>,
        impacted_schemas: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_timestamp: Utc::now(),
            namespace_name: request.namespace_id.clone(),
            schema_name: request.schema_name.clone(),
            version: request.version,
            updated_schemas,
            updated_fields,
            impacted_schemas,
        }
    }

    /// Whether the change touched any type
    pub fn is_empty(&self) -> bool {
        self.updated_schemas.is_empty()
    }
}
