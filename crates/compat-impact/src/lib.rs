#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # compat-impact
//!
//! Change-impact detection for protobuf schemas.
//!
//! Given the previous and new descriptor sets of a schema, the detector
//! reports which messages and enums changed shape, which of their fields or
//! values changed, and every message that transitively references a changed
//! type, so downstream consumers can be notified.

/// Change request and change event records.
pub mod event;
/// Message-level and enum-level change detection.
pub mod detector;
/// Reverse dependency graph over message references.
pub mod graph;

pub use detector::{ChangeSet, detect_changes, identify_schema_change};
pub use event::{ChangeRequest, SchemaChangedEvent};
pub use graph::DependencyGraph;

use thiserror::Error;

/// Errors that can occur while identifying a schema change
#[derive(Error, Debug)]
pub enum Error {
    #[error("no previous schema data to compare against")]
    EmptyPreviousData,

    #[error("previous schema could not be parsed: {0}")]
    OldSchema(#[source] compat_protobuf::Error),

    #[error("new schema could not be parsed: {0}")]
    NewSchema(#[source] compat_protobuf::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
