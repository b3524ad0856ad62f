#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # compat-policy
//!
//! Compatibility policy engine over every supported schema format.
//!
//! [`Schema`] is the closed union of protobuf, JSON Schema, and Avro schemas.
//! [`get_checker`] turns a mode string such as `FULL_TRANSITIVE` into a
//! checker that runs through [`compat_core::ParsedSchema`] only, so it never
//! needs to know which format it is checking.
//!
//! ## Example Usage
//!
//! ```rust
//! use compat_core::Format;
//! use compat_policy::{Schema, get_checker};
//!
//! let v1 = Schema::parse(Format::Json, br#"{"required": ["a"]}"#).unwrap();
//! let v2 = Schema::parse(Format::Json, br#"{"required": ["a", "b"]}"#).unwrap();
//!
//! let check = get_checker::<Schema>("BACKWARD");
//! assert!(check(&v2, &[v1]).is_err());
//! ```

pub mod policy;
pub mod schema;

pub use policy::{Checker, CompatibilityMode, get_checker};
pub use schema::Schema;

use thiserror::Error;

/// Input errors raised while parsing a schema of any format
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Protobuf(#[from] compat_protobuf::Error),

    #[error(transparent)]
    Json(#[from] compat_json::Error),

    #[error(transparent)]
    Avro(#[from] compat_avro::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
