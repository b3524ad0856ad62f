#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # compat-core
//!
//! Shared vocabulary for schema compatibility checking.
//!
//! Every format comparator produces [`Diff`]s tagged with a [`DiffKind`].
//! A [`RuleSet`] decides which kinds are surfaced for a given direction, and
//! the surviving diffs are reported through a [`CompatibilityError`]. The
//! same diff pass therefore serves backward, forward, and full checks.
//!
//! ## Example Usage
//!
//! ```rust
//! use compat_core::{DiffCollector, DiffKind, RuleSet};
//!
//! let mut collector = DiffCollector::new(&RuleSet::BACKWARD);
//! collector.record(DiffKind::FieldDeleted, "a.proto", "field 'a.Foo.age' (2) was deleted");
//! collector.record(DiffKind::PropertyAddition, "#", "property 'b' was added");
//!
//! let report = collector.finish();
//! assert_eq!(report.len(), 1);
//! assert_eq!(report.to_string(), "a.proto: field 'a.Foo.age' (2) was deleted");
//! ```

pub mod diff;
pub mod format;
pub mod report;
pub mod rules;
pub mod schema;

pub use diff::{Diff, DiffKind};
pub use format::{Format, SchemaFile};
pub use report::{CompatibilityError, DiffCollector};
pub use rules::RuleSet;
pub use schema::ParsedSchema;

use thiserror::Error;

/// Errors returned by compatibility comparisons
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The two operands were parsed from different formats
    #[error("schema format mismatch: expected {expected}, found {found}")]
    FormatMismatch { expected: Format, found: Format },

    /// One or more diffs were disallowed by the active rule set
    #[error("{0}")]
    Incompatible(CompatibilityError),

    /// Several independent checks failed
    #[error("{}", join_errors(.0))]
    Combined(Vec<Error>),
}

impl Error {
    /// Build a format-mismatch error.
    pub fn format_mismatch(expected: Format, found: Format) -> Self {
        Self::FormatMismatch { expected, found }
    }

    /// True when the error describes structural incompatibility rather than
    /// an input problem.
    pub fn is_incompatible(&self) -> bool {
        match self {
            Self::Incompatible(_) => true,
            Self::Combined(errors) => errors.iter().all(Error::is_incompatible),
            Self::FormatMismatch { .. } => false,
        }
    }

    /// Every diff carried by this error, flattened in report order.
    pub fn diffs(&self) -> Vec<&Diff> {
        match self {
            Self::Incompatible(report) => report.diffs().iter().collect(),
            Self::Combined(errors) => errors.iter().flat_map(Error::diffs).collect(),
            Self::FormatMismatch { .. } => Vec::new(),
        }
    }
}

impl From<CompatibilityError> for Error {
    fn from(report: CompatibilityError) -> Self {
        Self::Incompatible(report)
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;

/// Combine the outcome of several independent checks.
///
/// Every failure is kept: no failures yields `Ok(())`, a single failure is
/// returned as is, and several are wrapped in [`Error::Combined`].
///
/// # Errors
///
/// Returns the failing check's error, or the combined errors of every
/// failing check.
pub fn combine<I>(results: I) -> Result<()>
where
    I: IntoIterator<Item = Result<()>>,
{
    let mut errors: Vec<Error> = results.into_iter().filter_map(|r| r.err()).collect();
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(Error::Combined(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incompatible(kind: DiffKind, location: &str, message: &str) -> Error {
        let mut collector = DiffCollector::new(&RuleSet::FULL);
        collector.record(kind, location, message);
        Error::Incompatible(collector.finish())
    }

    #[test]
    fn test_combine_all_ok() {
        assert!(combine([Ok(()), Ok(())]).is_ok());
        assert!(combine(Vec::new()).is_ok());
    }

    #[test]
    fn test_combine_single_failure_is_unwrapped() {
        let err = combine([
            Ok(()),
            Err(incompatible(DiffKind::MessageDeleted, "a.proto", "message 'a.Foo' was deleted")),
        ])
        .unwrap_err();

        assert!(matches!(err, Error::Incompatible(_)));
        assert_eq!(err.to_string(), "a.proto: message 'a.Foo' was deleted");
    }

    #[test]
    fn test_combine_keeps_every_failure() {
        let err = combine([
            Err(incompatible(DiffKind::FieldDeleted, "a.proto", "first")),
            Ok(()),
            Err(incompatible(DiffKind::SyntaxChanged, "b.proto", "second")),
        ])
        .unwrap_err();

        assert!(matches!(err, Error::Combined(ref errors) if errors.len() == 2));
        assert_eq!(err.to_string(), "a.proto: first; b.proto: second");
        assert_eq!(err.diffs().len(), 2);
        assert!(err.is_incompatible());
    }

    #[test]
    fn test_format_mismatch_is_not_incompatibility() {
        let err = Error::format_mismatch(Format::Protobuf, Format::Json);
        assert!(!err.is_incompatible());
        assert!(err.diffs().is_empty());
        assert_eq!(
            err.to_string(),
            "schema format mismatch: expected FORMAT_PROTOBUF, found FORMAT_JSON"
        );
    }
}
