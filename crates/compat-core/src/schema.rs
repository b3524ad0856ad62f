//! The parsed-schema capability shared by all formats

use crate::format::{Format, SchemaFile};
use crate::{Result, combine};

/// A schema parsed from one format, comparable against another schema of
/// the same format.
///
/// Implementors only need to provide the backward check: forward is the
/// backward check with operand roles swapped, and full runs both without
/// short-circuiting.
pub trait ParsedSchema {
    /// Format the schema was parsed from
    fn format(&self) -> Format;

    /// Normalized, content-addressed representation
    fn canonical_value(&self) -> &SchemaFile;

    /// Can `self` read data written with `previous`?
    ///
    /// # Errors
    ///
    /// Returns the aggregated compatibility violations.
    fn is_backward_compatible(&self, previous: &Self) -> Result<()>;

    /// Can `previous` read data written with `self`?
    ///
    /// # Errors
    ///
    /// Returns the aggregated compatibility violations.
    fn is_forward_compatible(&self, previous: &Self) -> Result<()> {
        previous.is_backward_compatible(self)
    }

    /// Both directions must hold; every violation of either is reported.
    ///
    /// # Errors
    ///
    /// Returns the combined violations of the forward and backward checks.
    fn is_full_compatible(&self, previous: &Self) -> Result<()> {
        combine([
            self.is_forward_compatible(previous),
            self.is_backward_compatible(previous),
        ])
    }
}
