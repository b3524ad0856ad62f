//! Compatibility reports

use crate::diff::{Diff, DiffKind};
use crate::rules::RuleSet;
use std::fmt;
use tracing::trace;

/// Ordered list of disallowed diffs found by one comparison.
///
/// Empty means compatible. The `Display` form is the semicolon-joined list of
/// `"<location>: <message>"` entries consumed by API and CLI callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityError {
    rule_set: RuleSet,
    diffs: Vec<Diff>,
}

impl CompatibilityError {
    /// Rule set that was in force
    pub fn rule_set(&self) -> RuleSet {
        self.rule_set
    }

    /// Surfaced diffs, in detection order
    pub fn diffs(&self) -> &[Diff] {
        &self.diffs
    }

    /// Number of surfaced diffs
    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    /// True when nothing was surfaced
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Whether a diff of the given kind was surfaced
    pub fn contains(&self, kind: DiffKind) -> bool {
        self.diffs.iter().any(|d| d.kind == kind)
    }

    /// Kinds of the surfaced diffs, in order
    pub fn kinds(&self) -> Vec<DiffKind> {
        self.diffs.iter().map(|d| d.kind).collect()
    }

    /// Convert into a result: `Ok` when empty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Incompatible`] when any diff was surfaced.
    pub fn into_result(self) -> crate::Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::Incompatible(self))
        }
    }
}

impl fmt::Display for CompatibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, diff) in self.diffs.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{diff}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompatibilityError {}

/// Collects diffs during a comparison, keeping only disallowed kinds
#[derive(Debug)]
pub struct DiffCollector {
    rule_set: RuleSet,
    diffs: Vec<Diff>,
    dropped: usize,
}

impl DiffCollector {
    /// Create a collector filtering by the given rule set
    pub fn new(rule_set: &RuleSet) -> Self {
        Self {
            rule_set: *rule_set,
            diffs: Vec::new(),
            dropped: 0,
        }
    }

    /// Rule set in force
    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Record a detected change; it is kept only if its kind is disallowed
    pub fn record(&mut self, kind: DiffKind, location: impl Into<String>, message: impl Into<String>) {
        self.push(Diff::new(kind, location, message));
    }

    /// Record an already built diff
    pub fn push(&mut self, diff: Diff) {
        if self.rule_set.disallows(diff.kind) {
            self.diffs.push(diff);
        } else {
            trace!(kind = %diff.kind, rules = self.rule_set.name(), "diff allowed");
            self.dropped += 1;
        }
    }

    /// Record a batch of diffs, in order
    pub fn extend(&mut self, diffs: impl IntoIterator<Item = Diff>) {
        for diff in diffs {
            self.push(diff);
        }
    }

    /// Number of detected diffs the rule set allowed
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Freeze the collected diffs into a report
    pub fn finish(self) -> CompatibilityError {
        CompatibilityError {
            rule_set: self.rule_set,
            diffs: self.diffs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_filters_by_rule_set() {
        let mut collector = DiffCollector::new(&RuleSet::FORWARD);
        collector.record(DiffKind::FieldDeleted, "a.proto", "deleted");
        collector.record(DiffKind::FieldDeleteWithoutReservedNumber, "a.proto", "not reserved");

        assert_eq!(collector.dropped(), 1);
        let report = collector.finish();
        assert_eq!(report.kinds(), vec![DiffKind::FieldDeleteWithoutReservedNumber]);
        assert_eq!(report.rule_set(), RuleSet::FORWARD);
    }

    #[test]
    fn test_empty_report_is_ok() {
        let report = DiffCollector::new(&RuleSet::BACKWARD).finish();
        assert!(report.is_empty());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_report_display_is_semicolon_joined() {
        let mut collector = DiffCollector::new(&RuleSet::BACKWARD);
        collector.extend([
            Diff::new(DiffKind::FieldDeleted, "a.proto", "field X was deleted"),
            Diff::new(DiffKind::SyntaxChanged, "a.proto", "syntax changed"),
        ]);
        let report = collector.finish();

        assert_eq!(report.to_string(), "a.proto: field X was deleted; a.proto: syntax changed");
        assert!(report.contains(DiffKind::SyntaxChanged));
        assert!(matches!(report.into_result(), Err(crate::Error::Incompatible(_))));
    }
}
