//! Compatibility modes and checker selection
//!
//! A mode combines a direction (backward, forward, full) with a breadth:
//! non-transitive modes compare against the most recent historical schema,
//! transitive modes against every one of them. Historical slices are ordered
//! most recent first.

use compat_core::{ParsedSchema, Result, combine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Requested compatibility policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatibilityMode {
    Backward,
    BackwardTransitive,
    Forward,
    ForwardTransitive,
    Full,
    FullTransitive,
    /// Anything unrecognized; every check passes
    #[serde(other)]
    None,
}

impl CompatibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backward => "BACKWARD",
            Self::BackwardTransitive => "BACKWARD_TRANSITIVE",
            Self::Forward => "FORWARD",
            Self::ForwardTransitive => "FORWARD_TRANSITIVE",
            Self::Full => "FULL",
            Self::FullTransitive => "FULL_TRANSITIVE",
            Self::None => "NONE",
        }
    }

    /// Whether every historical version is checked
    pub fn is_transitive(&self) -> bool {
        matches!(
            self,
            Self::BackwardTransitive | Self::ForwardTransitive | Self::FullTransitive
        )
    }

    /// Checker for this mode
    pub fn checker<S: ParsedSchema>(self) -> Checker<S> {
        match self {
            Self::Backward => check_backward::<S>,
            Self::BackwardTransitive => check_backward_transitive::<S>,
            Self::Forward => check_forward::<S>,
            Self::ForwardTransitive => check_forward_transitive::<S>,
            Self::Full => check_full::<S>,
            Self::FullTransitive => check_full_transitive::<S>,
            Self::None => check_nothing::<S>,
        }
    }
}

impl fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompatibilityMode {
    type Err = std::convert::Infallible;

    /// Case-insensitive; unrecognized names become [`CompatibilityMode::None`]
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "BACKWARD" => Self::Backward,
            "BACKWARD_TRANSITIVE" => Self::BackwardTransitive,
            "FORWARD" => Self::Forward,
            "FORWARD_TRANSITIVE" => Self::ForwardTransitive,
            "FULL" => Self::Full,
            "FULL_TRANSITIVE" => Self::FullTransitive,
            _ => Self::None,
        })
    }
}

/// Checks a candidate against its historical versions, most recent first
pub type Checker<S> = fn(&S, &[S]) -> Result<()>;

/// Resolve a mode string to its checker.
///
/// Unrecognized modes resolve to a checker that always succeeds.
pub fn get_checker<S: ParsedSchema>(mode: &str) -> Checker<S> {
    let Ok(parsed) = mode.parse::<CompatibilityMode>();
    if parsed == CompatibilityMode::None {
        warn!(mode, "unrecognized compatibility mode, every check will pass");
    } else {
        debug!(mode = parsed.as_str(), "resolved compatibility checker");
    }
    parsed.checker()
}

fn check_backward<S: ParsedSchema>(current: &S, historicals: &[S]) -> Result<()> {
    historicals
        .first()
        .map_or(Ok(()), |latest| current.is_backward_compatible(latest))
}

fn check_forward<S: ParsedSchema>(current: &S, historicals: &[S]) -> Result<()> {
    historicals
        .first()
        .map_or(Ok(()), |latest| current.is_forward_compatible(latest))
}

fn check_full<S: ParsedSchema>(current: &S, historicals: &[S]) -> Result<()> {
    historicals
        .first()
        .map_or(Ok(()), |latest| current.is_full_compatible(latest))
}

fn check_backward_transitive<S: ParsedSchema>(current: &S, historicals: &[S]) -> Result<()> {
    combine(historicals.iter().map(|h| current.is_backward_compatible(h)))
}

fn check_forward_transitive<S: ParsedSchema>(current: &S, historicals: &[S]) -> Result<()> {
    combine(historicals.iter().map(|h| current.is_forward_compatible(h)))
}

fn check_full_transitive<S: ParsedSchema>(current: &S, historicals: &[S]) -> Result<()> {
    combine(historicals.iter().map(|h| current.is_full_compatible(h)))
}

fn check_nothing<S: ParsedSchema>(_current: &S, _historicals: &[S]) -> Result<()> {
    Ok(())
}
