//! Subcommand implementations

use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use compat_core::{Format, RuleSet};
use compat_impact::{ChangeRequest, identify_schema_change};
use compat_policy::{Schema, get_checker};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of a command that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Compatible,
    Incompatible,
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))
}

async fn load_schema(format: Format, path: &Path) -> Result<Schema> {
    let data = read(path).await?;
    Schema::parse(format, &data).with_context(|| format!("failed to parse '{}'", path.display()))
}

fn resolve_format(flag: Option<Format>, config: &Config) -> Result<Format> {
    flag.or(config.default_format)
        .ok_or_else(|| anyhow!("no schema format given; pass --format or set default_format"))
}

/// Check a candidate against its historical versions, most recent first
pub async fn check(
    config: &Config,
    format: Option<Format>,
    mode: Option<String>,
    candidate: &Path,
    historicals: &[PathBuf],
) -> Result<Outcome> {
    let format = resolve_format(format, config)?;
    let mode = mode.unwrap_or_else(|| config.default_mode.clone());

    let current = load_schema(format, candidate).await?;
    let mut previous = Vec::with_capacity(historicals.len());
    for path in historicals {
        previous.push(load_schema(format, path).await?);
    }

    info!(%format, %mode, historicals = previous.len(), "checking compatibility");
    let checker = get_checker::<Schema>(&mode);
    let mut stdout = std::io::stdout().lock();
    match checker(&current, &previous) {
        Ok(()) => {
            writeln!(stdout, "compatible")?;
            Ok(Outcome::Compatible)
        }
        Err(err) if err.is_incompatible() => {
            writeln!(stdout, "incompatible: {err}")?;
            Ok(Outcome::Incompatible)
        }
        Err(err) => Err(err.into()),
    }
}

/// Compare one pair under an explicit rule set and list every surfaced diff
pub async fn diff(
    config: &Config,
    format: Option<Format>,
    rules: &str,
    current: &Path,
    previous: &Path,
) -> Result<Outcome> {
    let format = resolve_format(format, config)?;
    let rules = RuleSet::from_name(rules)
        .ok_or_else(|| anyhow!("unknown rule set '{rules}'; expected backward, forward or full"))?;

    let current = load_schema(format, current).await?;
    let previous = load_schema(format, previous).await?;
    let report = current.compare(&previous, &rules)?;

    let mut stdout = std::io::stdout().lock();
    for diff in report.diffs() {
        writeln!(stdout, "[{}] {diff}", diff.kind)?;
    }
    Ok(if report.is_empty() {
        Outcome::Compatible
    } else {
        Outcome::Incompatible
    })
}

/// Detect a protobuf change and print the resulting event as JSON
pub async fn impact(request_meta: ImpactArgs<'_>, old: &Path, new: &Path) -> Result<Outcome> {
    let request = ChangeRequest::new(
        request_meta.namespace,
        request_meta.name,
        request_meta.version,
        read(old).await?,
        read(new).await?,
    );
    let event = identify_schema_change(&request)?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &event)?;
    writeln!(stdout)?;
    Ok(Outcome::Compatible)
}

/// Identity of the schema an impact run describes
#[derive(Debug, Clone, Copy)]
pub struct ImpactArgs<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
    pub version: i32,
}
