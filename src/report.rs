//! JSON report output.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

/// A report tagged with the physical time unit of its timescales.
#[derive(Serialize)]
pub struct WithUnit<'a, T: Serialize> {
    pub time_unit: &'a str,
    #[serde(flatten)]
    pub body: &'a T,
}

/// Writes `report` as pretty JSON to `output`, or to stdout if `None`.
pub fn write_json<T: Serialize>(report: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("failed to write report: {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
