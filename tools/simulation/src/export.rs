//! Report export
//!
//! Serializes scenario reports to JSON for external consumption.

use std::path::Path;

use crate::errors::ScenarioError;
use crate::scenario::ScenarioReport;

/// Export a scenario report as pretty-printed JSON.
pub fn export_json(report: &ScenarioReport) -> Result<String, ScenarioError> {
    serde_json::to_string_pretty(report).map_err(|e| ScenarioError::Config(e.to_string()))
}

/// Write a report to a file path.
pub fn write_to_file(report: &ScenarioReport, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
    let json = export_json(report)?;
    std::fs::write(path, json).map_err(|e| ScenarioError::Io(e.to_string()))
}
