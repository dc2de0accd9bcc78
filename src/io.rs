use std::collections::BTreeMap;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{MarkerError, Result};
use crate::pipeline::ImportSummary;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize, P: AsRef<Path>>(output_path: P, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[derive(Serialize)]
struct ImportReport<'a> {
    timestamp: String,
    describer_type: &'a str,
    bypass_limit: bool,
    views: usize,
    marker_rows: usize,
    images_with_markers: usize,
    distinct_markers: usize,
    /// marker id -> number of views it was written to
    markers: &'a BTreeMap<u32, usize>,
    match_blocks: Option<usize>,
}

/// Writes the summary of an import run as pretty JSON.
pub fn write_import_report<P: AsRef<Path>>(output_path: P, summary: &ImportSummary) -> Result<()> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let timestamp = now
        .format(&Rfc3339)
        .map_err(|e| MarkerError::Parse(e.to_string()))?;
    let report = ImportReport {
        timestamp,
        describer_type: summary.describer_type.as_str(),
        bypass_limit: summary.bypass_limit,
        views: summary.views,
        marker_rows: summary.marker_rows,
        images_with_markers: summary.images_with_markers,
        distinct_markers: summary.marker_presence.len(),
        markers: &summary.marker_presence,
        match_blocks: summary.match_blocks,
    };
    object_to_json(output_path, &report)
}
