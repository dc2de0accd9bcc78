//! Ground control coordinates of markers, formatted for the
//! "transform from markers" alignment step.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use glam::DVec3;

use crate::config::Delimiter;
use crate::error::{MarkerError, Result};

/// marker id -> (easting, northing, elevation)
pub type MarkerCoordinates = HashMap<u32, DVec3>;

/// Reads `markerId, easting, northing, elevation` rows and adds `offset`.
///
/// A missing file gives an empty table.
pub fn load_coordinates<P: AsRef<Path>>(
    path: P,
    delimiter: Delimiter,
    offset: DVec3,
) -> Result<MarkerCoordinates> {
    let path = path.as_ref();
    if !path.is_file() {
        log::warn!("coordinates file {} not found", path.display());
        return Ok(MarkerCoordinates::new());
    }
    coordinates_from_reader(std::fs::File::open(path)?, delimiter, offset)
}

pub fn coordinates_from_reader<R: Read>(
    reader: R,
    delimiter: Delimiter,
    offset: DVec3,
) -> Result<MarkerCoordinates> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(reader);

    let mut coords = MarkerCoordinates::new();
    for rec in rdr.records() {
        let rec = rec?;
        let line = rec.position().map(|p| p.line()).unwrap_or_default();
        if rec.len() < 4 {
            log::warn!("line {}: could not read GCP coordinates", line);
            continue;
        }
        let field = |i: usize| -> Result<f64> {
            rec[i].trim().parse::<f64>().map_err(|_| {
                MarkerError::Parse(format!("line {}: {:?} is not a number", line, &rec[i]))
            })
        };
        let id = field(0)?;
        if id < 0.0 || id.fract() != 0.0 || id > u32::MAX as f64 {
            return Err(MarkerError::Parse(format!(
                "line {}: invalid marker id {}",
                line, id
            )));
        }
        let p = DVec3::new(field(1)?, field(2)?, field(3)?);
        coords.insert(id as u32, p + offset);
    }
    Ok(coords)
}

/// Picks the markers named in a comma separated id list.
///
/// Tokens that are not integers are skipped. A repeated id is kept once, at
/// the position it first appears.
pub fn select_markers(ids: &str, coords: &MarkerCoordinates) -> Result<Vec<(u32, DVec3)>> {
    let mut picked: Vec<(u32, DVec3)> = Vec::new();
    for id in ids
        .split(',')
        .filter_map(|token| token.trim().parse::<u32>().ok())
    {
        if picked.iter().any(|(seen, _)| *seen == id) {
            continue;
        }
        let p = coords.get(&id).ok_or(MarkerError::UnknownMarker(id))?;
        picked.push((id, *p));
    }
    Ok(picked)
}

/// ` --markers id:e,n,z id:e,n,z ...` with `precision` decimals.
pub fn format_markers_arg(markers: &[(u32, DVec3)], precision: usize) -> String {
    let mut arg = String::from(" --markers");
    for (id, p) in markers {
        arg += &format!(
            " {}:{:.prec$},{:.prec$},{:.prec$}",
            id,
            p.x,
            p.y,
            p.z,
            prec = precision
        );
    }
    arg
}
