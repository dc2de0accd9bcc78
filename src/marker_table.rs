use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use log::Level;

use crate::config::Delimiter;
use crate::error::{MarkerError, Result};
use crate::observer::ImportObserver;

const FIELD_COUNT: usize = 5;

/// One marker on one image.
///
/// Coordinates and size keep their textual form; they are only written back out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerObservation {
    pub x: String,
    pub y: String,
    pub image_file_name: String,
    pub marker_id: u32,
    pub size: String,
}

/// Marker observations grouped by image name.
///
/// Groups appear in the order their image is first mentioned and each group
/// keeps the row order of the table.
#[derive(Debug, Clone, Default)]
pub struct MarkerTable {
    groups: Vec<(String, Vec<MarkerObservation>)>,
    by_image: HashMap<String, usize>,
    rows: usize,
}

impl MarkerTable {
    /// Reads `x, y, imageFileName, markerId, size` rows without a header.
    pub fn load<P: AsRef<Path>>(
        path: P,
        delimiter: Delimiter,
        observer: &dyn ImportObserver,
    ) -> Result<MarkerTable> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MarkerError::not_found("marker features list file", path));
        }
        let table = Self::from_reader(std::fs::File::open(path)?, delimiter)?;
        for (image, markers) in table.images() {
            observer.log(
                Level::Debug,
                &format!("{}: {} marker(s)", image, markers.len()),
            );
        }
        observer.log(
            Level::Info,
            &format!(
                "Loaded {} marker matches in {} image(s)",
                table.row_count(),
                table.image_count()
            ),
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: Delimiter) -> Result<MarkerTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter.as_byte())
            .from_reader(reader);

        let mut table = MarkerTable::default();
        for rec in rdr.records() {
            let rec = rec?;
            let line = rec.position().map(|p| p.line()).unwrap_or_default();
            if rec.len() < FIELD_COUNT {
                return Err(MarkerError::Parse(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    FIELD_COUNT,
                    rec.len()
                )));
            }
            let marker_id: u32 = rec[3].trim().parse().map_err(|_| {
                MarkerError::Parse(format!("line {}: invalid marker id {:?}", line, &rec[3]))
            })?;
            table.push(MarkerObservation {
                x: rec[0].to_string(),
                y: rec[1].to_string(),
                image_file_name: rec[2].to_string(),
                marker_id,
                size: rec[4].to_string(),
            });
        }
        Ok(table)
    }

    pub fn push(&mut self, observation: MarkerObservation) {
        let idx = match self.by_image.get(&observation.image_file_name) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.by_image
                    .insert(observation.image_file_name.clone(), idx);
                self.groups
                    .push((observation.image_file_name.clone(), Vec::new()));
                idx
            }
        };
        self.groups[idx].1.push(observation);
        self.rows += 1;
    }

    /// Observations of one image in row order.
    pub fn markers_for(&self, image_file_name: &str) -> Option<&[MarkerObservation]> {
        self.by_image
            .get(image_file_name)
            .map(|&idx| self.groups[idx].1.as_slice())
    }

    pub fn images(&self) -> impl Iterator<Item = (&str, &[MarkerObservation])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn image_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
