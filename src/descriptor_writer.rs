use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::Level;
use rayon::prelude::*;

use crate::config::{DescriberType, ImportConfig};
use crate::error::{MarkerError, Result};
use crate::marker_table::{MarkerObservation, MarkerTable};
use crate::observer::ImportObserver;
use crate::view_catalog::{View, ViewCatalog};

/// Size of the one-hot indicator block, i.e. the 128-tag limit.
pub const INDICATOR_LEN: usize = 128;
/// Value flagging a marker id inside the indicator block.
pub const INDICATOR_ON: u8 = 255;
/// Markers are single points, orientation is always written as zero.
const ORIENTATION: &str = "0";

/// view id -> marker id -> row of that marker in the view's feature file
pub type FeatureIndex = BTreeMap<u64, BTreeMap<u32, usize>>;
/// marker id -> number of views it was written to
pub type MarkerPresenceCount = BTreeMap<u32, usize>;

pub fn feature_file_name(view_id: u64, describer_type: DescriberType) -> String {
    format!("{}.{}.feat", view_id, describer_type)
}

pub fn descriptor_file_name(view_id: u64, describer_type: DescriberType) -> String {
    format!("{}.{}.desc", view_id, describer_type)
}

/// Feature lines `x y size orientation`, one per marker.
pub fn encode_features(markers: &[MarkerObservation]) -> String {
    markers
        .iter()
        .map(|m| format!("{} {} {} {}\n", m.x, m.y, m.size, ORIENTATION))
        .collect()
}

/// Little-endian marker count, followed by the indicator block unless the
/// limit is bypassed or the view has no markers.
///
/// Only the id of the last marker ends up flagged in the block. Consumers
/// of these files rely on exactly that layout, so it is kept as is.
pub fn encode_descriptor(
    view_id: u64,
    markers: &[MarkerObservation],
    bypass_limit: bool,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(8 + INDICATOR_LEN);
    bytes.extend_from_slice(&(markers.len() as u64).to_le_bytes());
    if bypass_limit {
        return Ok(bytes);
    }
    check_limit(view_id, markers)?;
    if let Some(last) = markers.last() {
        let mut block = [0u8; INDICATOR_LEN];
        block[last.marker_id as usize] = INDICATOR_ON;
        bytes.extend_from_slice(&block);
    }
    Ok(bytes)
}

fn check_limit(view_id: u64, markers: &[MarkerObservation]) -> Result<()> {
    match markers
        .iter()
        .find(|m| m.marker_id as usize >= INDICATOR_LEN)
    {
        Some(m) => Err(MarkerError::MarkerIdOutOfRange {
            marker_id: m.marker_id,
            view_id,
        }),
        None => Ok(()),
    }
}

/// Result of writing every view of the catalog.
#[derive(Debug, Clone, Default)]
pub struct DescriptorOutput {
    pub feature_index: FeatureIndex,
    pub marker_presence: MarkerPresenceCount,
}

/// Writes one feature file and one descriptor file per catalogued view.
pub struct DescriptorWriter {
    output_dir: PathBuf,
    describer_type: DescriberType,
    bypass_limit: bool,
    parallel: bool,
}

impl DescriptorWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P, config: &ImportConfig) -> DescriptorWriter {
        DescriptorWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
            describer_type: config.describer_type,
            bypass_limit: config.bypass_limit,
            parallel: config.parallel,
        }
    }

    pub fn feature_path(&self, view_id: u64) -> PathBuf {
        self.output_dir
            .join(feature_file_name(view_id, self.describer_type))
    }

    pub fn descriptor_path(&self, view_id: u64) -> PathBuf {
        self.output_dir
            .join(descriptor_file_name(view_id, self.describer_type))
    }

    /// Writes the file pair of a single view and returns its marker rows.
    ///
    /// Views without markers still get a zero-count descriptor and an empty
    /// feature file. Both files are flushed and closed before returning.
    pub fn write_view(
        &self,
        view: &View,
        markers: Option<&[MarkerObservation]>,
        observer: &dyn ImportObserver,
    ) -> Result<BTreeMap<u32, usize>> {
        let markers = markers.unwrap_or_default();
        let descriptor = encode_descriptor(view.view_id, markers, self.bypass_limit)?;

        let mut feat = BufWriter::new(File::create(self.feature_path(view.view_id))?);
        feat.write_all(encode_features(markers).as_bytes())?;
        feat.flush()?;

        let mut desc = BufWriter::new(File::create(self.descriptor_path(view.view_id))?);
        desc.write_all(&descriptor)?;
        desc.flush()?;

        observer.log(
            Level::Debug,
            &format!(
                "view {} ({}): {} marker(s)",
                view.view_id,
                view.file_name,
                markers.len()
            ),
        );
        Ok(markers
            .iter()
            .enumerate()
            .map(|(row, m)| (m.marker_id, row))
            .collect())
    }

    /// Writes every view, then logs the per-marker report.
    ///
    /// The first failing view aborts the run; files of views written before
    /// it stay on disk.
    pub fn write_all(
        &self,
        catalog: &ViewCatalog,
        table: &MarkerTable,
        observer: &dyn ImportObserver,
    ) -> Result<DescriptorOutput> {
        observer.log(
            Level::Info,
            &format!("Writing {} descriptor files", self.describer_type),
        );
        std::fs::create_dir_all(&self.output_dir)?;

        let mut output = DescriptorOutput::default();
        for (_, markers) in table.images() {
            for m in markers {
                output.marker_presence.insert(m.marker_id, 0);
            }
        }

        let total = catalog.len();
        observer.report_progress(0, total);
        let per_view: Vec<(u64, BTreeMap<u32, usize>)> = if self.parallel {
            // progress is reported while holding the counter so calls stay ordered
            let done = Mutex::new(0usize);
            let results: Vec<Result<(u64, BTreeMap<u32, usize>)>> = catalog
                .views()
                .par_iter()
                .map(|view| {
                    let rows =
                        self.write_view(view, table.markers_for(&view.file_name), observer);
                    if let Ok(mut n) = done.lock() {
                        *n += 1;
                        observer.report_progress(*n, total);
                    }
                    rows.map(|rows| (view.view_id, rows))
                })
                .collect();
            results.into_iter().collect::<Result<_>>()?
        } else {
            let mut rows_per_view = Vec::with_capacity(total);
            for (i, view) in catalog.views().iter().enumerate() {
                let rows =
                    self.write_view(view, table.markers_for(&view.file_name), observer)?;
                rows_per_view.push((view.view_id, rows));
                observer.report_progress(i + 1, total);
            }
            rows_per_view
        };

        for (view_id, rows) in per_view {
            for marker_id in rows.keys() {
                *output.marker_presence.entry(*marker_id).or_default() += 1;
            }
            output.feature_index.insert(view_id, rows);
        }

        observer.log(Level::Info, "Markers report:");
        for (marker_id, views) in &output.marker_presence {
            observer.log(
                Level::Info,
                &format!("\tFound marker {} in {} view(s)", marker_id, views),
            );
        }
        Ok(output)
    }
}
