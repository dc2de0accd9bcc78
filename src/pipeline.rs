use std::path::PathBuf;

use log::Level;

use crate::config::{DescriberType, ImportConfig};
use crate::descriptor_writer::{DescriptorWriter, FeatureIndex, MarkerPresenceCount};
use crate::error::{MarkerError, Result};
use crate::marker_table::MarkerTable;
use crate::match_emitter::write_matches;
use crate::observer::ImportObserver;
use crate::view_catalog::ViewCatalog;

/// Input files and output folders of one import.
#[derive(Debug, Clone)]
pub struct ImportPaths {
    /// Scene description holding the `views` list.
    pub views: PathBuf,
    /// Marker table.
    pub markers: PathBuf,
    /// Folder receiving `*.feat` / `*.desc`.
    pub output_dir: PathBuf,
    /// Folder receiving `0.matches.txt`.
    pub matches_dir: PathBuf,
}

impl ImportPaths {
    /// Features, descriptors and matches all go to `output_dir`.
    pub fn new(
        views: impl Into<PathBuf>,
        markers: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let output_dir = output_dir.into();
        Self {
            views: views.into(),
            markers: markers.into(),
            matches_dir: output_dir.clone(),
            output_dir,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub describer_type: DescriberType,
    pub bypass_limit: bool,
    pub views: usize,
    pub marker_rows: usize,
    pub images_with_markers: usize,
    pub marker_presence: MarkerPresenceCount,
    pub feature_index: FeatureIndex,
    /// Number of blocks in the matches file, `None` when no file was written.
    pub match_blocks: Option<usize>,
    pub matches_path: Option<PathBuf>,
}

/// Runs the whole import.
///
/// Errors are logged at error level and returned. `observer.finish()` is
/// called exactly once whatever the outcome.
pub fn run(
    paths: &ImportPaths,
    config: &ImportConfig,
    observer: &dyn ImportObserver,
) -> Result<ImportSummary> {
    let result = run_stages(paths, config, observer);
    if let Err(e) = &result {
        observer.log(Level::Error, &e.to_string());
    }
    observer.finish();
    result
}

fn run_stages(
    paths: &ImportPaths,
    config: &ImportConfig,
    observer: &dyn ImportObserver,
) -> Result<ImportSummary> {
    observer.log(Level::Info, "Importing marker data");
    if !paths.markers.is_file() {
        return Err(MarkerError::not_found(
            "marker features list file",
            &paths.markers,
        ));
    }

    let catalog = ViewCatalog::load(&paths.views, observer)?;
    let table = MarkerTable::load(&paths.markers, config.delimiter, observer)?;

    let orphans = table
        .images()
        .filter(|(name, _)| catalog.get(name).is_none())
        .count();
    if orphans > 0 {
        observer.log(
            Level::Warn,
            &format!("{} image(s) of the marker table match no view", orphans),
        );
    }

    let output = DescriptorWriter::new(&paths.output_dir, config).write_all(
        &catalog,
        &table,
        observer,
    )?;

    let (matches_path, match_blocks) = if config.bypass_limit {
        let (path, blocks) = write_matches(
            &paths.matches_dir,
            &catalog.view_ids(),
            &output.feature_index,
            config.describer_type,
            observer,
        )?;
        (Some(path), Some(blocks))
    } else {
        (None, None)
    };

    observer.log(Level::Info, "Task done");
    Ok(ImportSummary {
        describer_type: config.describer_type,
        bypass_limit: config.bypass_limit,
        views: catalog.len(),
        marker_rows: table.row_count(),
        images_with_markers: table.image_count(),
        marker_presence: output.marker_presence,
        feature_index: output.feature_index,
        match_blocks,
        matches_path,
    })
}
