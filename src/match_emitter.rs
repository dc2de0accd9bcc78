use std::path::{Path, PathBuf};

use log::Level;

use crate::config::DescriberType;
use crate::descriptor_writer::FeatureIndex;
use crate::error::Result;
use crate::observer::ImportObserver;

pub const MATCHES_FILE_NAME: &str = "0.matches.txt";
/// Fixed flag line following each pair header.
const MATCH_TYPE: &str = "1";

/// Every unordered pair of views, same order as an exhaustive image matcher.
pub fn view_pairs(view_ids: &[u64]) -> Vec<(u64, u64)> {
    view_ids
        .iter()
        .enumerate()
        .flat_map(move |(i, &a)| view_ids[i + 1..].iter().map(move |&b| (a, b)))
        .collect()
}

/// Feature rows of the markers two views have in common.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchBlock {
    pub view_a: u64,
    pub view_b: u64,
    /// (row in view_a, row in view_b), ordered by marker id
    pub rows: Vec<(usize, usize)>,
}

/// Intersects the marker sets of every pair. Pairs sharing nothing are dropped.
pub fn compute_matches(pairs: &[(u64, u64)], index: &FeatureIndex) -> Vec<MatchBlock> {
    pairs
        .iter()
        .filter_map(|&(view_a, view_b)| {
            let (markers_a, markers_b) = (index.get(&view_a)?, index.get(&view_b)?);
            let rows: Vec<(usize, usize)> = markers_a
                .iter()
                .filter_map(|(id, &row_a)| markers_b.get(id).map(|&row_b| (row_a, row_b)))
                .collect();
            if rows.is_empty() {
                None
            } else {
                Some(MatchBlock {
                    view_a,
                    view_b,
                    rows,
                })
            }
        })
        .collect()
}

/// Text of the matches file: blocks joined by newlines, no trailing newline.
pub fn format_matches(blocks: &[MatchBlock], describer_type: DescriberType) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        lines.push(format!("{} {}", block.view_a, block.view_b));
        lines.push(MATCH_TYPE.to_string());
        lines.push(format!("{} {}", describer_type, block.rows.len()));
        lines.extend(block.rows.iter().map(|(a, b)| format!("{} {}", a, b)));
    }
    lines.join("\n")
}

/// Computes and writes `0.matches.txt` into `output_dir`.
pub fn write_matches<P: AsRef<Path>>(
    output_dir: P,
    view_ids: &[u64],
    index: &FeatureIndex,
    describer_type: DescriberType,
    observer: &dyn ImportObserver,
) -> Result<(PathBuf, usize)> {
    let pairs = view_pairs(view_ids);
    let blocks = compute_matches(&pairs, index);
    observer.log(
        Level::Debug,
        &format!("{} of {} view pairs share markers", blocks.len(), pairs.len()),
    );

    std::fs::create_dir_all(output_dir.as_ref())?;
    let path = output_dir.as_ref().join(MATCHES_FILE_NAME);
    std::fs::write(&path, format_matches(&blocks, describer_type))?;
    observer.log(
        Level::Info,
        &format!(
            "Wrote {} match block(s) to {}",
            blocks.len(),
            path.display()
        ),
    );
    Ok((path, blocks.len()))
}
