use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarkerError>;

#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("{what} not found: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    /// Only ids 0..128 fit into the one-hot descriptor block.
    #[error("marker id {marker_id} in view {view_id} exceeds the 128-tag limit")]
    MarkerIdOutOfRange { marker_id: u32, view_id: u64 },
    #[error("no coordinates for marker {0}")]
    UnknownMarker(u32),
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarkerError {
    pub(crate) fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        MarkerError::NotFound {
            what,
            path: path.into(),
        }
    }

    /// True for every kind that came from malformed input rather than the filesystem.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            MarkerError::Parse(_) | MarkerError::Json(_) | MarkerError::Csv(_)
        )
    }
}
