use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading a file and handing back
/// the per-cluster images.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Image not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Unable to decode image: {0}")]
    DecodeError(#[source] image::ImageError),

    #[error("Invalid number of clusters: {0} (must be 1-256)")]
    InvalidK(usize),

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("PNG encode error: {0}")]
    Encode(#[source] image::ImageError),
}

pub type Result<T> = std::result::Result<T, SegmentError>;
