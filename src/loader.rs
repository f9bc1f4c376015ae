use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{ImageError, ImageReader, RgbImage};

use crate::error::{Result, SegmentError};

/// Read an image file from disk and normalise it to 8-bit RGB.
///
/// The format is sniffed from the file contents rather than trusted from the
/// extension. Alpha channels are dropped and grey images are expanded, so the
/// caller always gets `R, G, B` order regardless of how the file stored it.
pub fn load(path: impl AsRef<Path>) -> Result<RgbImage> {
    let path = path.as_ref();
    let not_found = || SegmentError::NotFound {
        path: path.to_path_buf(),
    };

    if !path.is_file() {
        return Err(not_found());
    }
    let file = File::open(path).map_err(|_| not_found())?;

    let reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|e| SegmentError::DecodeError(ImageError::IoError(e)))?;
    let img = reader.decode().map_err(SegmentError::DecodeError)?;

    Ok(img.to_rgb8())
}

/// Same as [`load`] for an in-memory encoded buffer.
pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(SegmentError::DecodeError)?;
    Ok(img.to_rgb8())
}
