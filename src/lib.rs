//! Color segmentation by k-means in RGB space.
//!
//! [`load`] (or [`decode`]) turns an image file into an RGB pixel grid and
//! [`quantize`] partitions its pixels into `k` color clusters, returning one
//! image per cluster that keeps only the pixels assigned to it, painted in the
//! cluster's mean color on a black background.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = color_segment::load("photo.jpg")?;
//! let result = color_segment::quantize(img, 5)?;
//! for (i, cluster) in result.clusters().iter().enumerate() {
//!     cluster.save(format!("cluster_{}.png", i + 1))?;
//! }
//! # Ok(())
//! # }
//! ```

mod cloud;
mod error;
pub mod kmeans;
mod loader;
mod quantize;
mod wasm;

pub use cloud::{Centroid, Pixel, PixelCloud};
pub use error::{Result, SegmentError};
pub use loader::{decode, load};
pub use quantize::{
    ClusterResult, DEFAULT_MAX_ITER, DEFAULT_SEED, MAX_CLUSTERS, QuantizeOptions, quantize, quantize_with,
};
pub use wasm::{encode_png, segment};
