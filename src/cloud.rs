//! Point-cloud view of an image in RGB space.

use image::{Rgb, RgbImage};
use palette::Srgb;

/// One 8-bit RGB pixel.
pub type Pixel = Rgb<u8>;

/// The pixels of an image flattened in row-major order.
///
/// Point `i` comes from row `i / width`, column `i % width` of the source.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelCloud {
    points: Vec<[u8; 3]>,
    width: u32,
    height: u32,
}

impl PixelCloud {
    pub fn from_image(img: &RgbImage) -> Self {
        let points = img.pixels().map(|p| p.0).collect();
        Self {
            points,
            width: img.width(),
            height: img.height(),
        }
    }

    pub fn points(&self) -> &[[u8; 3]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// `(row, column)` of the source pixel behind point `index`.
    pub fn position(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index / width) as u32, (index % width) as u32)
    }
}

/// Mean color of a cluster, kept in floating point until output.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Centroid(pub [f64; 3]);

impl Centroid {
    pub fn from_point(p: [u8; 3]) -> Self {
        Self([p[0] as f64, p[1] as f64, p[2] as f64])
    }

    #[inline(always)]
    pub fn distance_sq(&self, p: [u8; 3]) -> f64 {
        let dr = self.0[0] - p[0] as f64;
        let dg = self.0[1] - p[1] as f64;
        let db = self.0[2] - p[2] as f64;
        dr * dr + dg * dg + db * db
    }

    /// Round half away from zero, then clamp each channel to `0..=255`.
    pub fn to_pixel(&self) -> Pixel {
        Rgb(self.0.map(|c| c.round().clamp(0.0, 255.0) as u8))
    }

    pub fn to_srgb(&self) -> Srgb<u8> {
        let [r, g, b] = self.to_pixel().0;
        Srgb::new(r, g, b)
    }
}
