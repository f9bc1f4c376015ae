use image::{Rgb, RgbImage};
use palette::Srgb;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cloud::{Centroid, PixelCloud};
use crate::error::{Result, SegmentError};
use crate::kmeans::{self, Clustering};

/// Largest accepted cluster count, one per representable 8-bit level.
pub const MAX_CLUSTERS: usize = 256;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MAX_ITER: usize = 300;

/// Tuning knobs for [`quantize_with`].
///
/// ```
/// # use color_segment::QuantizeOptions;
/// let options = QuantizeOptions::new().seed(7).max_iter(50).n_init(4);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantizeOptions {
    seed: u64,
    max_iter: usize,
    n_init: usize,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantizeOptions {
    pub const fn new() -> Self {
        Self {
            seed: DEFAULT_SEED,
            max_iter: DEFAULT_MAX_ITER,
            n_init: 1,
        }
    }

    /// Seed for centroid initialisation. The default is `42`.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cap on update steps per run. `0` is treated as `1`.
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Number of independently seeded runs; the one with the lowest inertia
    /// wins. Run `i` uses seed `seed + i`. `0` is treated as `1`.
    #[must_use]
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }
}

/// Output of [`quantize`]: one masked image per cluster plus the source.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterResult {
    original: RgbImage,
    clusters: Vec<RgbImage>,
    centroids: Vec<Centroid>,
    assignment: Vec<usize>,
    iterations: usize,
    converged: bool,
    inertia: f64,
}

impl ClusterResult {
    pub fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Cluster `c` shows `round(centroid[c])` where the source pixel belongs
    /// to `c` and black everywhere else.
    pub fn clusters(&self) -> &[RgbImage] {
        &self.clusters
    }

    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    /// Cluster index per source pixel, row-major.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn k(&self) -> usize {
        self.clusters.len()
    }

    /// Rounded centroid colors in cluster order.
    pub fn palette(&self) -> Vec<Srgb<u8>> {
        self.centroids.iter().map(Centroid::to_srgb).collect()
    }

    /// Palette as `RRGGBB` strings.
    pub fn palette_hex(&self) -> Vec<String> {
        self.palette()
            .iter()
            .map(|c| format!("{:02X}{:02X}{:02X}", c.red, c.green, c.blue))
            .collect()
    }

    /// Number of source pixels in each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &label in &self.assignment {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Split `image` into `k` color clusters with the default options.
pub fn quantize(image: RgbImage, k: usize) -> Result<ClusterResult> {
    quantize_with(image, k, &QuantizeOptions::default())
}

/// Split `image` into `k` color clusters.
///
/// Fails with [`SegmentError::InvalidK`] unless `1 <= k <= 256` and with
/// [`SegmentError::EmptyImage`] for a zero-pixel image. `k` may exceed the
/// number of distinct colors; the extra clusters come back all black.
pub fn quantize_with(image: RgbImage, k: usize, options: &QuantizeOptions) -> Result<ClusterResult> {
    if !(1..=MAX_CLUSTERS).contains(&k) {
        return Err(SegmentError::InvalidK(k));
    }
    let cloud = PixelCloud::from_image(&image);
    if cloud.is_empty() {
        return Err(SegmentError::EmptyImage);
    }

    let max_iter = options.max_iter.max(1);
    let run_seeded = |run: usize| {
        let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(run as u64));
        kmeans::run(cloud.points(), k, max_iter, &mut rng)
    };
    let mut best: Clustering = run_seeded(0);
    for run in 1..options.n_init.max(1) {
        let candidate = run_seeded(run);
        // Strict comparison keeps the earliest run on ties.
        if candidate.inertia < best.inertia {
            best = candidate;
        }
    }

    let clusters = paint_clusters(&cloud, &best.centroids, &best.assignment);

    Ok(ClusterResult {
        original: image,
        clusters,
        centroids: best.centroids,
        assignment: best.assignment,
        iterations: best.iterations,
        converged: best.converged,
        inertia: best.inertia,
    })
}

/// One image per centroid, lit only where the point belongs to that centroid.
fn paint_clusters(cloud: &PixelCloud, centroids: &[Centroid], assignment: &[usize]) -> Vec<RgbImage> {
    let (width, height) = cloud.dimensions();
    let mut clusters: Vec<RgbImage> = (0..centroids.len()).map(|_| RgbImage::new(width, height)).collect();
    let colors: Vec<Rgb<u8>> = centroids.iter().map(Centroid::to_pixel).collect();

    for (i, &label) in assignment.iter().enumerate() {
        let (row, col) = cloud.position(i);
        clusters[label].put_pixel(col, row, colors[label]);
    }
    clusters
}
