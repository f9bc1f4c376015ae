//! Lloyd-style k-means over 8-bit RGB points.
//!
//! Seeding is k-means++ driven by a seeded [`StdRng`], so a run is fully
//! determined by its input points, `k` and the seed. The assignment and
//! accumulation passes are split into fixed-size chunks; with the `parallel`
//! feature those chunks go to the rayon pool. Per-cluster sums are exact
//! integer sums, so combining them in any order gives the same centroids.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::cloud::Centroid;

/// Points handled per unit of work in the assignment and update passes.
const CHUNK: usize = 4096;

/// Marks a point that has not been assigned yet.
const UNASSIGNED: usize = usize::MAX;

/// Outcome of one k-means run.
#[derive(Clone, Debug, PartialEq)]
pub struct Clustering {
    pub centroids: Vec<Centroid>,
    pub assignment: Vec<usize>,
    /// Number of update steps performed.
    pub iterations: usize,
    /// `false` when `max_iter` was hit before assignments settled.
    pub converged: bool,
    pub inertia: f64,
}

/// Cluster `points` into `k` groups.
///
/// `points` must be non-empty and `k` at least one; both are checked by the
/// public entry point before getting here. Hitting `max_iter` is not an
/// error, the last assignment is returned as is.
pub fn run(points: &[[u8; 3]], k: usize, max_iter: usize, rng: &mut StdRng) -> Clustering {
    debug_assert!(!points.is_empty() && k > 0);

    let mut centroids = seed_centroids(points, k, rng);
    let mut assignment = vec![UNASSIGNED; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    loop {
        let changed = assign(points, &centroids, &mut assignment);
        if changed == 0 {
            converged = true;
            break;
        }
        update(points, &assignment, &mut centroids);
        iterations += 1;
        if iterations >= max_iter {
            break;
        }
    }

    let inertia = inertia(points, &centroids, &assignment);
    Clustering {
        centroids,
        assignment,
        iterations,
        converged,
        inertia,
    }
}

/// k-means++ seeding.
///
/// The first centroid is a uniformly sampled point. Each following one is
/// drawn with probability proportional to its squared distance from the
/// closest centroid chosen so far. Once every point coincides with some
/// centroid (fewer distinct colors than `k`) the draw falls back to uniform,
/// which produces duplicate centroids that end up as empty clusters.
pub fn seed_centroids(points: &[[u8; 3]], k: usize, rng: &mut StdRng) -> Vec<Centroid> {
    let mut centroids = Vec::with_capacity(k);
    // Index draws go through u64: a usize range consumes the RNG differently
    // on 32-bit targets such as wasm32.
    let first = Centroid::from_point(points[rng.gen_range(0..points.len() as u64) as usize]);
    centroids.push(first);

    let mut nearest: Vec<f64> = points.iter().map(|&p| first.distance_sq(p)).collect();

    while centroids.len() < k {
        let idx = match WeightedIndex::new(&nearest) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..points.len() as u64) as usize,
        };
        let next = Centroid::from_point(points[idx]);
        for (d, &p) in nearest.iter_mut().zip(points) {
            *d = d.min(next.distance_sq(p));
        }
        centroids.push(next);
    }

    centroids
}

/// Index of the closest centroid; ties go to the lowest index.
#[inline(always)]
pub fn nearest_centroid(centroids: &[Centroid], p: [u8; 3]) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, c) in centroids.iter().enumerate() {
        let d = c.distance_sq(p);
        if d < best_dist {
            best_dist = d;
            best_idx = idx;
        }
    }
    best_idx
}

fn assign_chunk(centroids: &[Centroid], points: &[[u8; 3]], labels: &mut [usize]) -> usize {
    let mut changed = 0;
    for (&p, label) in points.iter().zip(labels.iter_mut()) {
        let idx = nearest_centroid(centroids, p);
        if idx != *label {
            *label = idx;
            changed += 1;
        }
    }
    changed
}

/// Point every label at its nearest centroid. Returns how many labels moved.
pub fn assign(points: &[[u8; 3]], centroids: &[Centroid], labels: &mut [usize]) -> usize {
    #[cfg(feature = "parallel")]
    {
        points
            .par_chunks(CHUNK)
            .zip(labels.par_chunks_mut(CHUNK))
            .map(|(pts, lbls)| assign_chunk(centroids, pts, lbls))
            .sum()
    }
    #[cfg(not(feature = "parallel"))]
    {
        points
            .chunks(CHUNK)
            .zip(labels.chunks_mut(CHUNK))
            .map(|(pts, lbls)| assign_chunk(centroids, pts, lbls))
            .sum()
    }
}

/// Per-cluster channel sums and member counts.
#[derive(Clone, Debug, PartialEq)]
struct ClusterSums {
    sums: Vec<[u64; 3]>,
    counts: Vec<u64>,
}

impl ClusterSums {
    fn new(k: usize) -> Self {
        Self {
            sums: vec![[0; 3]; k],
            counts: vec![0; k],
        }
    }

    fn add_chunk(mut self, points: &[[u8; 3]], labels: &[usize]) -> Self {
        for (&p, &label) in points.iter().zip(labels) {
            let s = &mut self.sums[label];
            s[0] += p[0] as u64;
            s[1] += p[1] as u64;
            s[2] += p[2] as u64;
            self.counts[label] += 1;
        }
        self
    }

    fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.sums.iter_mut().zip(&other.sums) {
            a[0] += b[0];
            a[1] += b[1];
            a[2] += b[2];
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self
    }
}

/// Move every centroid to the mean of its members.
///
/// A cluster with no members keeps its previous centroid.
pub fn update(points: &[[u8; 3]], labels: &[usize], centroids: &mut [Centroid]) {
    let k = centroids.len();

    #[cfg(feature = "parallel")]
    let totals = points
        .par_chunks(CHUNK)
        .zip(labels.par_chunks(CHUNK))
        .fold(|| ClusterSums::new(k), |acc, (pts, lbls)| acc.add_chunk(pts, lbls))
        .reduce(|| ClusterSums::new(k), ClusterSums::merge);

    #[cfg(not(feature = "parallel"))]
    let totals = points
        .chunks(CHUNK)
        .zip(labels.chunks(CHUNK))
        .fold(ClusterSums::new(k), |acc, (pts, lbls)| acc.add_chunk(pts, lbls));

    for ((c, sum), &count) in centroids.iter_mut().zip(&totals.sums).zip(&totals.counts) {
        if count == 0 {
            continue;
        }
        let n = count as f64;
        c.0 = [sum[0] as f64 / n, sum[1] as f64 / n, sum[2] as f64 / n];
    }
}

/// Sum of squared distances from each point to its assigned centroid.
pub fn inertia(points: &[[u8; 3]], centroids: &[Centroid], labels: &[usize]) -> f64 {
    points
        .iter()
        .zip(labels)
        .map(|(&p, &label)| centroids[label].distance_sq(p))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn ties_go_to_the_lowest_index() {
        let centroids = [
            Centroid([10.0, 0.0, 0.0]),
            Centroid([0.0, 10.0, 0.0]),
            Centroid([0.0, 0.0, 10.0]),
        ];
        assert_eq!(nearest_centroid(&centroids, [0, 0, 0]), 0);

        let dupes = [Centroid([5.0, 5.0, 5.0]); 4];
        assert_eq!(nearest_centroid(&dupes, [5, 5, 5]), 0);
    }

    #[test]
    fn assign_counts_moved_labels() {
        let points = [[0, 0, 0], [250, 250, 250], [10, 10, 10]];
        let centroids = [Centroid([0.0; 3]), Centroid([255.0; 3])];
        let mut labels = vec![UNASSIGNED; 3];

        assert_eq!(assign(&points, &centroids, &mut labels), 3);
        assert_eq!(labels, vec![0, 1, 0]);
        assert_eq!(assign(&points, &centroids, &mut labels), 0);
    }

    #[test]
    fn update_takes_means_and_freezes_empty_clusters() {
        let points = [[0, 0, 0], [10, 20, 31], [100, 100, 100]];
        let labels = [0, 0, 2];
        let mut centroids = vec![
            Centroid([1.0, 1.0, 1.0]),
            Centroid([42.0, 43.0, 44.0]),
            Centroid([0.0, 0.0, 0.0]),
        ];
        update(&points, &labels, &mut centroids);

        assert_eq!(centroids[0], Centroid([5.0, 10.0, 15.5]));
        assert_eq!(centroids[1], Centroid([42.0, 43.0, 44.0]));
        assert_eq!(centroids[2], Centroid([100.0, 100.0, 100.0]));
    }

    #[test]
    fn update_spans_chunk_boundaries() {
        let n = CHUNK * 2 + 17;
        let points: Vec<[u8; 3]> = (0..n).map(|i| [(i % 2) as u8 * 2, 7, 255]).collect();
        let labels = vec![0; n];
        let mut centroids = vec![Centroid::default()];
        update(&points, &labels, &mut centroids);

        let ones = (n / 2) as f64 * 2.0;
        assert_eq!(centroids[0], Centroid([ones / n as f64, 7.0, 255.0]));
    }

    #[test]
    fn seeding_is_reproducible() {
        let points: Vec<[u8; 3]> = (0..500u32)
            .map(|i| [(i * 7 % 256) as u8, (i * 13 % 256) as u8, (i * 29 % 256) as u8])
            .collect();
        let a = seed_centroids(&points, 8, &mut rng(3));
        let b = seed_centroids(&points, 8, &mut rng(3));
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn seeding_picks_distinct_colors_first() {
        let points = [[0, 0, 0], [0, 0, 0], [255, 255, 255], [255, 255, 255]];
        for seed in 0..20 {
            let c = seed_centroids(&points, 2, &mut rng(seed));
            assert_ne!(c[0], c[1], "seed {seed}");
        }
    }

    #[test]
    fn seeding_survives_more_clusters_than_colors() {
        let points = [[9, 9, 9]; 3];
        let c = seed_centroids(&points, 256, &mut rng(0));
        assert_eq!(c.len(), 256);
        assert!(c.iter().all(|c| *c == Centroid([9.0, 9.0, 9.0])));
    }

    #[test]
    fn uniform_input_converges_after_one_update() {
        let points = vec![[12, 34, 56]; 1000];
        let result = run(&points, 5, 300, &mut rng(42));

        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert!(result.assignment.iter().all(|&l| l == 0));
        assert_eq!(result.inertia, 0.0);
    }

    #[test]
    fn iteration_cap_returns_best_effort() {
        let points: Vec<[u8; 3]> = (0..=255u8).map(|v| [v, 255 - v, v / 2]).collect();
        let result = run(&points, 6, 1, &mut rng(1));

        assert_eq!(result.iterations, 1);
        assert_eq!(result.assignment.len(), points.len());
        assert!(result.assignment.iter().all(|&l| l < 6));
    }

    #[test]
    fn separated_groups_are_recovered() {
        let mut points = vec![[10, 10, 10]; 50];
        points.extend(vec![[240, 20, 20]; 50]);
        points.extend(vec![[20, 20, 240]; 50]);
        let result = run(&points, 3, 300, &mut rng(42));

        assert!(result.converged);
        assert_eq!(result.inertia, 0.0);
        let mut labels: Vec<usize> = vec![result.assignment[0], result.assignment[50], result.assignment[100]];
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 3);
    }

    fn spread_points() -> Vec<[u8; 3]> {
        (0..12u32)
            .map(|i| [(i * 37 % 256) as u8, (i * 91 % 256) as u8, (i * 53 % 256) as u8])
            .collect()
    }

    #[test]
    fn seeded_centroids_are_pinned() {
        let points = spread_points();

        let c = |r: f64, g: f64, b: f64| Centroid([r, g, b]);
        assert_eq!(
            seed_centroids(&points, 4, &mut rng(7)),
            vec![c(0.0, 0.0, 0.0), c(185.0, 199.0, 9.0), c(111.0, 17.0, 159.0), c(3.0, 125.0, 115.0)]
        );
        assert_eq!(
            seed_centroids(&points, 4, &mut rng(42)),
            vec![c(222.0, 34.0, 62.0), c(3.0, 125.0, 115.0), c(40.0, 216.0, 168.0), c(148.0, 108.0, 212.0)]
        );
    }
}
