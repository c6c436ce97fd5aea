//! K-means spatial clustering: the alternative force-evaluation schedule.
//!
//! Historically the first parallel decomposition for this engine: partition
//! particles into `k` spatial clusters with `k` well above the thread count,
//! then schedule whole clusters onto workers. Ablation showed it strictly
//! slower than Morton-sorted dynamic chunks at every tested size, so it is
//! kept only as a benchmark option; [`crate::scheduler`] is the default.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::arena::{NodeArena, NodeId};
use crate::errors::SimError;
use crate::force;

/// Iteration cap for Lloyd's algorithm.
pub const MAX_ITERATIONS: usize = 50;

/// A k-means partition of the particle set.
pub struct KMeansClusters {
    pub centroid_x: Vec<f64>,
    pub centroid_y: Vec<f64>,
    /// Per-cluster member index lists. Every particle index appears in
    /// exactly one list.
    pub members: Vec<Vec<u32>>,
}

impl KMeansClusters {
    /// Clusters particle positions into `k` groups.
    ///
    /// Centroids are seeded from the first `k` particles; label assignment
    /// runs on the worker pool, centroid updates on the calling thread. The
    /// loop stops when no centroid moved (exact comparison) or after
    /// [`MAX_ITERATIONS`] rounds. A cluster left empty re-seeds its centroid
    /// from the position of particle `i` (for cluster `i`), which is why
    /// `k > N` is rejected up front: the re-seed index must name a particle.
    pub fn compute(
        pos_x: &[f64],
        pos_y: &[f64],
        k: usize,
        pool: &ThreadPool,
    ) -> Result<Self, SimError> {
        let n = pos_x.len();
        if k == 0 || k > n {
            return Err(SimError::ArgumentInvalid(format!(
                "cluster count must be in 1..={} (got {})",
                n, k
            )));
        }

        let mut centroid_x: Vec<f64> = pos_x[..k].to_vec();
        let mut centroid_y: Vec<f64> = pos_y[..k].to_vec();
        let mut labels: Vec<u32> = vec![0; n];

        let mut iterations = 0;
        loop {
            assign_labels(pos_x, pos_y, &centroid_x, &centroid_y, &mut labels, pool);

            let (new_x, new_y) = centroids(pos_x, pos_y, &labels, k);
            let converged = new_x == centroid_x && new_y == centroid_y;
            centroid_x = new_x;
            centroid_y = new_y;

            iterations += 1;
            if converged || iterations > MAX_ITERATIONS {
                break;
            }
        }

        let mut members: Vec<Vec<u32>> = vec![Vec::new(); k];
        for (i, &label) in labels.iter().enumerate() {
            members[label as usize].push(i as u32);
        }

        Ok(KMeansClusters {
            centroid_x,
            centroid_y,
            members,
        })
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Assigns each particle to its nearest centroid (squared distance, first
/// minimum wins) in parallel.
fn assign_labels(
    pos_x: &[f64],
    pos_y: &[f64],
    centroid_x: &[f64],
    centroid_y: &[f64],
    labels: &mut Vec<u32>,
    pool: &ThreadPool,
) {
    *labels = pool.install(|| {
        (0..pos_x.len())
            .into_par_iter()
            .map(|i| {
                let mut best = 0u32;
                let mut best_dist = f64::INFINITY;
                for (j, (&cx, &cy)) in centroid_x.iter().zip(centroid_y).enumerate() {
                    let dx = pos_x[i] - cx;
                    let dy = pos_y[i] - cy;
                    let dist = dx * dx + dy * dy;
                    if dist < best_dist {
                        best_dist = dist;
                        best = j as u32;
                    }
                }
                best
            })
            .collect()
    });
}

/// Recomputes centroids as member means; an empty cluster `i` falls back to
/// the position of particle `i`.
fn centroids(pos_x: &[f64], pos_y: &[f64], labels: &[u32], k: usize) -> (Vec<f64>, Vec<f64>) {
    let mut sum_x = vec![0.0f64; k];
    let mut sum_y = vec![0.0f64; k];
    let mut count = vec![0usize; k];
    for (i, &label) in labels.iter().enumerate() {
        sum_x[label as usize] += pos_x[i];
        sum_y[label as usize] += pos_y[i];
        count[label as usize] += 1;
    }
    for i in 0..k {
        if count[i] == 0 {
            sum_x[i] = pos_x[i];
            sum_y[i] = pos_y[i];
        } else {
            sum_x[i] /= count[i] as f64;
            sum_y[i] /= count[i] as f64;
        }
    }
    (sum_x, sum_y)
}

/// Cluster-scheduled force pass. Members of each cluster are evaluated in
/// parallel and the results scattered into `fx`/`fy` on the calling thread,
/// keeping the single-writer rule without scattered parallel writes. The
/// per-particle values are bit-identical to the chunked schedule: both run
/// the same traversal against the same tree.
#[allow(clippy::too_many_arguments)]
pub fn clustered_force_pass(
    clusters: &KMeansClusters,
    pool: &ThreadPool,
    arena: &NodeArena,
    root: NodeId,
    pos_x: &[f64],
    pos_y: &[f64],
    mass: &[f64],
    g: f64,
    theta: f64,
    fx: &mut [f64],
    fy: &mut [f64],
) {
    for members in &clusters.members {
        let results: Vec<(f64, f64)> = pool.install(|| {
            members
                .par_iter()
                .map(|&i| {
                    let i = i as usize;
                    force::force_on_particle(
                        arena,
                        root,
                        pos_x[i],
                        pos_y[i],
                        mass[i],
                        i as i32,
                        g,
                        theta,
                    )
                })
                .collect()
        });
        for (&i, (gx, gy)) in members.iter().zip(results) {
            fx[i as usize] = gx;
            fy[i as usize] = gy;
        }
    }
}
