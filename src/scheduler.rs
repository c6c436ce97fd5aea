//! Parallel work distribution for the force-evaluation phase.
//!
//! Force evaluation is the only parallel phase: the tree is immutable for its
//! duration, positions and masses are read-only, and each output word has
//! exactly one writer. The scheduling primitive is deliberately narrow —
//! "apply a function to contiguous index chunks with dynamic assignment" —
//! so any worker-pool implementation can satisfy it; here it is rayon's
//! work-stealing pool, which gives the dynamic load balance for free.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::errors::SimError;

/// Default number of contiguous particle indices per work unit. After a
/// Morton sort a chunk of this size touches a largely shared set of tree
/// nodes; sizes from 8 to 128 behave similarly, while much smaller chunks
/// drown in scheduling overhead and much larger ones lose load balance.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Builds a worker pool with exactly `n_threads` threads.
pub fn build_pool(n_threads: usize) -> Result<ThreadPool, SimError> {
    if n_threads == 0 {
        return Err(SimError::ArgumentInvalid(
            "worker thread count must be at least 1".to_string(),
        ));
    }
    ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map_err(|err| SimError::ArgumentInvalid(format!("failed to build worker pool: {}", err)))
}

/// Applies `op` to dynamically scheduled contiguous chunks of two output
/// slices. `op` receives the base index of its chunk plus mutable views of
/// the chunk's words in each slice; chunks never overlap, so no worker ever
/// writes a word another worker reads or writes. The call joins all workers
/// before returning, which is the only ordering guarantee the integrator
/// needs.
pub fn dynamic_chunk_map<F>(
    pool: &ThreadPool,
    chunk_size: usize,
    out_x: &mut [f64],
    out_y: &mut [f64],
    op: F,
) where
    F: Fn(usize, &mut [f64], &mut [f64]) + Sync + Send,
{
    let chunk = chunk_size.max(1);
    pool.install(|| {
        out_x
            .par_chunks_mut(chunk)
            .zip(out_y.par_chunks_mut(chunk))
            .enumerate()
            .for_each(|(ci, (cx, cy))| op(ci * chunk, cx, cy));
    });
}
