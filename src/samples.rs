//! Initial-condition generators.
//!
//! Dataset files for real runs are produced by external tooling; these
//! generators exist for tests, benchmarks, and quick demos, and are
//! deterministic for a given seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::particles::ParticleSet;

/// Uniformly filled disk of `n` particles with radius `radius`, slowly
/// rotating as a rigid body. Masses and brightness are drawn near unity.
pub fn uniform_disk(n: usize, radius: f64, seed: u64) -> ParticleSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let omega = 0.1;
    let mut pos_x = Vec::with_capacity(n);
    let mut pos_y = Vec::with_capacity(n);
    let mut mass = Vec::with_capacity(n);
    let mut vel_x = Vec::with_capacity(n);
    let mut vel_y = Vec::with_capacity(n);
    let mut brightness = Vec::with_capacity(n);
    for _ in 0..n {
        // sqrt of a uniform draw makes the area density uniform
        let r = radius * rng.random_range(0.0f64..1.0).sqrt();
        let angle = rng.random_range(0.0..std::f64::consts::TAU);
        let (x, y) = (r * angle.cos(), r * angle.sin());
        pos_x.push(x);
        pos_y.push(y);
        mass.push(rng.random_range(0.5..1.5));
        vel_x.push(-omega * y);
        vel_y.push(omega * x);
        brightness.push(rng.random_range(0.1..1.0));
    }
    ParticleSet {
        pos_x,
        pos_y,
        mass,
        vel_x,
        vel_y,
        brightness,
    }
}

/// Several dense blobs scattered over a wide area; a deliberately unbalanced
/// distribution for scheduler and determinism tests.
pub fn clustered_blobs(n: usize, blobs: usize, seed: u64) -> ParticleSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let blobs = blobs.max(1);
    let centers: Vec<(f64, f64)> = (0..blobs)
        .map(|_| (rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0)))
        .collect();
    let mut pos_x = Vec::with_capacity(n);
    let mut pos_y = Vec::with_capacity(n);
    let mut mass = Vec::with_capacity(n);
    let mut vel_x = Vec::with_capacity(n);
    let mut vel_y = Vec::with_capacity(n);
    let mut brightness = Vec::with_capacity(n);
    for i in 0..n {
        let (cx, cy) = centers[i % blobs];
        pos_x.push(cx + rng.random_range(-0.5..0.5));
        pos_y.push(cy + rng.random_range(-0.5..0.5));
        mass.push(rng.random_range(0.5..1.5));
        vel_x.push(rng.random_range(-0.01..0.01));
        vel_y.push(rng.random_range(-0.01..0.01));
        brightness.push(rng.random_range(0.1..1.0));
    }
    ParticleSet {
        pos_x,
        pos_y,
        mass,
        vel_x,
        vel_y,
        brightness,
    }
}

/// Two equal masses on a circular orbit about their common center.
///
/// For separation `d`, mass `m`, and gravitational constant `g`, each body
/// circles at radius `d/2` with speed `sqrt(g * m / (2 * d))`; the engine's
/// `g` for two particles is 50.
pub fn two_body_circular(separation: f64, mass: f64, g: f64) -> ParticleSet {
    let half = 0.5 * separation;
    let speed = (g * mass / (2.0 * separation)).sqrt();
    ParticleSet {
        pos_x: vec![-half, half],
        pos_y: vec![0.0, 0.0],
        mass: vec![mass, mass],
        vel_x: vec![0.0, 0.0],
        vel_y: vec![-speed, speed],
        brightness: vec![1.0, 1.0],
    }
}
