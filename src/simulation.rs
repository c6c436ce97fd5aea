//! The per-instance simulation engine.
//!
//! A [`Simulation`] owns everything one run needs: the SoA particle state,
//! force and acceleration buffers, the node arena, and the worker pool.
//! There is no process-wide state; two simulations in one process cannot
//! observe each other. The per-step pipeline is: validate -> recompute the
//! region -> reset the arena -> build the tree -> evaluate forces in
//! parallel; the integrator wraps that kernel in a kick-drift-kick
//! velocity-Verlet step.

use log::{debug, warn};
use rayon::ThreadPool;

use crate::arena::NodeArena;
use crate::errors::SimError;
use crate::force;
use crate::kmeans::{self, KMeansClusters};
use crate::morton;
use crate::particles::ParticleSet;
use crate::quadtree::{self, Bounds};
use crate::scheduler;

/// How force evaluations are distributed over workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduling {
    /// Morton-ordered dynamic chunks. The default; assumes the driver keeps
    /// particles approximately Z-sorted via [`Simulation::resort`].
    MortonChunks,
    /// K-means clustered work units. Benchmark alternative only; measured
    /// slower than [`Scheduling::MortonChunks`] at every tested size.
    KMeans {
        /// Cluster count; must not exceed the particle count.
        k: usize,
    },
}

/// Steps between k-means re-clusterings while that schedule is active.
const RECLUSTER_INTERVAL: u64 = 10;

/// Engine configuration.
#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    /// Multipole acceptance parameter. `0.0` means exact (every leaf
    /// visited); larger values trade accuracy for speed. Finite and
    /// non-negative; the CLI additionally restricts it to `(0, 1]`.
    pub theta: f64,
    /// Integration time step, strictly positive.
    pub dt: f64,
    /// Worker threads for the force-evaluation phase.
    pub n_threads: usize,
    pub scheduling: Scheduling,
    /// Contiguous indices per dynamically scheduled work unit.
    pub chunk_size: usize,
    /// Arena slots per particle.
    pub arena_factor: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            theta: 0.5,
            dt: 1e-3,
            n_threads: 1,
            scheduling: Scheduling::MortonChunks,
            chunk_size: scheduler::DEFAULT_CHUNK_SIZE,
            arena_factor: 10,
        }
    }
}

/// A running N-body simulation.
///
/// # Examples
///
/// ```
/// use galaxy_sim::simulation::{SimConfig, Simulation};
/// use galaxy_sim::samples;
///
/// let particles = samples::uniform_disk(100, 1.0, 42);
/// let mut sim = Simulation::new(particles, SimConfig::default()).unwrap();
/// sim.step().unwrap();
/// let (fx, fy) = sim.forces();
/// assert_eq!(fx.len(), 100);
/// assert!(fx.iter().chain(fy).all(|f| f.is_finite()));
/// ```
pub struct Simulation {
    particles: ParticleSet,
    fx: Vec<f64>,
    fy: Vec<f64>,
    acc_x: Vec<f64>,
    acc_y: Vec<f64>,
    inv_mass: Vec<f64>,
    arena: NodeArena,
    pool: ThreadPool,
    clusters: Option<KMeansClusters>,
    config: SimConfig,
    g: f64,
    region: Bounds,
    accel_ready: bool,
    warned_out_of_region: bool,
    steps_completed: u64,
}

impl Simulation {
    /// Builds an engine instance around `particles`.
    ///
    /// The gravitational constant is fixed at `100 / N`; the input datasets
    /// are normalised against exactly this scaling.
    pub fn new(particles: ParticleSet, config: SimConfig) -> Result<Self, SimError> {
        if !(config.theta.is_finite() && config.theta >= 0.0) {
            return Err(SimError::ArgumentInvalid(format!(
                "theta must be finite and non-negative (got {})",
                config.theta
            )));
        }
        if !(config.dt.is_finite() && config.dt > 0.0) {
            return Err(SimError::ArgumentInvalid(format!(
                "time step must be positive (got {})",
                config.dt
            )));
        }
        if config.chunk_size == 0 {
            return Err(SimError::ArgumentInvalid(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if config.arena_factor < 4 {
            return Err(SimError::ArgumentInvalid(format!(
                "arena factor must be at least 4 (got {})",
                config.arena_factor
            )));
        }

        let n = particles.len();
        let pool = scheduler::build_pool(config.n_threads)?;
        let region = Bounds::enclosing(&particles.pos_x, &particles.pos_y);
        let clusters = match config.scheduling {
            Scheduling::MortonChunks => None,
            Scheduling::KMeans { k } => Some(KMeansClusters::compute(
                &particles.pos_x,
                &particles.pos_y,
                k,
                &pool,
            )?),
        };
        let inv_mass = particles.mass.iter().map(|&m| 1.0 / m).collect();

        Ok(Simulation {
            fx: vec![0.0; n],
            fy: vec![0.0; n],
            acc_x: vec![0.0; n],
            acc_y: vec![0.0; n],
            inv_mass,
            arena: NodeArena::with_capacity(config.arena_factor * n),
            pool,
            clusters,
            config,
            g: 100.0 / n as f64,
            region,
            accel_ready: false,
            warned_out_of_region: false,
            steps_completed: 0,
            particles,
        })
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut ParticleSet {
        &mut self.particles
    }

    /// The force buffer from the most recent kernel call.
    pub fn forces(&self) -> (&[f64], &[f64]) {
        (&self.fx, &self.fy)
    }

    /// The gravitational constant in effect (`100 / N`).
    pub fn gravitational_constant(&self) -> f64 {
        self.g
    }

    /// The region declared by the most recent kernel call.
    pub fn region(&self) -> Bounds {
        self.region
    }

    pub fn steps_completed(&self) -> u64 {
        self.steps_completed
    }

    fn check_finite(&self) -> Result<(), SimError> {
        let p = &self.particles;
        for i in 0..p.len() {
            if !(p.pos_x[i].is_finite() && p.pos_y[i].is_finite() && p.mass[i].is_finite()) {
                return Err(SimError::NonFinite { index: i });
            }
        }
        Ok(())
    }

    /// The per-step force kernel.
    ///
    /// Recomputes the margined region, resets and repopulates the arena,
    /// builds the tree sequentially, then evaluates the force on every
    /// particle in parallel. `fx`/`fy` are fully overwritten; no other state
    /// visible to the caller changes. The result is bit-identical across
    /// runs and worker counts for identical input.
    pub fn compute_forces(&mut self) -> Result<(), SimError> {
        self.check_finite()?;

        self.region = Bounds::enclosing(&self.particles.pos_x, &self.particles.pos_y);
        self.arena.reset();
        let root = quadtree::build_tree(
            &mut self.arena,
            &self.particles.pos_x,
            &self.particles.pos_y,
            &self.particles.mass,
            self.region,
        )?;
        debug!(
            "tree built: {} nodes over {} particles",
            self.arena.used(),
            self.particles.len()
        );

        let arena = &self.arena;
        let pos_x = &self.particles.pos_x;
        let pos_y = &self.particles.pos_y;
        let mass = &self.particles.mass;
        let g = self.g;
        let theta = self.config.theta;

        match (&self.config.scheduling, &self.clusters) {
            (Scheduling::KMeans { .. }, Some(clusters)) => {
                kmeans::clustered_force_pass(
                    clusters,
                    &self.pool,
                    arena,
                    root,
                    pos_x,
                    pos_y,
                    mass,
                    g,
                    theta,
                    &mut self.fx,
                    &mut self.fy,
                );
            }
            _ => {
                scheduler::dynamic_chunk_map(
                    &self.pool,
                    self.config.chunk_size,
                    &mut self.fx,
                    &mut self.fy,
                    |base, cx, cy| {
                        for (offset, (ox, oy)) in cx.iter_mut().zip(cy.iter_mut()).enumerate() {
                            let i = base + offset;
                            let (gx, gy) = force::force_on_particle(
                                arena, root, pos_x[i], pos_y[i], mass[i], i as i32, g, theta,
                            );
                            *ox = gx;
                            *oy = gy;
                        }
                    },
                );
            }
        }
        Ok(())
    }

    fn store_accelerations(&mut self) {
        for i in 0..self.particles.len() {
            self.acc_x[i] = self.fx[i] * self.inv_mass[i];
            self.acc_y[i] = self.fy[i] * self.inv_mass[i];
        }
    }

    /// Advances the system by one kick-drift-kick velocity-Verlet step:
    ///
    /// 1. `v += (dt/2) * a_prev`
    /// 2. `x += dt * v`
    /// 3. `a_new = F(x) / m` (the force kernel)
    /// 4. `v += (dt/2) * a_new`
    ///
    /// `a_prev` is cached across steps; the first call seeds it with one
    /// extra kernel evaluation.
    pub fn step(&mut self) -> Result<(), SimError> {
        if !self.accel_ready {
            self.compute_forces()?;
            self.store_accelerations();
            self.accel_ready = true;
        }

        let dt = self.config.dt;
        let half = 0.5 * dt;
        let n = self.particles.len();
        let declared = self.region;

        for i in 0..n {
            self.particles.vel_x[i] += half * self.acc_x[i];
            self.particles.vel_y[i] += half * self.acc_y[i];
            self.particles.pos_x[i] += dt * self.particles.vel_x[i];
            self.particles.pos_y[i] += dt * self.particles.vel_y[i];
        }

        // The region is recomputed before every build, so escaping the box
        // declared by the previous step is survivable; say so once.
        if !self.warned_out_of_region {
            for i in 0..n {
                let (x, y) = (self.particles.pos_x[i], self.particles.pos_y[i]);
                if !declared.contains(x, y) {
                    warn!(
                        "particle {} drifted out of the declared region to ({}, {}); \
                         the region is re-derived each step",
                        i, x, y
                    );
                    self.warned_out_of_region = true;
                    break;
                }
            }
        }

        self.compute_forces()?;
        self.store_accelerations();
        for i in 0..n {
            self.particles.vel_x[i] += half * self.acc_x[i];
            self.particles.vel_y[i] += half * self.acc_y[i];
        }

        self.steps_completed += 1;
        if let Scheduling::KMeans { k } = self.config.scheduling {
            if self.steps_completed % RECLUSTER_INTERVAL == 0 {
                self.clusters = Some(KMeansClusters::compute(
                    &self.particles.pos_x,
                    &self.particles.pos_y,
                    k,
                    &self.pool,
                )?);
            }
        }
        Ok(())
    }

    /// Reorders particles into Morton (Z) order.
    ///
    /// Permutes every per-particle array that outlives a step, including the
    /// cached accelerations and inverse masses. The driver decides when to
    /// call this; the engine never reorders on its own. Any k-means
    /// partition is re-derived because reordering invalidates its index
    /// lists.
    pub fn resort(&mut self) -> Result<(), SimError> {
        let perm = morton::zorder_permutation(
            &self.particles.pos_x,
            &self.particles.pos_y,
            self.region,
        );
        self.particles.permute(&perm);
        morton::apply_permutation(
            &perm,
            &mut [
                &mut self.acc_x,
                &mut self.acc_y,
                &mut self.inv_mass,
            ],
        );
        if let Scheduling::KMeans { k } = self.config.scheduling {
            self.clusters = Some(KMeansClusters::compute(
                &self.particles.pos_x,
                &self.particles.pos_y,
                k,
                &self.pool,
            )?);
        }
        Ok(())
    }

    /// Total kinetic energy; diagnostic, not used by the kernel.
    pub fn kinetic_energy(&self) -> f64 {
        let p = &self.particles;
        (0..p.len())
            .map(|i| 0.5 * p.mass[i] * (p.vel_x[i] * p.vel_x[i] + p.vel_y[i] * p.vel_y[i]))
            .sum()
    }

    /// Total softened potential energy by direct pairwise summation. O(N^2);
    /// diagnostic, consistent with the force kernel's softening so that
    /// kinetic plus potential is the conserved quantity.
    pub fn potential_energy(&self) -> f64 {
        let p = &self.particles;
        let eps_sq = force::SOFTENING * force::SOFTENING;
        let mut energy = 0.0;
        for i in 0..p.len() {
            for j in (i + 1)..p.len() {
                let dx = p.pos_x[j] - p.pos_x[i];
                let dy = p.pos_y[j] - p.pos_y[i];
                let r = (dx * dx + dy * dy + eps_sq).sqrt();
                energy -= self.g * p.mass[i] * p.mass[j] / r;
            }
        }
        energy
    }
}
