use std::error::Error;
use std::fmt;
use std::io;

/// Errors surfaced by the simulation engine.
#[derive(Debug)]
pub enum SimError {
    /// A driver-supplied argument was rejected (non-positive particle count,
    /// time step, thread count, malformed option, ...).
    ArgumentInvalid(String),
    /// The tree build overran the pre-allocated node arena. Carries the
    /// capacity that proved insufficient so the driver can report how many
    /// slots were available when the build faulted.
    ArenaExhausted {
        /// Number of node slots the arena was created with.
        capacity: usize,
    },
    /// A particle left the declared simulation region during integration.
    ParticleOutOfRegion {
        /// Index of the escaping particle.
        index: usize,
        /// Position at the time of detection.
        x: f64,
        y: f64,
    },
    /// A NaN or infinity appeared in positions or masses at the start of a step.
    NonFinite {
        /// Index of the first offending particle.
        index: usize,
    },
    /// Reading or writing a particle file failed.
    Io(io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::ArgumentInvalid(msg) => write!(f, "invalid argument: {}", msg),
            SimError::ArenaExhausted { capacity } => write!(
                f,
                "node arena exhausted: tree build needs more than {} slots",
                capacity
            ),
            SimError::ParticleOutOfRegion { index, x, y } => write!(
                f,
                "particle {} left the simulation region at ({}, {})",
                index, x, y
            ),
            SimError::NonFinite { index } => {
                write!(f, "non-finite position or mass for particle {}", index)
            }
            SimError::Io(err) => write!(f, "particle file I/O failed: {}", err),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SimError {
    fn from(err: io::Error) -> Self {
        SimError::Io(err)
    }
}
