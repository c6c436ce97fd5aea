//! The `galsim` driver.
//!
//! Thin glue around the engine: positional arguments, particle file in,
//! `result.gal` and `movie.gal` out. Exit code 0 on success, 1 on any
//! argument or runtime error.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use log::info;

use galaxy_sim::errors::SimError;
use galaxy_sim::io::{self, MovieWriter};
use galaxy_sim::simulation::{Scheduling, SimConfig, Simulation};

/// Steps between Morton resorts. The engine exposes the reorder operation
/// but leaves the cadence to the driver.
const RESORT_INTERVAL: u64 = 10;

const USAGE: &str = "usage: galsim N input_file nsteps dt n_threads theta k";

struct Args {
    n: usize,
    input: PathBuf,
    nsteps: u64,
    dt: f64,
    n_threads: usize,
    theta: f64,
    k: usize,
}

fn parse_args() -> Result<Args, SimError> {
    let argv: Vec<String> = env::args().collect();
    if argv.len() != 8 {
        return Err(SimError::ArgumentInvalid(USAGE.to_string()));
    }

    fn parse<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, SimError> {
        value
            .parse()
            .map_err(|_| SimError::ArgumentInvalid(format!("cannot parse {} from '{}'", name, value)))
    }

    let args = Args {
        n: parse(&argv[1], "N")?,
        input: PathBuf::from(&argv[2]),
        nsteps: parse(&argv[3], "nsteps")?,
        dt: parse(&argv[4], "dt")?,
        n_threads: parse(&argv[5], "n_threads")?,
        theta: parse(&argv[6], "theta")?,
        k: parse(&argv[7], "k")?,
    };

    if args.n == 0 {
        return Err(SimError::ArgumentInvalid("N must be positive".to_string()));
    }
    if args.dt <= 0.0 {
        return Err(SimError::ArgumentInvalid("dt must be positive".to_string()));
    }
    if args.n_threads == 0 {
        return Err(SimError::ArgumentInvalid(
            "n_threads must be at least 1".to_string(),
        ));
    }
    if !(args.theta.is_finite() && args.theta > 0.0) {
        return Err(SimError::ArgumentInvalid(
            "theta must be a positive number".to_string(),
        ));
    }
    Ok(args)
}

fn run(args: Args) -> Result<(), SimError> {
    let particles = io::read_particles(&args.input, args.n)?;
    let scheduling = if args.k <= 1 {
        Scheduling::MortonChunks
    } else {
        Scheduling::KMeans { k: args.k }
    };
    let config = SimConfig {
        theta: args.theta,
        dt: args.dt,
        n_threads: args.n_threads,
        scheduling,
        ..SimConfig::default()
    };

    let mut sim = Simulation::new(particles, config)?;
    sim.resort()?;

    let mut movie = MovieWriter::create(Path::new("movie.gal"))?;
    let start = Instant::now();
    for step in 0..args.nsteps {
        movie.write_frame(sim.particles())?;
        sim.step()?;
        if RESORT_INTERVAL != 0 && (step + 1) % RESORT_INTERVAL == 0 {
            sim.resort()?;
        }
    }
    let elapsed = start.elapsed().as_secs_f64();
    movie.finish()?;

    io::write_particles(Path::new("result.gal"), sim.particles())?;
    info!(
        "{} particles, {} steps, {} threads, theta {}",
        args.n, args.nsteps, args.n_threads, args.theta
    );
    println!("Simulation took {:.8} seconds.", elapsed);
    Ok(())
}

fn main() -> ExitCode {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .and_then(|logger| logger.start());

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("galsim: {}", err);
            return ExitCode::from(1);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("galsim: {}", err);
            ExitCode::from(1)
        }
    }
}
