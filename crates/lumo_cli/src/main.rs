//! Lumo CLI
//!
//! Preview and validate motion files without a renderer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumo_animation::{MotionFile, MAX_FRAME_DT};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod simulate;

use simulate::{Simulation, SimulationOptions};

const DEFAULT_FPS: u32 = 60;

#[derive(Parser)]
#[command(name = "lumo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lumo motion tooling", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a motion file through a deterministic scheduler and print readings
    Simulate {
        /// Motion file (TOML)
        file: PathBuf,

        /// Frames per second (defaults to the file's `fps`, then 60)
        #[arg(long)]
        fps: Option<u32>,

        /// Stop after this many frames even if values are still moving
        #[arg(long, default_value = "600")]
        max_frames: u64,

        /// Print JSON lines instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a motion file
    Check {
        /// Motion file (TOML)
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            file,
            fps,
            max_frames,
            json,
        } => cmd_simulate(&file, fps, max_frames, json),

        Commands::Check { file } => cmd_check(&file),
    }
}

fn load(path: &Path) -> Result<MotionFile> {
    MotionFile::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn cmd_simulate(path: &Path, fps: Option<u32>, max_frames: u64, json: bool) -> Result<()> {
    let file = load(path)?;
    let values = file
        .resolve()
        .with_context(|| format!("Invalid motion file {}", path.display()))?;

    let fps = fps.or(file.fps).unwrap_or(DEFAULT_FPS);
    if fps == 0 {
        anyhow::bail!("--fps must be greater than zero");
    }

    if 1.0 / fps as f32 > MAX_FRAME_DT.as_secs_f32() {
        warn!(
            "{}fps frames are longer than {}ms; each frame will advance only {}ms",
            fps,
            MAX_FRAME_DT.as_millis(),
            MAX_FRAME_DT.as_millis()
        );
    }

    info!(
        "Simulating {} value(s) from {} at {}fps",
        values.len(),
        path.display(),
        fps
    );

    let options = SimulationOptions {
        fps,
        max_frames,
        json,
    };
    let mut out = std::io::stdout().lock();
    let summary = Simulation::new(values, options).run(&mut out)?;

    for (name, frame) in &summary.settled {
        info!("{} settled on frame {}", name, frame);
    }
    for name in &summary.running {
        info!("{} still running after {} frames", name, summary.frames);
    }

    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let file = load(path)?;
    let values = file
        .resolve()
        .with_context(|| format!("Invalid motion file {}", path.display()))?;

    info!(
        "{}: {} spring preset(s), {} timing preset(s), {} transition preset(s)",
        path.display(),
        file.presets.springs.len(),
        file.presets.timings.len(),
        file.presets.transitions.len()
    );

    for value in &values {
        let target = value.transition.final_target(value.initial);
        if value.transition.is_finite() {
            info!("  {}: {:?} -> {:?}", value.name, value.initial, target);
        } else {
            info!("  {}: {:?} -> {:?} (repeats indefinitely)", value.name, value.initial, target);
        }
    }

    info!("Motion file is valid");
    Ok(())
}
