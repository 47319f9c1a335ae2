use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "RS-RACE",
    about = "A real-time racing game simulation engine written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging (overrides RUST_LOG)
    #[clap(short, long)]
    pub debug: bool,

    /// Stream race states in (scaled) real time and print them while the session runs
    #[clap(short, long)]
    pub stream: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs (only for non-streaming mode)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the scenario parameter file
    #[clap(short, long)]
    pub parfile_path: PathBuf,

    /// Set real-time factor (only relevant in streaming mode)
    #[clap(short, long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set simulation timestep size in seconds, should be in the range [0.001, 0.1]
    #[clap(short, long, default_value = "0.016")]
    pub timestep_size: f64,

    /// Abort a session after this many seconds of race time
    #[clap(short, long, default_value = "3600.0")]
    pub max_race_time: f64,

    /// Override the seed of the scenario file (run i uses seed + i)
    #[clap(long)]
    pub seed: Option<u64>,

    /// Write result, lap time and track record files into this directory
    #[clap(short, long)]
    pub output_dir: Option<PathBuf>,
}
