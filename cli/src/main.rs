use clap::Parser;
use racesim::core::handle_race::handle_race;
use racesim::interfaces::state_interface::RaceState;
use racesim::post::race_result::RaceResult;
use racesim::pre::read_sim_pars::read_sim_pars;
use racesim::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::path::Path;
use std::thread;
use std::time::Instant;

fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

/// print_race_state prints one line per streamed race state.
fn print_race_state(race_state: &RaceState) {
    if race_state.final_result.is_some() {
        return;
    }
    let order: Vec<String> = race_state
        .contestants
        .iter()
        .enumerate()
        .map(|(i, c)| format!("P{} {} L{} {:5.1}m/s", i + 1, c.id, c.lap + 1, c.speed))
        .collect();
    let flag = if !race_state.started {
        "countdown"
    } else if race_state.finished {
        "finished"
    } else {
        "racing"
    };
    println!("{:8.2}s [{}] {}", race_state.cur_racetime, flag, order.join(" | "));
}

/// write_outputs writes result, lap times and track records of one run into `out_dir`.
fn write_outputs(result: &RaceResult, out_dir: &Path, run: usize) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)?;
    result.write_result_to_file(&out_dir.join(format!("result_{}.json", run)))?;
    result.write_lap_times_to_file(&out_dir.join(format!("laptimes_{}.txt", run)))?;
    result.write_track_records_to_file(&out_dir.join(format!("track_records_{}.csv", run)))?;
    log::info!("Wrote output files of run {} to {}", run, out_dir.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    init_logging(sim_opts.debug);

    if !(0.001..=0.1).contains(&sim_opts.timestep_size) {
        anyhow::bail!(
            "Time step size {}s is outside the valid range [0.001, 0.1]!",
            sim_opts.timestep_size
        );
    }
    if sim_opts.realtime_factor <= 0.0 {
        anyhow::bail!("Real-time factor must be positive!");
    }

    // get simulation parameters
    log::info!("Reading simulation parameters from {}", sim_opts.parfile_path.display());
    let sim_pars = read_sim_pars(&sim_opts.parfile_path)?;

    // EXECUTION -----------------------------------------------------------------------------------
    let results: Vec<RaceResult> = if !sim_opts.stream {
        let t_start = Instant::now();
        let base_seed = sim_opts.seed.or(sim_pars.session_pars.seed);

        // sessions are independent, every run builds its own
        let results = (0..sim_opts.no_sim_runs as u64)
            .into_par_iter()
            .map(|run| {
                handle_race(
                    &sim_pars,
                    sim_opts.timestep_size,
                    sim_opts.max_race_time,
                    base_seed.map(|seed| seed.wrapping_add(run)),
                    None,
                    1.0,
                )
            })
            .collect::<anyhow::Result<Vec<RaceResult>>>()?;

        log::info!(
            "Execution time for {} run(s): {}ms",
            sim_opts.no_sim_runs,
            t_start.elapsed().as_millis()
        );
        results
    } else {
        let (tx, rx) = flume::unbounded();
        let sim_opts_thread = sim_opts.clone();
        let sim_pars_thread = sim_pars.clone();

        // the simulation runs in its own thread, states are printed while they arrive
        let sim_thread = thread::spawn(move || {
            handle_race(
                &sim_pars_thread,
                sim_opts_thread.timestep_size,
                sim_opts_thread.max_race_time,
                sim_opts_thread.seed,
                Some(&tx),
                sim_opts_thread.realtime_factor,
            )
        });

        for race_state in rx.iter() {
            print_race_state(&race_state);
        }

        let result = sim_thread
            .join()
            .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))??;
        vec![result]
    };

    // POST-PROCESSING -----------------------------------------------------------------------------
    for (run, result) in results.iter().enumerate() {
        if results.len() > 1 {
            println!("INFO: Run {}", run + 1);
        }
        result.print_result();

        if let Some(out_dir) = &sim_opts.output_dir {
            write_outputs(result, out_dir, run + 1)?;
        }
    }

    Ok(())
}
