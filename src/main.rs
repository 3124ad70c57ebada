use anyhow::Result;
use clap::Parser;
use sandpulse_core::init_logging;
use sandpulse_lib::app::{self, Pipeline, RunMode, ShutdownManager};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Mode to run the simulation in
    #[arg(short, long, value_enum, default_value = "headless")]
    mode: RunMode,

    /// Custom config file path
    #[arg(short, long, default_value = "sandpulse.toml")]
    config: String,

    /// Seconds to run; real-time mode runs until Ctrl+C when omitted
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Overrides the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the configured topple jitter in [0, 1]
    #[arg(long)]
    randomness: Option<f64>,

    /// Print the final grid state as JSON to stdout
    #[arg(long)]
    dump_state: bool,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

const DEFAULT_HEADLESS_SECONDS: f64 = 10.0;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = app::load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.grid.seed = Some(seed);
    }
    if let Some(randomness) = args.randomness {
        config.grid.randomness = randomness;
    }

    let mut pipeline = Pipeline::from_config(&config)?;
    let step = 1.0 / config.runtime.simulation_hz;

    let summary = match args.mode {
        RunMode::Headless => {
            let seconds = args.seconds.unwrap_or(DEFAULT_HEADLESS_SECONDS);
            tracing::info!(seconds, "Running headless");
            app::run_headless(&mut pipeline, seconds, step)?
        }
        RunMode::Realtime => {
            let shutdown = ShutdownManager::new();
            shutdown.listen_for_ctrl_c();
            tracing::info!(seconds = ?args.seconds, "Running in real time, Ctrl+C to stop");
            app::run_realtime(
                &mut pipeline,
                args.seconds,
                Duration::from_secs_f64(step),
                &shutdown,
            )
            .await?
        }
    };

    tracing::info!(
        seed = pipeline.seed(),
        seconds = summary.simulated_seconds,
        frames = summary.frames,
        total_sand = summary.statistics.grid.total_sand,
        avalanches = summary.statistics.grid.total_avalanches,
        peak_hz = summary.last_peak.map(|p| p.frequency),
        wall_ms = summary.wall_time.as_millis() as u64,
        busiest_tick_us = summary.busiest_tick.as_micros() as u64,
        "Run finished"
    );

    if args.dump_state {
        let state = pipeline.simulation().export_state();
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    Ok(())
}
