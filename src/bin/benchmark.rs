//! Headless throughput probe: runs the simulation against a synthetic 60 Hz clock
//! with a cursor sweeping the viewport, then reports per-tick timings.

use std::env;
use std::time::Instant;

use bevy::app::App;
use bevy::log::{Level, LogPlugin};
use bevy::prelude::default;
use ion_field::{Config, Simulation, Viewport};
use tracing::info;

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug)]
struct RuntimeReport {
    ticks: usize,
    peak_live: usize,
    mean_connections: f64,
    spawned_total: u64,
    trimmed_total: u64,
    simulated_time: f64,
    wall_time_micros: u128,
    avg_tick_micros: f64,
    early_avg_micros: f64,
    late_avg_micros: f64,
}

fn parse_arg(args: &[String], flag: &str, default: f32) -> f32 {
    args.iter()
        .position(|v| v == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse::<f32>().ok())
        .unwrap_or(default)
}

fn average(slice: &[u128]) -> f64 {
    if slice.is_empty() {
        0.0
    } else {
        slice.iter().copied().sum::<u128>() as f64 / slice.len() as f64
    }
}

#[cfg(feature = "serde")]
fn print_json(report: &RuntimeReport) -> bool {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to serialize report: {err}"),
    }
    true
}

#[cfg(not(feature = "serde"))]
fn print_json(_report: &RuntimeReport) -> bool {
    eprintln!("--json needs the `serde` feature; falling back to text");
    false
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let ticks = parse_arg(&args, "--ticks", 2000.0).max(1.0) as usize;
    let fps = parse_arg(&args, "--fps", 60.0).max(1.0) as f64;
    let width = parse_arg(&args, "--width", 1920.0);
    let height = parse_arg(&args, "--height", 1080.0);
    let seed = parse_arg(&args, "--seed", 7.0) as u64;

    // Headless: the log plugin alone installs the tracing subscriber.
    // `--verbose` lowers the level to debug; RUST_LOG still overrides the filter.
    let verbose = args.iter().any(|a| a == "--verbose");
    let mut logging = App::new();
    logging.add_plugins(LogPlugin {
        level: if verbose { Level::DEBUG } else { Level::INFO },
        ..default()
    });

    // Dense enough to sit at the population ceiling, spawning every frame until it does
    let config = Config {
        particle_density: 0.001,
        spawn_interval: 1,
        ..Config::default()
    };
    let mut sim = Simulation::seeded(config, Viewport::new(width, height), seed);
    sim.start();
    info!(ticks, fps, width, height, seed, cap = sim.max_population(), "benchmark starting");

    let frame_ms = 1000.0 / fps;
    let mut durations = Vec::with_capacity(ticks);
    let mut peak_live = 0;
    let mut connection_total = 0usize;

    let wall_start = Instant::now();
    for i in 0..ticks {
        let sweep = i as f32 / ticks as f32;
        sim.on_pointer_move(sweep * width, height * 0.5);

        let tick_start = Instant::now();
        let report = sim.tick(i as f64 * frame_ms);
        durations.push(tick_start.elapsed().as_micros());

        if let Some(report) = report {
            peak_live = peak_live.max(report.live);
            connection_total += report.connections;
        }
    }
    let wall_time_micros = wall_start.elapsed().as_micros();

    let window = (ticks / 10).max(1);
    let report = RuntimeReport {
        ticks,
        peak_live,
        mean_connections: connection_total as f64 / ticks as f64,
        spawned_total: sim.population().spawned_total(),
        trimmed_total: sim.population().trimmed_total(),
        simulated_time: sim.simulated_time(),
        wall_time_micros,
        avg_tick_micros: average(&durations),
        early_avg_micros: average(&durations[..window.min(durations.len())]),
        late_avg_micros: average(&durations[durations.len().saturating_sub(window)..]),
    };

    if args.iter().any(|a| a == "--json") && print_json(&report) {
        return;
    }

    println!(
        "{} ticks in {:.3}s: avg {:.1}us/tick (early {:.1}, late {:.1}), peak live {}, mean connections {:.1}",
        report.ticks,
        report.wall_time_micros as f64 / 1e6,
        report.avg_tick_micros,
        report.early_avg_micros,
        report.late_avg_micros,
        report.peak_live,
        report.mean_connections,
    );
    println!(
        "spawned {}, trimmed {}, simulated time {:.1} units",
        report.spawned_total, report.trimmed_total, report.simulated_time,
    );
}
