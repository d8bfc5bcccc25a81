//! Benchmark for column density scans.
//!
//! Scans a square of (2*R+1)^2 columns and decides solid/air for every block in
//! the height range three ways: full evaluation, early-exit sign queries, and
//! incremental sign queries that reuse cached octave values between heights.
//!
//! Usage:
//!   cargo run --release --example bench_columns -p strata_noise -- [OPTIONS]
//!
//! Options:
//!   --seed SEED       Noise seed (default: 0)
//!   --radius N        Columns scanned in each direction from 0:0 (default: 32)
//!   --octaves N       Octave count (default: 8)
//!   --height N        Blocks per column (default: 256)

use std::time::{Duration, Instant};
use strata_noise::{ColumnNoise, FractalNoise, IncrementalColumnNoise, NoiseCurve};

const BASE_FREQUENCY: f64 = 1.0 / 400.0;
const PERSISTENCE: f64 = 0.5;
const RELATIVE_Y_FREQUENCY: f64 = 0.6;
const SEA_LEVEL: f64 = 110.0;

fn fmt_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs >= 1.0 {
        format!("{:.3}s", secs)
    } else if secs >= 0.001 {
        format!("{:.3}ms", secs * 1000.0)
    } else {
        format!("{:.1}us", secs * 1_000_000.0)
    }
}

/// Raw-space bias for height `y`: solid where the curved density exceeds a level that
/// rises with height.
fn biases(curve: NoiseCurve, height: usize) -> Vec<f64> {
    (0..height)
        .map(|y| {
            let level = 0.5 + (y as f64 - SEA_LEVEL) / (height as f64 * 1.5);
            -curve.inverse(level)
        })
        .collect()
}

struct Totals {
    solid: u64,
    elapsed: Duration,
}

fn scan_full(columns: &[ColumnNoise], biases: &[f64]) -> Totals {
    let start = Instant::now();
    let mut solid = 0;
    for column in columns {
        for (y, bias) in biases.iter().enumerate() {
            if column.noise(y as f64) + bias > 0.0 {
                solid += 1;
            }
        }
    }
    Totals {
        solid,
        elapsed: start.elapsed(),
    }
}

fn scan_sign(columns: &[ColumnNoise], biases: &[f64]) -> Totals {
    let start = Instant::now();
    let mut solid = 0;
    for column in columns {
        for (y, bias) in biases.iter().enumerate() {
            if column.noise_sign(y as f64, *bias) > 0.0 {
                solid += 1;
            }
        }
    }
    Totals {
        solid,
        elapsed: start.elapsed(),
    }
}

fn scan_incremental(columns: &mut [IncrementalColumnNoise], biases: &[f64]) -> (Totals, u64) {
    let start = Instant::now();
    let mut solid = 0;
    for column in columns.iter_mut() {
        for (y, bias) in biases.iter().enumerate().rev() {
            if column.noise_sign(y as f64, *bias) > 0.0 {
                solid += 1;
            }
        }
    }
    let elapsed = start.elapsed();
    let evaluated = columns.iter().map(|c| c.octaves_evaluated()).sum();
    (Totals { solid, elapsed }, evaluated)
}

fn main() {
    let mut seed: i64 = 0;
    let mut radius: i32 = 32;
    let mut octaves: usize = 8;
    let mut height: usize = 256;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                seed = args[i].parse().expect("Invalid seed");
            }
            "--radius" => {
                i += 1;
                radius = args[i].parse().expect("Invalid radius");
            }
            "--octaves" => {
                i += 1;
                octaves = args[i].parse().expect("Invalid octave count");
                if octaves == 0 {
                    panic!("Octave count must be >= 1");
                }
            }
            "--height" => {
                i += 1;
                height = args[i].parse().expect("Invalid height");
            }
            "--help" | "-h" => {
                eprintln!("Usage: bench_columns [--seed SEED] [--radius N] [--octaves N] [--height N]");
                eprintln!();
                eprintln!("Defaults: seed=0, radius=32, octaves=8, height=256");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let noise = FractalNoise::from_default_octaves(octaves, BASE_FREQUENCY, PERSISTENCE, seed);
    let amplitudes = vec![1.0; octaves];
    let thresholds: Vec<f64> = (0..octaves).map(|i| 0.02 * i as f64).collect();
    let biases = biases(noise.curve(), height);

    let t_build = Instant::now();
    let mut columns = Vec::new();
    for x in -radius..=radius {
        for z in -radius..=radius {
            columns.push(noise.for_column(
                RELATIVE_Y_FREQUENCY,
                &amplitudes,
                &thresholds,
                x as f64 * 4.0,
                z as f64 * 4.0,
            ));
        }
    }
    let mut incremental: Vec<IncrementalColumnNoise> = columns
        .iter()
        .cloned()
        .map(ColumnNoise::into_incremental)
        .collect();
    eprintln!(
        "Built {} columns x {} octaves in {}",
        columns.len(),
        octaves,
        fmt_duration(t_build.elapsed()),
    );

    let blocks = (columns.len() * height) as u64;
    let full = scan_full(&columns, &biases);
    let sign = scan_sign(&columns, &biases);
    let (incremental_totals, evaluated) = scan_incremental(&mut incremental, &biases);

    if full.solid != sign.solid || full.solid != incremental_totals.solid {
        eprintln!(
            "A/B CHECK FAILED: full={} sign={} incremental={}",
            full.solid, sign.solid, incremental_totals.solid,
        );
    } else {
        eprintln!("A/B check: {}/{} solid in all modes", full.solid, blocks);
    }

    let full_octaves = blocks * columns.first().map_or(0, |c| c.octave_count()) as u64;
    eprintln!("\n{:<12} {:>12} {:>14}", "mode", "time", "ns/block");
    for (name, totals) in [
        ("full", &full),
        ("sign", &sign),
        ("incremental", &incremental_totals),
    ] {
        eprintln!(
            "{:<12} {:>12} {:>14.1}",
            name,
            fmt_duration(totals.elapsed),
            totals.elapsed.as_nanos() as f64 / blocks as f64,
        );
    }
    eprintln!(
        "\nIncremental octave evaluations: {} of {} ({:.1}%)",
        evaluated,
        full_octaves,
        evaluated as f64 * 100.0 / full_octaves.max(1) as f64,
    );
}
