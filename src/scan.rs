use anyhow::Context;
use bevy_app::{App, Plugin, Startup};
use bevy_ecs::prelude::Resource;
use bevy_ecs::schedule::IntoScheduleConfigs;
use bevy_ecs::system::{Res, ResMut};
use bevy_tasks::{TaskPool, TaskPoolBuilder};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use strata_noise::{FractalNoise, FractalNoiseConfig, NoiseCurve};
use tracing::info;

const DEFAULT_SETTINGS: &str = include_str!("../assets/scan/overworld.json");
const MAX_HEIGHT: u32 = 1 << 16;
const MAX_THREADS: usize = 1024;

static SCAN_TASK_POOL: OnceLock<TaskPool> = OnceLock::new();

fn scan_task_pool(threads: usize) -> &'static TaskPool {
    SCAN_TASK_POOL.get_or_init(|| {
        TaskPoolBuilder::new()
            .thread_name("ColumnScan".to_string())
            .num_threads(threads)
            .build()
    })
}

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanSettings {
    pub noise: FractalNoiseConfig,
    #[serde(default = "default_relative_y_frequency")]
    pub relative_y_frequency: f64,
    pub amplitudes: Vec<f64>,
    pub thresholds: Vec<f64>,
    pub area: ScanArea,
    pub min_y: i32,
    pub height: u32,
    /// Height where a curved density above 0.5 is solid.
    pub surface_y: f64,
    /// Blocks over which the solid level moves by 1.
    pub falloff: f64,
    #[serde(default)]
    pub mode: ScanMode,
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_relative_y_frequency() -> f64 {
    1.0
}

fn default_threads() -> usize {
    4
}

fn default_spacing() -> u32 {
    1
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanArea {
    pub min_x: i32,
    pub min_z: i32,
    pub size_x: u32,
    pub size_z: u32,
    #[serde(default = "default_spacing")]
    pub spacing: u32,
}

impl ScanArea {
    fn position(&self, column: u32, row: u32) -> (f64, f64) {
        let spacing = i64::from(self.spacing);
        (
            (i64::from(self.min_x) + i64::from(column) * spacing) as f64,
            (i64::from(self.min_z) + i64::from(row) * spacing) as f64,
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Every octave of every block.
    Full,
    /// Early-exit sign queries.
    Sign,
    /// Sign queries reusing octave values from the block above.
    #[default]
    Incremental,
}

impl ScanSettings {
    /// Curved density a block at `y` must exceed to be solid.
    pub fn level(&self, y: i32) -> f64 {
        0.5 + (f64::from(y) - self.surface_y) / self.falloff
    }

    /// Raw-space bias per block, bottom to top. Adding it to the uncurved density moves
    /// the solid level to zero.
    pub fn biases(&self, curve: NoiseCurve) -> Vec<f64> {
        (0..self.height as i32)
            .map(|i| -curve.inverse(self.level(self.min_y + i)))
            .collect()
    }
}

#[derive(Resource, Clone)]
pub struct TerrainNoise(pub Arc<FractalNoise>);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub columns: u64,
    pub blocks: u64,
    pub solid: u64,
    /// Blocks decided by the column bounds alone.
    pub decided_by_bounds: u64,
    /// Evaluator calls in full and incremental mode.
    pub octaves_evaluated: u64,
    pub surface_columns: u64,
    pub surface_sum: i64,
}

impl ScanStats {
    pub fn mean_surface(&self) -> Option<f64> {
        (self.surface_columns > 0).then(|| self.surface_sum as f64 / self.surface_columns as f64)
    }
}

impl AddAssign for ScanStats {
    fn add_assign(&mut self, other: Self) {
        self.columns += other.columns;
        self.blocks += other.blocks;
        self.solid += other.solid;
        self.decided_by_bounds += other.decided_by_bounds;
        self.octaves_evaluated += other.octaves_evaluated;
        self.surface_columns += other.surface_columns;
        self.surface_sum += other.surface_sum;
    }
}

#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct ScanReport {
    pub stats: ScanStats,
    pub elapsed: Duration,
}

pub struct ScanPlugin {
    settings: ScanSettings,
    noise: Arc<FractalNoise>,
}

impl ScanPlugin {
    /// Reads settings from `path`, or the built-in overworld settings.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let settings: ScanSettings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading scan settings {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing scan settings {}", path.display()))?
            }
            None => serde_json::from_str(DEFAULT_SETTINGS)
                .context("parsing built-in scan settings")?,
        };
        Self::new(settings)
    }

    pub fn new(settings: ScanSettings) -> anyhow::Result<Self> {
        anyhow::ensure!(settings.height > 0, "height must be positive");
        anyhow::ensure!(
            settings.height <= MAX_HEIGHT,
            "height must be at most {MAX_HEIGHT}, got {}",
            settings.height
        );
        anyhow::ensure!(
            settings.min_y.checked_add(settings.height as i32).is_some(),
            "min_y {} plus height {} overflows",
            settings.min_y,
            settings.height
        );
        anyhow::ensure!(settings.threads > 0, "threads must be positive");
        anyhow::ensure!(
            settings.threads <= MAX_THREADS,
            "threads must be at most {MAX_THREADS}, got {}",
            settings.threads
        );
        anyhow::ensure!(settings.area.spacing > 0, "area spacing must be positive");
        anyhow::ensure!(
            settings.falloff.is_finite() && settings.falloff > 0.0,
            "falloff must be positive, got {}",
            settings.falloff
        );
        let noise = settings.noise.build().context("building terrain noise")?;
        noise
            .try_for_column(
                settings.relative_y_frequency,
                &settings.amplitudes,
                &settings.thresholds,
                0.0,
                0.0,
            )
            .context("validating column amplitudes and thresholds")?;
        Ok(Self {
            settings,
            noise: Arc::new(noise),
        })
    }
}

impl Plugin for ScanPlugin {
    fn build(&self, app: &mut App) {
        scan_task_pool(self.settings.threads);
        app.insert_resource(self.settings.clone())
            .insert_resource(TerrainNoise(self.noise.clone()))
            .init_resource::<ScanReport>()
            .add_systems(Startup, (scan_area, log_report).chain());
    }
}

fn scan_area(
    noise: Res<TerrainNoise>,
    settings: Res<ScanSettings>,
    mut report: ResMut<ScanReport>,
) {
    let _span = tracing::info_span!("ColumnScan").entered();
    let start = Instant::now();
    let noise: &FractalNoise = &noise.0;
    let settings: &ScanSettings = &settings;
    let biases = settings.biases(noise.curve());
    let rows = settings.area.size_z;
    let rows_per_task = rows.div_ceil(settings.threads as u32).max(1);

    let results = scan_task_pool(settings.threads).scope(|scope| {
        for first in (0..rows).step_by(rows_per_task as usize) {
            let last = (first + rows_per_task).min(rows);
            let biases = biases.as_slice();
            scope.spawn(async move {
                let _span = tracing::info_span!("ColumnScan::rows", first, last).entered();
                let mut stats = ScanStats::default();
                for row in first..last {
                    for column in 0..settings.area.size_x {
                        let (x, z) = settings.area.position(column, row);
                        stats += scan_column(noise, settings, biases, x, z);
                    }
                }
                stats
            });
        }
    });

    let mut stats = ScanStats::default();
    for result in results {
        stats += result;
    }
    *report = ScanReport {
        stats,
        elapsed: start.elapsed(),
    };
}

/// Walks one column from the top down and classifies every block.
fn scan_column(
    noise: &FractalNoise,
    settings: &ScanSettings,
    biases: &[f64],
    x: f64,
    z: f64,
) -> ScanStats {
    let column = noise.for_column(
        settings.relative_y_frequency,
        &settings.amplitudes,
        &settings.thresholds,
        x,
        z,
    );
    let mut incremental = match settings.mode {
        ScanMode::Incremental => Some(column.clone().into_incremental()),
        ScanMode::Full | ScanMode::Sign => None,
    };

    let mut stats = ScanStats {
        columns: 1,
        ..Default::default()
    };
    let mut surface = None;
    for (i, bias) in biases.iter().enumerate().rev() {
        let y = settings.min_y + i as i32;
        let level = settings.level(y);
        stats.blocks += 1;

        let solid = if level < column.bound_min() {
            stats.decided_by_bounds += 1;
            true
        } else if level >= column.bound_max() {
            stats.decided_by_bounds += 1;
            false
        } else {
            match (settings.mode, incremental.as_mut()) {
                (ScanMode::Incremental, Some(incremental)) => {
                    incremental.noise_sign(f64::from(y), *bias) > 0.0
                }
                (ScanMode::Full, _) => {
                    stats.octaves_evaluated += column.octave_count() as u64;
                    column.noise(f64::from(y)) + bias > 0.0
                }
                _ => column.noise_sign(f64::from(y), *bias) > 0.0,
            }
        };

        if solid {
            stats.solid += 1;
            surface.get_or_insert(y);
        }
    }

    if let Some(incremental) = incremental {
        stats.octaves_evaluated += incremental.octaves_evaluated();
    }
    if let Some(surface) = surface {
        stats.surface_columns = 1;
        stats.surface_sum = i64::from(surface);
    }
    stats
}

fn log_report(settings: Res<ScanSettings>, report: Res<ScanReport>) {
    let stats = report.stats;
    info!(
        mode = ?settings.mode,
        columns = stats.columns,
        blocks = stats.blocks,
        solid = stats.solid,
        decided_by_bounds = stats.decided_by_bounds,
        octaves_evaluated = stats.octaves_evaluated,
        elapsed = ?report.elapsed,
        "Column scan finished"
    );
    if let Some(surface) = stats.mean_surface() {
        info!("Mean surface height {:.1}", surface);
    }
}
