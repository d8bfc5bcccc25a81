use crate::error::{NoiseConfigError, check_finite, check_length};
use crate::noise::curve::NoiseCurve;
use crate::noise::simplex_octave::{Orientation3D, noise2};
use crate::noise::threshold::{Hard, Smooth, ThresholdMode, Thresholding};
use bevy_math::{DVec2, DVec3};
use tracing::debug;

/// Applied on top of the scaled amplitudes so the sum of octave maxima lands near 2.
pub const VALUE_MULTIPLIER: f64 = 1.2;

const AMPLITUDE_DECAY_2D: f64 = 0.73;
const AMPLITUDE_DECAY_3D: f64 = 0.64;
const OCTAVE_SEED_MULTIPLIER: i64 = 65599;

/// Expands `$body` once per (orientation, threshold mode) pair, with `$sample` bound to the
/// matching 3D evaluator and `$shaping` to the matching [`Thresholding`] kernel.
macro_rules! dispatch_3d {
    ($orientation:expr, $mode:expr, |$sample:ident, $shaping:ident| $body:expr) => {{
        use $crate::noise::simplex_octave::{Orientation3D, noise3_fallback, noise3_improve_xz};
        use $crate::noise::threshold::{Hard, Smooth, ThresholdMode};
        match ($orientation, $mode) {
            (Orientation3D::ImproveXZ, ThresholdMode::Hard) => {
                let $sample = noise3_improve_xz;
                let $shaping = Hard;
                $body
            }
            (Orientation3D::ImproveXZ, ThresholdMode::Smooth { smoothing }) => {
                let $sample = noise3_improve_xz;
                let $shaping = Smooth { smoothing };
                $body
            }
            (Orientation3D::Fallback, ThresholdMode::Hard) => {
                let $sample = noise3_fallback;
                let $shaping = Hard;
                $body
            }
            (Orientation3D::Fallback, ThresholdMode::Smooth { smoothing }) => {
                let $sample = noise3_fallback;
                let $shaping = Smooth { smoothing };
                $body
            }
        }
    }};
}

pub(crate) use dispatch_3d;

/// Multi-octave sum of lattice noise.
///
/// Immutable once built; share it behind an `Arc` across workers. Cloning copies the
/// octave tables.
#[derive(Clone, Debug, PartialEq)]
pub struct FractalNoise {
    seed: i64,
    amplitudes: Vec<f64>,
    frequencies: Vec<f64>,
    octave_seeds: Vec<i64>,
    scaled_amplitudes_2d: Vec<f64>,
    scaled_amplitudes_3d: Vec<f64>,
    curve: NoiseCurve,
    orientation: Orientation3D,
    threshold_mode: ThresholdMode,
}

impl FractalNoise {
    /// Panics on an invalid configuration, see [`FractalNoise::try_new`].
    pub fn new(amplitudes: &[f64], frequencies: &[f64], seed: i64) -> Self {
        match Self::try_new(amplitudes, frequencies, seed) {
            Ok(noise) => noise,
            Err(err) => panic!("invalid fractal noise configuration: {err}"),
        }
    }

    pub fn try_new(
        amplitudes: &[f64],
        frequencies: &[f64],
        seed: i64,
    ) -> Result<Self, NoiseConfigError> {
        if amplitudes.is_empty() {
            return Err(NoiseConfigError::NoOctaves);
        }
        check_length("frequencies", frequencies, amplitudes.len())?;
        check_finite("amplitudes", amplitudes)?;
        check_finite("frequencies", frequencies)?;

        let scaled_amplitudes_2d = scale_amplitudes(amplitudes, AMPLITUDE_DECAY_2D)?;
        let scaled_amplitudes_3d = scale_amplitudes(amplitudes, AMPLITUDE_DECAY_3D)?;

        debug!(octaves = amplitudes.len(), seed, "built fractal noise");

        Ok(Self {
            seed,
            amplitudes: amplitudes.to_vec(),
            frequencies: frequencies.to_vec(),
            octave_seeds: octave_seeds(seed, amplitudes.len()),
            scaled_amplitudes_2d,
            scaled_amplitudes_3d,
            curve: NoiseCurve::default(),
            orientation: Orientation3D::default(),
            threshold_mode: ThresholdMode::default(),
        })
    }

    /// Octave `i` gets frequency `base_frequency · 2^i` and amplitude `persistence^i`.
    pub fn from_default_octaves(
        count: usize,
        base_frequency: f64,
        persistence: f64,
        seed: i64,
    ) -> Self {
        let (amplitudes, frequencies) = default_octaves(count, base_frequency, persistence);
        Self::new(&amplitudes, &frequencies, seed)
    }

    pub fn with_curve(mut self, curve: NoiseCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation3D) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_threshold_mode(mut self, threshold_mode: ThresholdMode) -> Self {
        self.threshold_mode = threshold_mode;
        self
    }

    /// Same octaves and strategies, seeds derived from `seed`.
    pub fn reseeded(&self, seed: i64) -> Self {
        Self {
            seed,
            octave_seeds: octave_seeds(seed, self.amplitudes.len()),
            ..self.clone()
        }
    }

    #[inline]
    pub fn seed(&self) -> i64 {
        self.seed
    }

    #[inline]
    pub fn octave_count(&self) -> usize {
        self.amplitudes.len()
    }

    #[inline]
    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    #[inline]
    pub fn octave_seeds(&self) -> &[i64] {
        &self.octave_seeds
    }

    #[inline]
    pub fn scaled_amplitudes_3d(&self) -> &[f64] {
        &self.scaled_amplitudes_3d
    }

    #[inline]
    pub fn curve(&self) -> NoiseCurve {
        self.curve
    }

    #[inline]
    pub fn orientation(&self) -> Orientation3D {
        self.orientation
    }

    #[inline]
    pub fn threshold_mode(&self) -> ThresholdMode {
        self.threshold_mode
    }

    pub fn noise2d(&self, x: f64, y: f64) -> f64 {
        let mut value = 0.0;
        for i in 0..self.amplitudes.len() {
            let frequency = self.frequencies[i];
            value += self.amplitudes[i]
                * f64::from(noise2(self.octave_seeds[i], x * frequency, y * frequency));
        }
        value
    }

    pub fn noise3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let orientation = self.orientation;
        let mut value = 0.0;
        for i in 0..self.amplitudes.len() {
            let frequency = self.frequencies[i];
            value += self.amplitudes[i]
                * f64::from(orientation.sample(
                    self.octave_seeds[i],
                    x * frequency,
                    y * frequency,
                    z * frequency,
                ));
        }
        value
    }

    #[inline]
    pub fn sample2(&self, pos: DVec2) -> f64 {
        self.noise2d(pos.x, pos.y)
    }

    #[inline]
    pub fn sample3(&self, pos: DVec3) -> f64 {
        self.noise3d(pos.x, pos.y, pos.z)
    }

    /// Raw 2D sum with every weighted octave value pulled towards zero by its threshold.
    ///
    /// Panics if `thresholds` does not have one entry per octave.
    pub fn noise2d_with_thresholds(&self, x: f64, y: f64, thresholds: &[f64]) -> f64 {
        self.assert_octave_slice("thresholds", thresholds);
        match self.threshold_mode {
            ThresholdMode::Hard => self.thresholded_2d(Hard, x, y, thresholds),
            ThresholdMode::Smooth { smoothing } => {
                self.thresholded_2d(Smooth { smoothing }, x, y, thresholds)
            }
        }
    }

    fn thresholded_2d<T: Thresholding>(&self, shaping: T, x: f64, y: f64, thresholds: &[f64]) -> f64 {
        let mut value = 0.0;
        for i in 0..self.amplitudes.len() {
            let amplitude = self.amplitudes[i];
            let frequency = self.frequencies[i];
            let octave =
                amplitude * f64::from(noise2(self.octave_seeds[i], x * frequency, y * frequency));
            value += shaping.shape(
                octave,
                thresholds[i],
                shaping.blend_width(amplitude, frequency),
            );
        }
        value
    }

    /// Raw 3D sum with every weighted octave value pulled towards zero by its threshold.
    ///
    /// Panics if `thresholds` does not have one entry per octave.
    pub fn noise3d_with_thresholds(&self, x: f64, y: f64, z: f64, thresholds: &[f64]) -> f64 {
        self.assert_octave_slice("thresholds", thresholds);
        dispatch_3d!(self.orientation, self.threshold_mode, |sample, shaping| {
            let mut value = 0.0;
            for i in 0..self.amplitudes.len() {
                let amplitude = self.amplitudes[i];
                let frequency = self.frequencies[i];
                let octave = amplitude
                    * f64::from(sample(
                        self.octave_seeds[i],
                        x * frequency,
                        y * frequency,
                        z * frequency,
                    ));
                value += shaping.shape(
                    octave,
                    thresholds[i],
                    shaping.blend_width(amplitude, frequency),
                );
            }
            value
        })
    }

    /// Curved sum of the scaled 2D amplitudes, in `[0, 1]`.
    pub fn normalized_noise2d(&self, x: f64, y: f64) -> f64 {
        let mut value = 0.0;
        for i in 0..self.amplitudes.len() {
            let frequency = self.frequencies[i];
            value += self.scaled_amplitudes_2d[i]
                * f64::from(noise2(self.octave_seeds[i], x * frequency, y * frequency));
        }
        self.curve.apply(value * VALUE_MULTIPLIER)
    }

    /// Curved sum of the scaled 3D amplitudes, in `[0, 1]`.
    pub fn normalized_noise3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let orientation = self.orientation;
        let mut value = 0.0;
        for i in 0..self.amplitudes.len() {
            let frequency = self.frequencies[i];
            value += self.scaled_amplitudes_3d[i]
                * f64::from(orientation.sample(
                    self.octave_seeds[i],
                    x * frequency,
                    y * frequency,
                    z * frequency,
                ));
        }
        self.curve.apply(value * VALUE_MULTIPLIER)
    }

    /// Curved, thresholded sum of the scaled 3D amplitudes. Thresholds are given in the
    /// unscaled space and multiplied by [`VALUE_MULTIPLIER`] like the amplitudes.
    pub fn normalized_noise3d_with_thresholds(
        &self,
        x: f64,
        y: f64,
        z: f64,
        thresholds: &[f64],
    ) -> f64 {
        let ones = vec![1.0; self.amplitudes.len()];
        let value = self.shaped_noise3d(x, y, z, &ones, thresholds);
        self.curve.apply(value)
    }

    /// Uncurved value a column built with the same `amplitudes` and `thresholds` reports
    /// for this point, with `y` already scaled by the relative vertical frequency.
    ///
    /// Panics if either slice does not have one entry per octave.
    pub fn shaped_noise3d(
        &self,
        x: f64,
        y: f64,
        z: f64,
        amplitudes: &[f64],
        thresholds: &[f64],
    ) -> f64 {
        self.assert_octave_slice("amplitudes", amplitudes);
        self.assert_octave_slice("thresholds", thresholds);
        dispatch_3d!(self.orientation, self.threshold_mode, |sample, shaping| {
            let mut value = 0.0;
            for i in 0..self.amplitudes.len() {
                let frequency = self.frequencies[i];
                let amplitude = amplitudes[i] * self.scaled_amplitudes_3d[i] * VALUE_MULTIPLIER;
                let octave = amplitude
                    * f64::from(sample(
                        self.octave_seeds[i],
                        x * frequency,
                        y * frequency,
                        z * frequency,
                    ));
                value += shaping.shape(
                    octave,
                    thresholds[i] * VALUE_MULTIPLIER,
                    shaping.blend_width(amplitude, frequency),
                );
            }
            value
        })
    }

    fn assert_octave_slice(&self, name: &'static str, values: &[f64]) {
        if let Err(err) = check_length(name, values, self.amplitudes.len()) {
            panic!("{err}");
        }
    }
}

pub(crate) fn default_octaves(
    count: usize,
    base_frequency: f64,
    persistence: f64,
) -> (Vec<f64>, Vec<f64>) {
    let amplitudes = (0..count).map(|i| persistence.powi(i as i32)).collect();
    let frequencies = (0..count)
        .map(|i| base_frequency * 2f64.powi(i as i32))
        .collect();
    (amplitudes, frequencies)
}

fn octave_seeds(seed: i64, count: usize) -> Vec<i64> {
    (0..count)
        .map(|i| seed.wrapping_mul(OCTAVE_SEED_MULTIPLIER).wrapping_add(i as i64))
        .collect()
}

fn scale_amplitudes(amplitudes: &[f64], decay: f64) -> Result<Vec<f64>, NoiseConfigError> {
    let mut total = 0.0;
    let mut weight = decay;
    for amplitude in amplitudes {
        total += amplitude * weight;
        weight *= decay;
    }
    if total == 0.0 || !total.is_finite() {
        return Err(NoiseConfigError::DegenerateAmplitudes);
    }
    let total = total.abs();
    Ok(amplitudes.iter().map(|amplitude| amplitude / total).collect())
}
