//! Vertical scans at a fixed horizontal position.
//!
//! A [`ColumnNoise`] orders the octaves of a [`FractalNoise`] by the largest contribution
//! each can make, so a sign query can stop as soon as the octaves left cannot move the
//! running sum across zero.

mod incremental;

pub use incremental::IncrementalColumnNoise;

use crate::error::{NoiseConfigError, check_finite, check_length};
use crate::noise::curve::NoiseCurve;
use crate::noise::fractal_noise::{FractalNoise, VALUE_MULTIPLIER, dispatch_3d};
use crate::noise::simplex_octave::{MAX_VALUE_3D, Orientation3D};
use crate::noise::threshold::{Hard, Smooth, ThresholdMode, Thresholding};
use tracing::trace;

/// One octave prepared for a column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctaveEntry {
    pub seed: i64,
    /// `x · frequency`
    pub x: f64,
    /// `z · frequency`
    pub z: f64,
    /// `frequency · relative_y_frequency`
    pub frequency_y: f64,
    pub amplitude: f64,
    pub threshold: f64,
    /// Blend width of the smooth threshold, zero for hard thresholds.
    pub smoothing: f64,
    pub max_contribution: f64,
    /// Sum of `max_contribution` over this octave and every octave after it.
    pub stop_bound: f64,
}

impl OctaveEntry {
    #[inline(always)]
    fn sample<S>(&self, sample: S, y: f64) -> f64
    where
        S: Fn(i64, f64, f64, f64) -> f32,
    {
        f64::from(sample(self.seed, self.x, y * self.frequency_y, self.z))
    }

    #[inline(always)]
    fn shape<T: Thresholding>(&self, shaping: T, raw: f64) -> f64 {
        shaping.shape(raw * self.amplitude, self.threshold, self.smoothing)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnNoise {
    octaves: Vec<OctaveEntry>,
    uncurved_bound: f64,
    bound_min: f64,
    bound_max: f64,
    curve: NoiseCurve,
    orientation: Orientation3D,
    threshold_mode: ThresholdMode,
}

impl FractalNoise {
    /// Prepares a column at `(x, z)`. `amplitudes` and `thresholds` hold one entry per
    /// octave and are applied on top of the scaled 3D amplitudes.
    ///
    /// Panics on an invalid configuration, see [`FractalNoise::try_for_column`].
    pub fn for_column(
        &self,
        relative_y_frequency: f64,
        amplitudes: &[f64],
        thresholds: &[f64],
        x: f64,
        z: f64,
    ) -> ColumnNoise {
        match self.try_for_column(relative_y_frequency, amplitudes, thresholds, x, z) {
            Ok(column) => column,
            Err(err) => panic!("invalid column configuration: {err}"),
        }
    }

    pub fn try_for_column(
        &self,
        relative_y_frequency: f64,
        amplitudes: &[f64],
        thresholds: &[f64],
        x: f64,
        z: f64,
    ) -> Result<ColumnNoise, NoiseConfigError> {
        check_length("amplitudes", amplitudes, self.octave_count())?;
        check_length("thresholds", thresholds, self.octave_count())?;
        check_finite("relative_y_frequency", &[relative_y_frequency])?;
        check_finite("amplitudes", amplitudes)?;
        check_finite("thresholds", thresholds)?;

        let octaves = match self.threshold_mode() {
            ThresholdMode::Hard => {
                self.column_octaves(Hard, relative_y_frequency, amplitudes, thresholds, x, z)
            }
            ThresholdMode::Smooth { smoothing } => self.column_octaves(
                Smooth { smoothing },
                relative_y_frequency,
                amplitudes,
                thresholds,
                x,
                z,
            ),
        };
        Ok(ColumnNoise::new(octaves, self))
    }

    pub fn for_column_incremental(
        &self,
        relative_y_frequency: f64,
        amplitudes: &[f64],
        thresholds: &[f64],
        x: f64,
        z: f64,
    ) -> IncrementalColumnNoise {
        self.for_column(relative_y_frequency, amplitudes, thresholds, x, z)
            .into_incremental()
    }

    fn column_octaves<T: Thresholding>(
        &self,
        shaping: T,
        relative_y_frequency: f64,
        amplitudes: &[f64],
        thresholds: &[f64],
        x: f64,
        z: f64,
    ) -> Vec<OctaveEntry> {
        let mut octaves = Vec::with_capacity(self.octave_count());
        for i in 0..self.octave_count() {
            let frequency = self.frequencies()[i];
            let amplitude = amplitudes[i] * self.scaled_amplitudes_3d()[i] * VALUE_MULTIPLIER;
            let threshold = thresholds[i] * VALUE_MULTIPLIER;
            let smoothing = shaping.blend_width(amplitude, frequency);
            let max_contribution =
                shaping.max_shaped(amplitude.abs() * MAX_VALUE_3D, threshold, smoothing);
            if max_contribution <= 0.0 {
                continue;
            }
            octaves.push(OctaveEntry {
                seed: self.octave_seeds()[i],
                x: x * frequency,
                z: z * frequency,
                frequency_y: frequency * relative_y_frequency,
                amplitude,
                threshold,
                smoothing,
                max_contribution,
                stop_bound: 0.0,
            });
        }

        octaves.sort_by(|a, b| b.max_contribution.total_cmp(&a.max_contribution));
        let mut remaining = 0.0;
        for octave in octaves.iter_mut().rev() {
            remaining += octave.max_contribution;
            octave.stop_bound = remaining;
        }
        octaves
    }
}

impl ColumnNoise {
    fn new(octaves: Vec<OctaveEntry>, noise: &FractalNoise) -> Self {
        let uncurved_bound = octaves.first().map_or(0.0, |octave| octave.stop_bound);
        let curve = noise.curve();
        trace!(
            octaves = octaves.len(),
            uncurved_bound,
            "prepared noise column"
        );
        Self {
            octaves,
            uncurved_bound,
            bound_min: curve.apply(-uncurved_bound),
            bound_max: curve.apply(uncurved_bound),
            curve,
            orientation: noise.orientation(),
            threshold_mode: noise.threshold_mode(),
        }
    }

    /// Returns a value with the sign of `noise(y) + bias`, or zero only if that sum may be
    /// zero. The value is exact when every octave had to be evaluated.
    pub fn noise_sign(&self, y: f64, bias: f64) -> f64 {
        dispatch_3d!(self.orientation, self.threshold_mode, |sample, shaping| {
            self.noise_sign_with(sample, shaping, y, bias)
        })
    }

    #[inline]
    fn noise_sign_with<S, T>(&self, sample: S, shaping: T, y: f64, bias: f64) -> f64
    where
        S: Fn(i64, f64, f64, f64) -> f32 + Copy,
        T: Thresholding,
    {
        let mut value = bias;
        for octave in &self.octaves {
            if value >= octave.stop_bound || value <= -octave.stop_bound {
                return value;
            }
            value += octave.shape(shaping, octave.sample(sample, y));
        }
        value
    }

    /// Uncurved value at height `y`, every octave evaluated.
    pub fn noise(&self, y: f64) -> f64 {
        dispatch_3d!(self.orientation, self.threshold_mode, |sample, shaping| {
            let mut value = 0.0;
            for octave in &self.octaves {
                value += octave.shape(shaping, octave.sample(sample, y));
            }
            value
        })
    }

    #[inline]
    pub fn noise_curved(&self, y: f64) -> f64 {
        self.curve.apply(self.noise(y))
    }

    /// Largest magnitude [`ColumnNoise::noise`] can reach.
    #[inline]
    pub fn uncurved_bound(&self) -> f64 {
        self.uncurved_bound
    }

    #[inline]
    pub fn bound_min(&self) -> f64 {
        self.bound_min
    }

    #[inline]
    pub fn bound_max(&self) -> f64 {
        self.bound_max
    }

    #[inline]
    pub fn curve(&self) -> NoiseCurve {
        self.curve
    }

    /// Octaves that can contribute, zero-contribution octaves excluded.
    #[inline]
    pub fn octave_count(&self) -> usize {
        self.octaves.len()
    }

    /// Octaves in evaluation order.
    #[inline]
    pub fn octaves(&self) -> &[OctaveEntry] {
        &self.octaves
    }

    pub fn into_incremental(self) -> IncrementalColumnNoise {
        IncrementalColumnNoise::new(self)
    }
}
