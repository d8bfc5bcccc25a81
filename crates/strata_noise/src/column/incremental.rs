use crate::column::{ColumnNoise, OctaveEntry};
use crate::noise::fractal_noise::dispatch_3d;
use crate::noise::simplex_octave::{MAX_SLOPE_3D, MAX_VALUE_3D};
use crate::noise::threshold::Thresholding;
use std::cell::Cell;
use std::marker::PhantomData;

/// Absorbs the `f32` rounding of cached octave values.
const SLOPE_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
struct PastEvaluation {
    y: f64,
    /// Unweighted octave value.
    value: f64,
}

/// A [`ColumnNoise`] that remembers the last value of every octave.
///
/// The octave field changes by at most `MAX_SLOPE_3D · |frequency_y|` per unit of height, so
/// a cached value bounds the octave at nearby heights without evaluating it again. Queries
/// mutate the cache; keep one instance per worker and column.
#[derive(Clone, Debug)]
pub struct IncrementalColumnNoise {
    column: ColumnNoise,
    past: Vec<Option<PastEvaluation>>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    octaves_evaluated: u64,
    _not_sync: PhantomData<Cell<()>>,
}

impl IncrementalColumnNoise {
    pub(super) fn new(column: ColumnNoise) -> Self {
        let count = column.octave_count();
        Self {
            column,
            past: vec![None; count],
            lower: vec![0.0; count + 1],
            upper: vec![0.0; count + 1],
            octaves_evaluated: 0,
            _not_sync: PhantomData,
        }
    }

    #[inline]
    pub fn column(&self) -> &ColumnNoise {
        &self.column
    }

    /// Evaluator calls made by [`IncrementalColumnNoise::noise_sign`] so far.
    #[inline]
    pub fn octaves_evaluated(&self) -> u64 {
        self.octaves_evaluated
    }

    /// Forgets every cached octave value and the evaluation count.
    pub fn reset(&mut self) {
        self.past.fill(None);
        self.octaves_evaluated = 0;
    }

    /// Uncurved value at height `y`, every octave evaluated. Leaves the cache untouched.
    #[inline]
    pub fn noise(&self, y: f64) -> f64 {
        self.column.noise(y)
    }

    /// Returns a value with the sign of `noise(y) + bias`, or zero only if that sum may be
    /// zero. Octaves whose cached value already decides the sign are not evaluated.
    pub fn noise_sign(&mut self, y: f64, bias: f64) -> f64 {
        dispatch_3d!(
            self.column.orientation,
            self.column.threshold_mode,
            |sample, shaping| self.noise_sign_with(sample, shaping, y, bias)
        )
    }

    fn noise_sign_with<S, T>(&mut self, sample: S, shaping: T, y: f64, bias: f64) -> f64
    where
        S: Fn(i64, f64, f64, f64) -> f32 + Copy,
        T: Thresholding,
    {
        let count = self.column.octaves.len();
        self.lower[count] = 0.0;
        self.upper[count] = 0.0;
        for k in (0..count).rev() {
            let (lo, hi) = contribution_range(&self.column.octaves[k], self.past[k], shaping, y);
            self.lower[k] = self.lower[k + 1] + lo;
            self.upper[k] = self.upper[k + 1] + hi;
        }

        let mut value = bias;
        for k in 0..count {
            let lower = self.lower[k];
            let upper = self.upper[k];
            if value + lower >= 0.0 || value + upper <= 0.0 {
                return value + (lower + upper) * 0.5;
            }

            let octave = &self.column.octaves[k];
            let raw = match self.past[k] {
                Some(past) if past.y == y && past.value.is_finite() => past.value,
                _ => {
                    let raw = octave.sample(sample, y);
                    self.past[k] = Some(PastEvaluation { y, value: raw });
                    self.octaves_evaluated += 1;
                    raw
                }
            };
            value += octave.shape(shaping, raw);
        }
        value
    }
}

/// Bounds the shaped contribution of `octave` at height `y` from its last evaluation.
#[inline(always)]
fn contribution_range<T: Thresholding>(
    octave: &OctaveEntry,
    past: Option<PastEvaluation>,
    shaping: T,
    y: f64,
) -> (f64, f64) {
    let (low, high) = match past {
        Some(past) if past.value.is_finite() && past.y == y => (past.value, past.value),
        Some(past) if past.value.is_finite() => {
            let delta =
                MAX_SLOPE_3D * octave.frequency_y.abs() * (y - past.y).abs() + SLOPE_EPSILON;
            if delta.is_finite() {
                (
                    (past.value - delta).max(-MAX_VALUE_3D),
                    (past.value + delta).min(MAX_VALUE_3D),
                )
            } else {
                (-MAX_VALUE_3D, MAX_VALUE_3D)
            }
        }
        _ => (-MAX_VALUE_3D, MAX_VALUE_3D),
    };
    let (low, high) = if octave.amplitude >= 0.0 {
        (low, high)
    } else {
        (high, low)
    };
    (octave.shape(shaping, low), octave.shape(shaping, high))
}
