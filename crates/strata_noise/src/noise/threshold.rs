//! Per-octave ridge shaping.
//!
//! Every shaping here is monotone non-decreasing in the octave value, which is what lets the
//! column evaluators turn a bound on the value into a bound on the contribution.

/// How octave values are pulled towards zero before they are summed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum ThresholdMode {
    /// `v > 0 ? max(0, v - t) : min(0, v + t)`
    #[default]
    Hard,
    /// Polynomial smooth max/min around the threshold. The blend width of an octave is
    /// `|amplitude · frequency| · smoothing`.
    Smooth { smoothing: f64 },
}

/// A shaping kernel, resolved from [`ThresholdMode`] before a hot loop starts.
pub trait Thresholding: Copy {
    /// Width of the transition band for an octave.
    fn blend_width(self, amplitude: f64, frequency: f64) -> f64;

    fn shape(self, value: f64, threshold: f64, width: f64) -> f64;

    /// Largest magnitude the shaped value can take for `|value| <= max_value`.
    #[inline]
    fn max_shaped(self, max_value: f64, threshold: f64, width: f64) -> f64 {
        self.shape(max_value, threshold, width)
            .abs()
            .max(self.shape(-max_value, threshold, width).abs())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Hard;

#[derive(Clone, Copy, Debug)]
pub struct Smooth {
    pub smoothing: f64,
}

impl Thresholding for Hard {
    #[inline(always)]
    fn blend_width(self, _amplitude: f64, _frequency: f64) -> f64 {
        0.0
    }

    #[inline(always)]
    fn shape(self, value: f64, threshold: f64, _width: f64) -> f64 {
        hard_threshold(value, threshold)
    }
}

impl Thresholding for Smooth {
    #[inline(always)]
    fn blend_width(self, amplitude: f64, frequency: f64) -> f64 {
        (amplitude * frequency).abs() * self.smoothing
    }

    #[inline(always)]
    fn shape(self, value: f64, threshold: f64, width: f64) -> f64 {
        smooth_threshold(value, threshold, width)
    }
}

#[inline(always)]
pub fn hard_threshold(value: f64, threshold: f64) -> f64 {
    if value.is_nan() {
        return value;
    }
    if value > 0.0 {
        (value - threshold).max(0.0)
    } else {
        (value + threshold).min(0.0)
    }
}

/// Odd, continuous counterpart of [`hard_threshold`]. A non-positive width degrades to it.
/// A NaN value passes through unchanged.
#[inline(always)]
pub fn smooth_threshold(value: f64, threshold: f64, width: f64) -> f64 {
    if value.is_nan() {
        return value;
    }
    if width <= 0.0 || width.is_nan() {
        return hard_threshold(value, threshold);
    }
    smooth_max(0.0, value - threshold, width) + smooth_min(0.0, value + threshold, width)
}

#[inline(always)]
pub fn smooth_min(a: f64, b: f64, width: f64) -> f64 {
    let h = (width - (a - b).abs()).max(0.0) / width;
    a.min(b) - h * h * width * 0.25
}

#[inline(always)]
pub fn smooth_max(a: f64, b: f64, width: f64) -> f64 {
    let h = (width - (a - b).abs()).max(0.0) / width;
    a.max(b) + h * h * width * 0.25
}

#[cfg(test)]
mod test {
    use crate::noise::threshold::{
        Hard, Smooth, Thresholding, hard_threshold, smooth_max, smooth_min, smooth_threshold,
    };

    #[test]
    fn hard() {
        assert_eq!(hard_threshold(0.5, 0.2), 0.3);
        assert_eq!(hard_threshold(-0.5, 0.25), -0.25);
        assert_eq!(hard_threshold(0.1, 0.2), 0.0);
        assert_eq!(hard_threshold(-0.1, 0.2), 0.0);
        assert_eq!(hard_threshold(0.7, 0.0), 0.7);
    }

    #[test]
    fn smooth_blend() {
        assert_eq!(smooth_min(0.0, 2.0, 1.0), 0.0);
        assert_eq!(smooth_max(0.0, -2.0, 1.0), 0.0);
        assert_eq!(smooth_max(0.0, 0.0, 1.0), 0.25);
        assert_eq!(smooth_min(0.0, 0.0, 1.0), -0.25);
        // Far from the band the smooth shape matches the hard one.
        assert_eq!(smooth_threshold(3.0, 0.5, 0.2), 2.5);
        assert_eq!(smooth_threshold(-3.0, 0.5, 0.2), -2.5);
        assert_eq!(smooth_threshold(0.0, 0.5, 0.2), 0.0);
        assert_eq!(smooth_threshold(0.4, 0.5, 0.0), hard_threshold(0.4, 0.5));
    }

    #[test]
    fn zero_threshold_is_identity() {
        for i in -20..=20 {
            let value = i as f64 * 0.05;
            assert!((smooth_threshold(value, 0.0, 0.3) - value).abs() < 1e-15);
        }
    }

    #[test]
    fn odd_and_monotone() {
        for (threshold, width) in [(0.0, 0.0), (0.2, 0.0), (0.2, 0.1), (0.1, 0.6), (-0.1, 0.3)] {
            let mut previous = f64::NEG_INFINITY;
            for i in -200..=200 {
                let value = i as f64 * 0.01;
                let shaped = smooth_threshold(value, threshold, width);
                assert!(shaped >= previous, "t={threshold} w={width} v={value}");
                previous = shaped;
                if value != 0.0 {
                    let mirrored = smooth_threshold(-value, threshold, width);
                    assert!((shaped + mirrored).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn nan_passes_through() {
        assert!(hard_threshold(f64::NAN, 0.0).is_nan());
        assert!(hard_threshold(f64::NAN, 0.3).is_nan());
        assert!(smooth_threshold(f64::NAN, 0.2, 0.1).is_nan());
        assert!(smooth_threshold(f64::NAN, 0.2, 0.0).is_nan());
        assert!(Smooth { smoothing: 1.0 }.shape(f64::NAN, 0.0, 0.5).is_nan());
    }

    #[test]
    fn max_shaped() {
        assert_eq!(Hard.max_shaped(1.0, 0.25, 0.0), 0.75);
        assert_eq!(Hard.max_shaped(1.0, 1.5, 0.0), 0.0);
        let smooth = Smooth { smoothing: 2.0 };
        let width = smooth.blend_width(0.5, -0.4);
        assert!((width - 0.4).abs() < 1e-15);
        // A threshold above the peak still leaves the smoothing overshoot.
        assert!(smooth.max_shaped(1.0, 1.1, width) > 0.0);
        assert!(smooth.max_shaped(1.0, 1.1, width) >= Hard.max_shaped(1.0, 1.1, 0.0));
    }
}
