/// Monotone squashing of a raw fractal sum into `[0, 1]`.
///
/// Both curves map `0` to `0.5` and approach `0` and `1` at `∓∞`. [`NoiseCurve::inverse`]
/// lets callers translate an output level into raw-sum space once, then compare raw sums
/// directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NoiseCurve {
    /// `v / √(1 + v²) · 0.5 + 0.5`
    #[default]
    Algebraic,
    /// `tanh(v) · 0.5 + 0.5`
    Tanh,
}

impl NoiseCurve {
    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            NoiseCurve::Algebraic => value / (1.0 + value * value).sqrt() * 0.5 + 0.5,
            NoiseCurve::Tanh => value.tanh() * 0.5 + 0.5,
        }
    }

    /// Inverse of [`NoiseCurve::apply`]. Levels at or beyond the asymptotes map to infinity.
    pub fn inverse(self, level: f64) -> f64 {
        if level <= 0.0 {
            return f64::NEG_INFINITY;
        }
        if level >= 1.0 {
            return f64::INFINITY;
        }
        let t = level * 2.0 - 1.0;
        match self {
            NoiseCurve::Algebraic => t / (1.0 - t * t).sqrt(),
            NoiseCurve::Tanh => t.atanh(),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::noise::curve::NoiseCurve;
    use rand_xoshiro::Xoroshiro128PlusPlus;
    use rand_xoshiro::rand_core::{RngCore, SeedableRng};

    #[test]
    fn midpoint() {
        for curve in [NoiseCurve::Algebraic, NoiseCurve::Tanh] {
            assert_eq!(curve.apply(0.0), 0.5);
            assert_eq!(curve.inverse(0.5), 0.0);
        }
        assert_eq!(format!("{:.4}", NoiseCurve::Algebraic.apply(1.0)), "0.8536");
        assert_eq!(format!("{:.4}", NoiseCurve::Tanh.apply(1.0)), "0.8808");
    }

    #[test]
    fn asymptotes() {
        for curve in [NoiseCurve::Algebraic, NoiseCurve::Tanh] {
            assert_eq!(curve.inverse(0.0), f64::NEG_INFINITY);
            assert_eq!(curve.inverse(-0.25), f64::NEG_INFINITY);
            assert_eq!(curve.inverse(1.0), f64::INFINITY);
            assert_eq!(curve.inverse(3.0), f64::INFINITY);
            assert!(curve.apply(-1e6) >= 0.0);
            assert!(curve.apply(1e6) <= 1.0);
        }
    }

    #[test]
    fn monotone() {
        for curve in [NoiseCurve::Algebraic, NoiseCurve::Tanh] {
            let mut previous = curve.apply(-8.0);
            for i in 1..=1600 {
                let next = curve.apply(-8.0 + i as f64 * 0.01);
                assert!(next > previous);
                previous = next;
            }
        }
    }

    #[test]
    fn invertible() {
        let mut random = Xoroshiro128PlusPlus::seed_from_u64(1234);
        for curve in [NoiseCurve::Algebraic, NoiseCurve::Tanh] {
            for _ in 0..10_000 {
                let unit = (random.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
                let value = unit * 16.0 - 8.0;
                let back = curve.inverse(curve.apply(value));
                assert!(
                    (back - value).abs() <= 1e-9 * value.abs().max(1.0),
                    "{curve:?}: {value} -> {back}"
                );
            }
        }
    }
}
