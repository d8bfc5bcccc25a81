//! Single-octave lattice gradient noise.
//!
//! 2D samples a triangular (skewed) lattice, 3D samples a body-centred-cubic lattice made of
//! two interleaved cubic lattices. Every vertex inside the kernel radius contributes
//! `(r² - d²)⁴ · (g · d)`, where `g` is a hashed gradient and `d` the offset to the vertex.
//!
//! The gradient tables are scaled so that the worst case over every position and every
//! gradient assignment stays below [`MAX_VALUE_2D`] / [`MAX_VALUE_3D`]. Column evaluation
//! relies on these being true upper bounds, not typical ranges.

use bevy_math::{DVec2, DVec3};
use std::f64::consts::PI;
use std::sync::LazyLock;

/// Upper bound of `|noise2|`.
pub const MAX_VALUE_2D: f64 = 1.0;
/// Upper bound of `|noise3_*|`, shared by both orientations.
pub const MAX_VALUE_3D: f64 = 1.0;
/// Upper bound of the gradient magnitude of the 3D field, in lattice units.
///
/// Both orientations are orthonormal, so this also bounds `|d noise3 / dy|` for an input
/// that is not scaled by a frequency.
pub const MAX_SLOPE_3D: f64 = 11.4;

const PRIME_X: i64 = 0x5205402B9270C86F;
const PRIME_Y: i64 = 0x598CD327003817B5;
const PRIME_Z: i64 = 0x5BCC226E9FA0BACB;
const HASH_MULTIPLIER: i64 = 0x53A3F72DEEC546F5;
const SEED_FLIP_3D: i64 = -0x52D547B2E96ED629;

const SKEW_2D: f64 = 0.366025403784439;
const UNSKEW_2D: f64 = -0.21132486540518713;
const RSQUARED_2D: f64 = 2.0 / 3.0;
const RSQUARED_3D: f64 = 0.75;

// Worst-case kernel sums max Σ (r² - d²)⁴ |d| are 0.0551804 (2D) and 0.0867762 (3D).
// The normalisers pad them by about one percent.
const NORMALIZER_2D: f64 = 0.0558;
const NORMALIZER_3D: f64 = 0.0877;

const ROTATE_3D_ORTHOGONALIZER: f64 = -0.211324865405187;
const ROOT3OVER3: f64 = 0.577350269189626;
const FALLBACK_ROTATE_3D: f64 = 2.0 / 3.0;

const N_GRADS_2D_EXPONENT: u32 = 7;
const N_GRADS_3D_EXPONENT: u32 = 8;
const N_GRADS_2D: usize = 1 << N_GRADS_2D_EXPONENT;
const N_GRADS_3D: usize = 1 << N_GRADS_3D_EXPONENT;

const GRADIENT_3D_DIAGONAL: f64 = 2.22474487139;
const GRADIENT_3D_EDGE: (f64, f64) = (3.0862664687972017, 1.1721513422464978);

static GRADIENTS_2D: LazyLock<[DVec2; N_GRADS_2D]> = LazyLock::new(|| {
    // 24 evenly spaced directions, offset half a step from the axes.
    let base: [DVec2; 24] = std::array::from_fn(|k| {
        let angle = (2 * k + 1) as f64 * PI / 24.0;
        DVec2::new(angle.cos(), angle.sin()) / NORMALIZER_2D
    });
    std::array::from_fn(|i| base[i % base.len()])
});

static GRADIENTS_3D: LazyLock<[DVec3; N_GRADS_3D]> = LazyLock::new(|| {
    let mut base = Vec::with_capacity(48);
    for axis in 0..3 {
        for sx in [1.0, -1.0] {
            for sy in [1.0, -1.0] {
                for sz in [1.0, -1.0] {
                    let signs = DVec3::new(sx, sy, sz);
                    let mut gradient = signs * GRADIENT_3D_DIAGONAL;
                    gradient[axis] = signs[axis];
                    base.push(gradient);
                }
            }
        }
    }
    for zero in 0..3 {
        let others: Vec<usize> = (0..3).filter(|&axis| axis != zero).collect();
        for (p, q) in [(others[0], others[1]), (others[1], others[0])] {
            for sp in [1.0, -1.0] {
                for sq in [1.0, -1.0] {
                    let mut gradient = DVec3::ZERO;
                    gradient[p] = GRADIENT_3D_EDGE.0 * sp;
                    gradient[q] = GRADIENT_3D_EDGE.1 * sq;
                    base.push(gradient);
                }
            }
        }
    }
    let base: Vec<DVec3> = base
        .into_iter()
        .map(|gradient| gradient / gradient.length() / NORMALIZER_3D)
        .collect();
    std::array::from_fn(|i| base[i % base.len()])
});

/// Orthonormal input transform applied before the 3D lattice is sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Orientation3D {
    /// Maps the lattice main diagonal onto +y, so x/z slices look alike and vertical
    /// scans stay smooth. Suited to terrain density.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "improve_xz"))]
    ImproveXZ,
    /// Symmetric reflection that treats all three axes the same.
    Fallback,
}

impl Orientation3D {
    #[inline]
    pub fn sample(self, seed: i64, x: f64, y: f64, z: f64) -> f32 {
        match self {
            Orientation3D::ImproveXZ => noise3_improve_xz(seed, x, y, z),
            Orientation3D::Fallback => noise3_fallback(seed, x, y, z),
        }
    }
}

/// 2D noise on the skewed triangular lattice, in `[-MAX_VALUE_2D, MAX_VALUE_2D]`.
#[inline]
pub fn noise2(seed: i64, x: f64, y: f64) -> f32 {
    let s = SKEW_2D * (x + y);
    noise2_unskewed_base(seed, x + s, y + s)
}

fn noise2_unskewed_base(seed: i64, xs: f64, ys: f64) -> f32 {
    let gradients: &[DVec2; N_GRADS_2D] = &GRADIENTS_2D;

    let xsb = xs.floor() as i64;
    let ysb = ys.floor() as i64;
    let xi = xs - xsb as f64;
    let yi = ys - ysb as f64;

    let xsbp = xsb.wrapping_mul(PRIME_X);
    let ysbp = ysb.wrapping_mul(PRIME_Y);

    let t = (xi + yi) * UNSKEW_2D;
    let dx0 = xi + t;
    let dy0 = yi + t;

    // The base vertex and the opposite corner of the cell are always in range.
    let mut value = vertex2(gradients, seed, xsbp, ysbp, dx0, dy0);
    value += vertex2(
        gradients,
        seed,
        xsbp.wrapping_add(PRIME_X),
        ysbp.wrapping_add(PRIME_Y),
        dx0 - (1.0 + 2.0 * UNSKEW_2D),
        dy0 - (1.0 + 2.0 * UNSKEW_2D),
    );

    let xmyi = xi - yi;
    if t < UNSKEW_2D {
        if xi + xmyi > 1.0 {
            value += guarded_vertex2(
                gradients,
                seed,
                xsbp.wrapping_add(PRIME_X << 1),
                ysbp.wrapping_add(PRIME_Y),
                dx0 - (3.0 * UNSKEW_2D + 2.0),
                dy0 - (3.0 * UNSKEW_2D + 1.0),
            );
        } else {
            value += guarded_vertex2(
                gradients,
                seed,
                xsbp,
                ysbp.wrapping_add(PRIME_Y),
                dx0 - UNSKEW_2D,
                dy0 - (UNSKEW_2D + 1.0),
            );
        }
        if yi - xmyi > 1.0 {
            value += guarded_vertex2(
                gradients,
                seed,
                xsbp.wrapping_add(PRIME_X),
                ysbp.wrapping_add(PRIME_Y << 1),
                dx0 - (3.0 * UNSKEW_2D + 1.0),
                dy0 - (3.0 * UNSKEW_2D + 2.0),
            );
        } else {
            value += guarded_vertex2(
                gradients,
                seed,
                xsbp.wrapping_add(PRIME_X),
                ysbp,
                dx0 - (UNSKEW_2D + 1.0),
                dy0 - UNSKEW_2D,
            );
        }
    } else {
        if xi + xmyi < 0.0 {
            value += guarded_vertex2(
                gradients,
                seed,
                xsbp.wrapping_sub(PRIME_X),
                ysbp,
                dx0 + (1.0 + UNSKEW_2D),
                dy0 + UNSKEW_2D,
            );
        } else {
            value += guarded_vertex2(
                gradients,
                seed,
                xsbp.wrapping_add(PRIME_X),
                ysbp,
                dx0 - (UNSKEW_2D + 1.0),
                dy0 - UNSKEW_2D,
            );
        }
        if yi < xmyi {
            value += guarded_vertex2(
                gradients,
                seed,
                xsbp,
                ysbp.wrapping_sub(PRIME_Y),
                dx0 + UNSKEW_2D,
                dy0 + (UNSKEW_2D + 1.0),
            );
        } else {
            value += guarded_vertex2(
                gradients,
                seed,
                xsbp,
                ysbp.wrapping_add(PRIME_Y),
                dx0 - UNSKEW_2D,
                dy0 - (UNSKEW_2D + 1.0),
            );
        }
    }
    value as f32
}

#[inline(always)]
fn vertex2(
    gradients: &[DVec2; N_GRADS_2D],
    seed: i64,
    xsvp: i64,
    ysvp: i64,
    dx: f64,
    dy: f64,
) -> f64 {
    let a = RSQUARED_2D - dx * dx - dy * dy;
    (a * a) * (a * a) * grad2(gradients, seed, xsvp, ysvp, dx, dy)
}

#[inline(always)]
fn guarded_vertex2(
    gradients: &[DVec2; N_GRADS_2D],
    seed: i64,
    xsvp: i64,
    ysvp: i64,
    dx: f64,
    dy: f64,
) -> f64 {
    let a = RSQUARED_2D - dx * dx - dy * dy;
    if a > 0.0 {
        (a * a) * (a * a) * grad2(gradients, seed, xsvp, ysvp, dx, dy)
    } else {
        0.0
    }
}

#[inline(always)]
fn grad2(gradients: &[DVec2; N_GRADS_2D], seed: i64, xsvp: i64, ysvp: i64, dx: f64, dy: f64) -> f64 {
    let mut hash = (seed ^ xsvp ^ ysvp).wrapping_mul(HASH_MULTIPLIER);
    hash ^= hash >> (64 - N_GRADS_2D_EXPONENT);
    let gradient = gradients[hash as usize & (N_GRADS_2D - 1)];
    gradient.dot(DVec2::new(dx, dy))
}

/// 3D noise with the lattice diagonal rotated onto the y axis.
#[inline]
pub fn noise3_improve_xz(seed: i64, x: f64, y: f64, z: f64) -> f32 {
    let xz = x + z;
    let s2 = xz * ROTATE_3D_ORTHOGONALIZER;
    let yy = y * ROOT3OVER3;
    let xr = x + s2 + yy;
    let zr = z + s2 + yy;
    let yr = xz * -ROOT3OVER3 + yy;
    noise3_unrotated_base(seed, xr, yr, zr)
}

/// 3D noise with the symmetric fallback reflection.
#[inline]
pub fn noise3_fallback(seed: i64, x: f64, y: f64, z: f64) -> f32 {
    let r = FALLBACK_ROTATE_3D * (x + y + z);
    noise3_unrotated_base(seed, r - x, r - y, r - z)
}

fn noise3_unrotated_base(seed: i64, xr: f64, yr: f64, zr: f64) -> f32 {
    let gradients: &[DVec3; N_GRADS_3D] = &GRADIENTS_3D;
    let value = cubic_lattice(gradients, seed, xr, yr, zr, 0.0, true)
        + cubic_lattice(gradients, seed ^ SEED_FLIP_3D, xr, yr, zr, 0.5, false);
    value as f32
}

/// Sums the eight corners of the cell of the cubic lattice whose vertices sit at
/// `integer + shift`. No other vertex of that lattice can be within the kernel radius.
///
/// With `anchor_nearest` the corner closest to the point is accumulated without the
/// radius check. It is never outside the radius, and it carries NaN inputs through.
#[inline(always)]
fn cubic_lattice(
    gradients: &[DVec3; N_GRADS_3D],
    seed: i64,
    x: f64,
    y: f64,
    z: f64,
    shift: f64,
    anchor_nearest: bool,
) -> f64 {
    let xs = x - shift;
    let ys = y - shift;
    let zs = z - shift;
    let xb = xs.floor() as i64;
    let yb = ys.floor() as i64;
    let zb = zs.floor() as i64;
    let xi = xs - xb as f64;
    let yi = ys - yb as f64;
    let zi = zs - zb as f64;

    let xp = xb.wrapping_mul(PRIME_X);
    let yp = yb.wrapping_mul(PRIME_Y);
    let zp = zb.wrapping_mul(PRIME_Z);
    let xps = [xp, xp.wrapping_add(PRIME_X)];
    let yps = [yp, yp.wrapping_add(PRIME_Y)];
    let zps = [zp, zp.wrapping_add(PRIME_Z)];

    let nearest = usize::from(xi >= 0.5) | usize::from(yi >= 0.5) << 1 | usize::from(zi >= 0.5) << 2;

    let mut value = 0.0;
    for corner in 0..8 {
        let cx = corner & 1;
        let cy = (corner >> 1) & 1;
        let cz = (corner >> 2) & 1;
        let dx = xi - cx as f64;
        let dy = yi - cy as f64;
        let dz = zi - cz as f64;
        let a = RSQUARED_3D - dx * dx - dy * dy - dz * dz;
        if a > 0.0 || (anchor_nearest && corner == nearest) {
            value += (a * a) * (a * a) * grad3(gradients, seed, xps[cx], yps[cy], zps[cz], dx, dy, dz);
        }
    }
    value
}

#[inline(always)]
fn grad3(
    gradients: &[DVec3; N_GRADS_3D],
    seed: i64,
    xrvp: i64,
    yrvp: i64,
    zrvp: i64,
    dx: f64,
    dy: f64,
    dz: f64,
) -> f64 {
    let mut hash = (seed ^ xrvp ^ yrvp ^ zrvp).wrapping_mul(HASH_MULTIPLIER);
    hash ^= hash >> (64 - N_GRADS_3D_EXPONENT);
    let gradient = gradients[hash as usize & (N_GRADS_3D - 1)];
    gradient.dot(DVec3::new(dx, dy, dz))
}

#[cfg(test)]
mod test {
    use crate::noise::simplex_octave::{
        GRADIENTS_2D, GRADIENTS_3D, MAX_SLOPE_3D, MAX_VALUE_2D, MAX_VALUE_3D, NORMALIZER_2D,
        NORMALIZER_3D, Orientation3D, noise2, noise3_fallback, noise3_improve_xz,
    };
    use rand_xoshiro::Xoroshiro128PlusPlus;
    use rand_xoshiro::rand_core::{RngCore, SeedableRng};

    fn next_f64(random: &mut Xoroshiro128PlusPlus, min: f64, max: f64) -> f64 {
        let unit = (random.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        min + unit * (max - min)
    }

    #[test]
    fn gradient_tables() {
        for gradient in GRADIENTS_2D.iter() {
            assert!((gradient.length() * NORMALIZER_2D - 1.0).abs() < 1e-12);
        }
        for gradient in GRADIENTS_3D.iter() {
            assert!((gradient.length() * NORMALIZER_3D - 1.0).abs() < 1e-12);
        }
        // 48 distinct directions, repeated to fill the table.
        assert_eq!(GRADIENTS_3D[0], GRADIENTS_3D[48]);
        assert_ne!(GRADIENTS_3D[0], GRADIENTS_3D[24]);
    }

    #[test]
    fn sample2() {
        assert_eq!(format!("{:.4}", noise2(0, 0.5, 0.25)), format!("{:.4}", -0.5862112641334534));
        assert_eq!(format!("{:.4}", noise2(0, 1.0, 2.0)), format!("{:.4}", -0.25220295786857605));
        assert_eq!(format!("{:.4}", noise2(0, -3.7, 12.1)), format!("{:.4}", -0.5591532588005066));
        assert_eq!(format!("{:.4}", noise2(0, 100.25, -40.5)), format!("{:.4}", -0.7008016705513));
    }

    #[test]
    fn sample3() {
        assert_eq!(
            format!("{:.4}", noise3_improve_xz(0, 0.5, 0.25, 0.125)),
            format!("{:.4}", 0.14027303457260132)
        );
        assert_eq!(
            format!("{:.4}", noise3_improve_xz(0, 1.0, 2.0, 3.0)),
            format!("{:.4}", -0.0793336033821106)
        );
        assert_eq!(
            format!("{:.4}", noise3_improve_xz(0, -3.7, 12.1, 8.9)),
            format!("{:.4}", 0.35861077904701233)
        );
        assert_eq!(
            format!("{:.4}", noise3_improve_xz(0, 100.25, -40.5, 7.0)),
            format!("{:.4}", 0.456367552280426)
        );
    }

    #[test]
    fn sample3_fallback() {
        assert_eq!(
            format!("{:.4}", noise3_fallback(0, 0.5, 0.25, 0.125)),
            format!("{:.4}", 0.45732593536376953)
        );
        assert_eq!(
            format!("{:.4}", noise3_fallback(0, -3.7, 12.1, 8.9)),
            format!("{:.4}", 0.192098930478096)
        );
        assert_eq!(
            format!("{:.4}", Orientation3D::Fallback.sample(0, 100.25, -40.5, 7.0)),
            format!("{:.4}", -0.3332924246788025)
        );
    }

    #[test]
    fn lattice_vertices() {
        let seed = 42 * 65599;
        assert_eq!(noise2(seed, 0.0, 0.0), 0.0);
        assert_eq!(noise3_improve_xz(seed, 0.0, 0.0, 0.0), 0.0);
        for x in -4..4 {
            for y in -4..4 {
                assert!(noise2(seed, x as f64, y as f64).is_finite());
                assert!(noise3_improve_xz(seed, x as f64, y as f64, 3.0).is_finite());
                assert!(noise3_fallback(seed, x as f64, y as f64, -3.0).is_finite());
            }
        }
    }

    #[test]
    fn bounded() {
        let mut random = Xoroshiro128PlusPlus::seed_from_u64(17);
        for _ in 0..50_000 {
            let seed = random.next_u64() as i64;
            let x = next_f64(&mut random, -1000.0, 1000.0);
            let y = next_f64(&mut random, -1000.0, 1000.0);
            let z = next_f64(&mut random, -1000.0, 1000.0);
            assert!(f64::from(noise2(seed, x, y)).abs() <= MAX_VALUE_2D);
            assert!(f64::from(noise3_improve_xz(seed, x, y, z)).abs() <= MAX_VALUE_3D);
            assert!(f64::from(noise3_fallback(seed, x, y, z)).abs() <= MAX_VALUE_3D);
        }
    }

    #[test]
    fn vertical_slope() {
        let mut random = Xoroshiro128PlusPlus::seed_from_u64(5);
        let step = 1e-3;
        for _ in 0..10_000 {
            let seed = random.next_u64() as i64;
            let x = next_f64(&mut random, -200.0, 200.0);
            let y = next_f64(&mut random, -200.0, 200.0);
            let z = next_f64(&mut random, -200.0, 200.0);
            let a = f64::from(noise3_improve_xz(seed, x, y, z));
            let b = f64::from(noise3_improve_xz(seed, x, y + step, z));
            assert!((b - a).abs() <= MAX_SLOPE_3D * step);
        }
    }

    #[test]
    fn nan_propagates() {
        assert!(noise2(3, f64::NAN, 1.0).is_nan());
        assert!(noise3_improve_xz(3, 1.0, f64::NAN, 2.0).is_nan());
        assert!(noise3_fallback(3, 1.0, 2.0, f64::NAN).is_nan());
    }

    #[test]
    fn deterministic() {
        for i in 0..100 {
            let x = i as f64 * 0.37;
            let z = i as f64 * -1.13;
            assert_eq!(
                noise3_improve_xz(99, x, 4.0, z).to_bits(),
                noise3_improve_xz(99, x, 4.0, z).to_bits()
            );
        }
        assert_ne!(noise2(1, 10.3, 4.7), noise2(2, 10.3, 4.7));
    }
}
