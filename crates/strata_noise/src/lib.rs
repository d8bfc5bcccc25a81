//! Lattice gradient noise, fractal composition and bounded column evaluation for terrain
//! density.

pub mod column;
#[cfg(feature = "serde")]
pub mod config;
mod error;
pub mod noise;

pub use column::{ColumnNoise, IncrementalColumnNoise, OctaveEntry};
#[cfg(feature = "serde")]
pub use config::{FractalNoiseConfig, OctaveLayout};
pub use error::NoiseConfigError;
pub use noise::curve::NoiseCurve;
pub use noise::fractal_noise::{FractalNoise, VALUE_MULTIPLIER};
pub use noise::simplex_octave::{MAX_SLOPE_3D, MAX_VALUE_2D, MAX_VALUE_3D, Orientation3D};
pub use noise::threshold::ThresholdMode;
