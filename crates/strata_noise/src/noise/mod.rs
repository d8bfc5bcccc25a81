pub mod curve;
pub mod fractal_noise;
pub mod simplex_octave;
pub mod threshold;
