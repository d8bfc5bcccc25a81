use crate::error::NoiseConfigError;
use crate::noise::curve::NoiseCurve;
use crate::noise::fractal_noise::{FractalNoise, default_octaves};
use crate::noise::simplex_octave::Orientation3D;
use crate::noise::threshold::ThresholdMode;
use serde::{Deserialize, Serialize};

/// Serialized form of a [`FractalNoise`].
///
/// ```json
/// { "seed": 1, "octaves": 6, "base_frequency": 0.004, "persistence": 0.5, "curve": "tanh" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FractalNoiseConfig {
    pub seed: i64,
    #[serde(flatten)]
    pub layout: OctaveLayout,
    #[serde(default)]
    pub curve: NoiseCurve,
    #[serde(default)]
    pub orientation: Orientation3D,
    #[serde(default)]
    pub thresholding: ThresholdMode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OctaveLayout {
    Explicit {
        amplitudes: Vec<f64>,
        frequencies: Vec<f64>,
    },
    Geometric {
        octaves: usize,
        base_frequency: f64,
        #[serde(default = "default_persistence")]
        persistence: f64,
    },
}

fn default_persistence() -> f64 {
    0.5
}

impl OctaveLayout {
    /// `(amplitudes, frequencies)`
    pub fn expand(&self) -> (Vec<f64>, Vec<f64>) {
        match self {
            OctaveLayout::Explicit {
                amplitudes,
                frequencies,
            } => (amplitudes.clone(), frequencies.clone()),
            OctaveLayout::Geometric {
                octaves,
                base_frequency,
                persistence,
            } => default_octaves(*octaves, *base_frequency, *persistence),
        }
    }
}

impl FractalNoiseConfig {
    pub fn build(&self) -> Result<FractalNoise, NoiseConfigError> {
        let (amplitudes, frequencies) = self.layout.expand();
        Ok(FractalNoise::try_new(&amplitudes, &frequencies, self.seed)?
            .with_curve(self.curve)
            .with_orientation(self.orientation)
            .with_threshold_mode(self.thresholding))
    }
}

impl TryFrom<FractalNoiseConfig> for FractalNoise {
    type Error = NoiseConfigError;

    fn try_from(config: FractalNoiseConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}

impl TryFrom<&FractalNoiseConfig> for FractalNoise {
    type Error = NoiseConfigError;

    fn try_from(config: &FractalNoiseConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}

#[cfg(test)]
mod test {
    use crate::config::{FractalNoiseConfig, OctaveLayout};
    use crate::error::NoiseConfigError;
    use crate::noise::curve::NoiseCurve;
    use crate::noise::fractal_noise::FractalNoise;
    use crate::noise::simplex_octave::Orientation3D;
    use crate::noise::threshold::ThresholdMode;

    #[test]
    fn default_layout() {
        let config: FractalNoiseConfig = serde_json::from_str(
            r#"{ "seed": 1, "octaves": 4, "base_frequency": 0.01, "persistence": 0.5 }"#,
        )
        .unwrap();
        assert_eq!(
            config.layout,
            OctaveLayout::Geometric {
                octaves: 4,
                base_frequency: 0.01,
                persistence: 0.5
            }
        );
        assert_eq!(config.curve, NoiseCurve::Algebraic);
        assert_eq!(config.orientation, Orientation3D::ImproveXZ);
        assert_eq!(config.thresholding, ThresholdMode::Hard);

        let noise = FractalNoise::try_from(config).unwrap();
        assert_eq!(noise, FractalNoise::from_default_octaves(4, 0.01, 0.5, 1));
    }

    #[test]
    fn explicit_layout() {
        let config: FractalNoiseConfig = serde_json::from_str(
            r#"{
                "seed": -7,
                "amplitudes": [1.0, 0.25],
                "frequencies": [0.5, 2.0],
                "curve": "tanh",
                "orientation": "fallback",
                "thresholding": { "mode": "smooth", "smoothing": 0.75 }
            }"#,
        )
        .unwrap();
        let noise = config.build().unwrap();
        assert_eq!(noise.seed(), -7);
        assert_eq!(noise.amplitudes(), &[1.0, 0.25]);
        assert_eq!(noise.frequencies(), &[0.5, 2.0]);
        assert_eq!(noise.curve(), NoiseCurve::Tanh);
        assert_eq!(noise.orientation(), Orientation3D::Fallback);
        assert_eq!(
            noise.threshold_mode(),
            ThresholdMode::Smooth { smoothing: 0.75 }
        );
    }

    #[test]
    fn orientation_names() {
        let config: FractalNoiseConfig = serde_json::from_str(
            r#"{ "seed": 3, "octaves": 2, "base_frequency": 0.1, "orientation": "improve_xz" }"#,
        )
        .unwrap();
        assert_eq!(config.orientation, Orientation3D::ImproveXZ);
        assert_eq!(
            serde_json::to_string(&Orientation3D::ImproveXZ).unwrap(),
            r#""improve_xz""#
        );
        assert_eq!(
            serde_json::to_string(&Orientation3D::Fallback).unwrap(),
            r#""fallback""#
        );
        assert!(serde_json::from_str::<Orientation3D>(r#""improve_x_z""#).is_err());
    }

    #[test]
    fn persistence_defaults() {
        let config: FractalNoiseConfig =
            serde_json::from_str(r#"{ "seed": 0, "octaves": 3, "base_frequency": 1.0 }"#).unwrap();
        assert_eq!(config.build().unwrap().amplitudes(), &[1.0, 0.5, 0.25]);
    }

    #[test]
    fn invalid_configs() {
        let config: FractalNoiseConfig = serde_json::from_str(
            r#"{ "seed": 0, "amplitudes": [1.0], "frequencies": [1.0, 2.0] }"#,
        )
        .unwrap();
        assert!(matches!(
            FractalNoise::try_from(&config),
            Err(NoiseConfigError::LengthMismatch { .. })
        ));

        let config: FractalNoiseConfig =
            serde_json::from_str(r#"{ "seed": 0, "octaves": 0, "base_frequency": 1.0 }"#).unwrap();
        assert_eq!(config.build(), Err(NoiseConfigError::NoOctaves));

        assert!(serde_json::from_str::<FractalNoiseConfig>(r#"{ "seed": 0 }"#).is_err());
        assert!(
            serde_json::from_str::<FractalNoiseConfig>(
                r#"{ "seed": 0, "octaves": 2, "base_frequency": 1.0, "curve": "cubic" }"#
            )
            .is_err()
        );
    }

    #[test]
    fn round_trip() {
        let config = FractalNoiseConfig {
            seed: 99,
            layout: OctaveLayout::Geometric {
                octaves: 5,
                base_frequency: 0.02,
                persistence: 0.6,
            },
            curve: NoiseCurve::Tanh,
            orientation: Orientation3D::ImproveXZ,
            thresholding: ThresholdMode::Smooth { smoothing: 2.0 },
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<FractalNoiseConfig>(&json).unwrap(), config);
    }
}
