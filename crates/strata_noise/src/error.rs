use thiserror::Error;

/// Rejected octave configuration. Raised at construction, never while sampling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoiseConfigError {
    #[error("at least one octave is required")]
    NoOctaves,
    #[error("{name} has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{name}[{index}] is not finite: {value}")]
    NonFinite {
        name: &'static str,
        index: usize,
        value: f64,
    },
    #[error("amplitudes normalise to zero")]
    DegenerateAmplitudes,
}

pub(crate) fn check_length(
    name: &'static str,
    values: &[f64],
    expected: usize,
) -> Result<(), NoiseConfigError> {
    if values.len() != expected {
        return Err(NoiseConfigError::LengthMismatch {
            name,
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_finite(name: &'static str, values: &[f64]) -> Result<(), NoiseConfigError> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(NoiseConfigError::NonFinite {
            name,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}
