use thiserror::Error;

/// Rejections raised at the edit boundary, before a value reaches the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("{field} is not a valid number: {input:?}")]
    MalformedNumber { field: &'static str, input: String },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Dead area {index} has min {min} above max {max}")]
    InvertedDeadArea { index: usize, min: f32, max: f32 },

    #[error("No sensor selected")]
    UnboundSensor,
}

/// Failure of a request/response call against the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("{0}")]
    Backend(String),

    #[error("Response for {0} arrived after its view closed")]
    Stale(String),

    #[error("No such device: {0}")]
    UnknownDevice(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl CallError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub(crate) fn check_range(
    field: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<f32, ValidationError> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}
