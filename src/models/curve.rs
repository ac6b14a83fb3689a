use serde::{Deserialize, Serialize};

use crate::codec::{deserialize_non_negative, deserialize_percent};
use crate::error::{check_range, ValidationError};
use crate::models::PERCENT_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub temp: f32,
    #[serde(deserialize_with = "deserialize_percent")]
    pub value: f32,
}

impl Default for CurvePoint {
    fn default() -> Self {
        Self {
            temp: 50.0,
            value: 50.0,
        }
    }
}

impl CurvePoint {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.temp.is_finite() {
            return Err(ValidationError::MalformedNumber {
                field: "temp",
                input: self.temp.to_string(),
            });
        }
        check_range("value", self.value, 0.0, PERCENT_MAX)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeadAreaVariant {
    #[default]
    Min,
    Max,
    Center,
}

/// Temperature band in which the curve output is overridden.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeadArea {
    #[serde(deserialize_with = "deserialize_percent")]
    pub min_value: f32,
    #[serde(deserialize_with = "deserialize_percent")]
    pub max_value: f32,
    pub variant: DeadAreaVariant,
}

impl DeadArea {
    pub fn contains(&self, temperature: f32) -> bool {
        temperature >= self.min_value && temperature <= self.max_value
    }

    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        check_range("min_value", self.min_value, 0.0, PERCENT_MAX)?;
        check_range("max_value", self.max_value, 0.0, PERCENT_MAX)?;
        if self.min_value > self.max_value {
            return Err(ValidationError::InvertedDeadArea {
                index,
                min: self.min_value,
                max: self.max_value,
            });
        }
        Ok(())
    }
}

/// Hysteresis parameters of the cool holder latch. `holding_time` is in
/// milliseconds, the deltas in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoolHolderConfig {
    pub holding_time: u64,
    #[serde(deserialize_with = "deserialize_non_negative")]
    pub on_delta: f32,
    #[serde(deserialize_with = "deserialize_non_negative")]
    pub off_delta: f32,
}

impl CoolHolderConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("on_delta", self.on_delta, 0.0, f32::MAX)?;
        check_range("off_delta", self.off_delta, 0.0, f32::MAX)?;
        Ok(())
    }
}
