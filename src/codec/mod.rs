//! Serialization rules at the process boundary.
//!
//! Percent values are range-checked as they are decoded, so an out-of-range
//! number coming from the backend never reaches the model. The plug handler
//! payload splits a [`PlugConfig`] into the sensor binding and the control
//! contract, the way the backend stores them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::check_range;
use crate::models::curve::{CoolHolderConfig, CurvePoint, DeadArea};
use crate::models::plug::PlugConfig;
use crate::models::sensor::Sensor;
use crate::models::{PortValue, PERCENT_MAX};

pub(crate) fn deserialize_percent<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    check_range("percent", value, 0.0, PERCENT_MAX).map_err(D::Error::custom)
}

pub(crate) fn deserialize_port_value<'de, D>(deserializer: D) -> Result<PortValue, D::Error>
where
    D: Deserializer<'de>,
{
    let value = PortValue::deserialize(deserializer)?;
    check_range("port value", value as f32, 0.0, PERCENT_MAX).map_err(D::Error::custom)?;
    Ok(value)
}

pub(crate) fn deserialize_port_values<'de, D>(deserializer: D) -> Result<Vec<PortValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<PortValue>::deserialize(deserializer)?;
    for value in &values {
        check_range("default value", *value as f32, 0.0, PERCENT_MAX).map_err(D::Error::custom)?;
    }
    Ok(values)
}

pub(crate) fn deserialize_non_negative<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    check_range("delta", value, 0.0, f32::MAX).map_err(D::Error::custom)
}

/// Control contract of one channel as the backend stores it, without the sensor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlugConfigPayload {
    #[serde(default)]
    pub curve: Vec<CurvePoint>,
    #[serde(default)]
    pub dead_areas: Vec<DeadArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cool_holder: Option<CoolHolderConfig>,
}

/// Response of the channel config fetch. The backend answers `null` for a
/// channel that has never been configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlugHandlerPayload {
    pub sensor: Sensor,
    pub plug_config: PlugConfigPayload,
}

impl From<PlugHandlerPayload> for PlugConfig {
    fn from(payload: PlugHandlerPayload) -> Self {
        let PlugConfigPayload {
            curve,
            dead_areas,
            cool_holder,
        } = payload.plug_config;
        Self {
            sensor: Some(payload.sensor),
            curve,
            dead_areas,
            cool_holder,
        }
    }
}

impl From<&PlugConfig> for PlugConfigPayload {
    fn from(config: &PlugConfig) -> Self {
        Self {
            curve: config.curve.clone(),
            dead_areas: config.dead_areas.clone(),
            cool_holder: config.cool_holder,
        }
    }
}

/// Decodes a fetched channel config, mapping "never configured" to an empty one.
pub fn decode_plug_config(payload: Option<PlugHandlerPayload>) -> PlugConfig {
    payload.map(PlugConfig::from).unwrap_or_default()
}
