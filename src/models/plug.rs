use serde::{Deserialize, Serialize};

use crate::codec::deserialize_port_value;
use crate::error::ValidationError;
use crate::models::curve::{CoolHolderConfig, CurvePoint, DeadArea};
use crate::models::sensor::Sensor;
use crate::models::PortValue;

/// Control contract of one channel.
///
/// Lives only while the channel's settings view is open; the device keeps the
/// authoritative copy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlugConfig {
    #[serde(default)]
    pub sensor: Option<Sensor>,
    #[serde(default)]
    pub curve: Vec<CurvePoint>,
    #[serde(default)]
    pub dead_areas: Vec<DeadArea>,
    #[serde(default)]
    pub cool_holder: Option<CoolHolderConfig>,
}

impl PlugConfig {
    pub fn set_sensor(&mut self, sensor: Option<Sensor>) {
        self.sensor = sensor;
    }

    pub fn add_point(&mut self) {
        self.curve.push(CurvePoint::default());
    }

    pub fn edit_point(&mut self, index: usize, point: CurvePoint) {
        assert!(index < self.curve.len(), "curve point {index} out of range");
        self.curve[index] = point;
    }

    pub fn remove_point(&mut self, index: usize) {
        assert!(index < self.curve.len(), "curve point {index} out of range");
        self.curve.remove(index);
    }

    pub fn add_dead_area(&mut self) {
        self.dead_areas.push(DeadArea::default());
    }

    pub fn edit_dead_area(&mut self, index: usize, area: DeadArea) {
        assert!(index < self.dead_areas.len(), "dead area {index} out of range");
        self.dead_areas[index] = area;
    }

    pub fn remove_dead_area(&mut self, index: usize) {
        assert!(index < self.dead_areas.len(), "dead area {index} out of range");
        self.dead_areas.remove(index);
    }

    /// `None` disables the cool holder.
    pub fn set_cool_holder(&mut self, cool_holder: Option<CoolHolderConfig>) {
        self.cool_holder = cool_holder;
    }

    /// Checks every primitive range and reports the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for point in &self.curve {
            point.validate()?;
        }
        for (index, area) in self.dead_areas.iter().enumerate() {
            area.validate(index)?;
        }
        if let Some(cool_holder) = &self.cool_holder {
            cool_holder.validate()?;
        }
        Ok(())
    }
}

/// Telemetry snapshot of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlugState {
    pub last_temp: f32,
    #[serde(deserialize_with = "deserialize_port_value")]
    pub plug_value: PortValue,
}

/// One line of channel status, `index` is zero based.
pub fn plug_state_display(index: usize, state: Option<&PlugState>) -> String {
    match state {
        Some(s) => format!("Plug {}: {}°C / {}%", index + 1, s.last_temp, s.plug_value),
        None => format!("Plug {}: Not configured", index + 1),
    }
}
