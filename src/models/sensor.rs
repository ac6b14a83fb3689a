use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Provider family a temperature sensor comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Lhm,
    SysInfo,
    Nvml,
}

/// Opaque reference into the sensor catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sensor {
    pub sensor_type: SensorKind,
    pub identifier: String,
}

impl Sensor {
    pub fn new(sensor_type: SensorKind, identifier: impl Into<String>) -> Self {
        Self {
            sensor_type,
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorCatalog {
    pub sensors: IndexMap<SensorKind, Vec<String>>,
}

impl SensorCatalog {
    pub fn identifiers(&self, kind: SensorKind) -> &[String] {
        self.sensors.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, sensor: &Sensor) -> bool {
        self.identifiers(sensor.sensor_type)
            .iter()
            .any(|id| *id == sensor.identifier)
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.values().all(Vec::is_empty)
    }
}
