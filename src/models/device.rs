use serde::{Deserialize, Serialize};

use crate::codec::deserialize_port_values;
use crate::models::{PortValue, DEFAULT_UPDATE_TIME};

/// Serial endpoint of a device that is not registered yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerialConnection {
    pub com_port: String,
    pub baud_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub board_name: String,
    pub max_ports: u8,
}

/// Channel assignment of one device as it crosses the boundary.
///
/// `ports` and `default_values` are index aligned; see
/// [`crate::channels::ChannelLayout`] for the record-oriented form used while
/// editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub ports: Vec<u8>,
    #[serde(deserialize_with = "deserialize_port_values")]
    pub default_values: Vec<PortValue>,
    pub update_time: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::empty(DEFAULT_UPDATE_TIME)
    }
}

impl DeviceConfig {
    pub fn empty(update_time: u64) -> Self {
        Self {
            ports: Vec::new(),
            default_values: Vec::new(),
            update_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "serial_info")]
    pub connection: SerialConnection,
    #[serde(rename = "device_info")]
    pub info: DeviceInfo,
    #[serde(rename = "device_config")]
    pub config: DeviceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceStatus {
    #[default]
    Ok,
    Error(String),
}

impl DeviceStatus {
    /// Empty for a healthy device.
    pub fn error_message(&self) -> &str {
        match self {
            DeviceStatus::Ok => "",
            DeviceStatus::Error(message) => message,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, DeviceStatus::Ok)
    }

    pub fn display(&self) -> String {
        match self {
            DeviceStatus::Ok => "Status: OK".to_string(),
            DeviceStatus::Error(e) => format!("Status: Error ({})", e),
        }
    }
}

/// Entry of the available connections list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_data: Option<String>,
}
