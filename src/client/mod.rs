//! Request/response side of the backend boundary.
//!
//! Every call goes through [`Backend::invoke`] with a command name and a JSON
//! object of named arguments. The backend answers with a JSON value or an
//! error message; it never faults across the boundary.

pub mod service;

use serde_json::{json, Value};

use crate::models::device::SerialConnection;

pub use service::{DeviceDraft, DeviceService, PlugViewTicket};

pub const GET_DEVICE_LIST: &str = "get_device_list";
pub const LOAD_DEVICE_INFO: &str = "load_device_info";
pub const LOAD_DEVICE_CONFIG: &str = "load_device_config";
pub const LOAD_CONNECTED_DEVICE_CONFIG: &str = "load_connected_device_config";
pub const LOAD_DEVICE_DEFAULT_CONFIG: &str = "load_device_default_config";
pub const LOAD_CONNECTED_DEVICE_DEFAULT_CONFIG: &str = "load_connected_device_default_config";
pub const ADD_DEVICE: &str = "add_device";
pub const REMOVE_DEVICE: &str = "remove_device";
pub const UPDATE_DEVICE_CONFIG: &str = "update_device_config";
pub const GET_DEVICE_STATUS: &str = "get_device_status";
pub const GET_CORE_MESSAGES: &str = "get_core_messages";
pub const GET_SENSORS: &str = "get_sensors";
pub const GET_PLUG_HANDLER_CONFIG: &str = "get_plug_handler_config";
pub const SET_PLUG_HANDLER_CONFIG: &str = "set_plug_handler_config";
pub const GET_PLUG_STATES: &str = "get_plug_states";

/// Transport the service issues its commands through.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, String>;
}

/// Which device a config request addresses: one still being set up, known
/// only by its serial endpoint, or one already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTarget<'a> {
    Connection(&'a SerialConnection),
    Registered(&'a str),
}

impl DeviceTarget<'_> {
    pub(crate) fn config_request(&self) -> (&'static str, Value) {
        match self {
            DeviceTarget::Connection(connection) => {
                (LOAD_DEVICE_CONFIG, json!({ "serialInfo": connection }))
            }
            DeviceTarget::Registered(id) => (LOAD_CONNECTED_DEVICE_CONFIG, json!({ "id": id })),
        }
    }

    pub(crate) fn default_config_request(&self) -> (&'static str, Value) {
        match self {
            DeviceTarget::Connection(connection) => {
                (LOAD_DEVICE_DEFAULT_CONFIG, json!({ "serialInfo": connection }))
            }
            DeviceTarget::Registered(id) => {
                (LOAD_CONNECTED_DEVICE_DEFAULT_CONFIG, json!({ "id": id }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_selects_command() {
        let connection = SerialConnection {
            com_port: "COM3".into(),
            baud_rate: 115200,
        };

        let (command, args) = DeviceTarget::Connection(&connection).config_request();
        assert_eq!(command, LOAD_DEVICE_CONFIG);
        assert_eq!(args["serialInfo"]["com_port"], "COM3");

        let (command, args) = DeviceTarget::Registered("COM3").default_config_request();
        assert_eq!(command, LOAD_CONNECTED_DEVICE_DEFAULT_CONFIG);
        assert_eq!(args, json!({"id": "COM3"}));
    }
}
