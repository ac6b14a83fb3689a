use log::{debug, error, info, warn};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::channels::ChannelLayout;
use crate::client::*;
use crate::codec::{decode_plug_config, PlugConfigPayload, PlugHandlerPayload};
use crate::config::AppConfig;
use crate::error::{CallError, ValidationError};
use crate::models::device::{DeviceConfig, DeviceInfo, DeviceStatus, PortInfo, SerialConnection};
use crate::models::plug::{PlugConfig, PlugState};
use crate::models::sensor::SensorCatalog;
use crate::models::PortValue;
use crate::registry::notices::{CoreMessage, Notice};
use crate::registry::{Event, Reconciler, Registry};

/// Handle of an open channel settings view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlugViewTicket(u64);

/// Device being set up, before it is added to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDraft {
    pub connection: SerialConnection,
    pub info: DeviceInfo,
    pub layout: ChannelLayout,
}

impl DeviceDraft {
    pub fn config(&self) -> DeviceConfig {
        self.layout.to_config()
    }
}

#[derive(Debug, Clone)]
struct PlugView {
    device_id: String,
    index: usize,
    config: Option<PlugConfig>,
}

/// Issues backend commands and folds their results into the local state.
///
/// A failed call is logged, surfaced as an error notice and returned as
/// [`CallError::Backend`]; nothing local is modified in that case.
pub struct DeviceService<B> {
    backend: B,
    reconciler: Reconciler,
    baud_rate: u32,
    update_time: u64,
    default_plug_value: PortValue,
    views: HashMap<PlugViewTicket, PlugView>,
    next_ticket: u64,
}

impl<B: Backend> DeviceService<B> {
    pub fn new(backend: B, config: &AppConfig) -> Self {
        Self::with_reconciler(backend, config, Reconciler::from_config(config))
    }

    pub fn with_reconciler(backend: B, config: &AppConfig, reconciler: Reconciler) -> Self {
        Self {
            backend,
            reconciler,
            baud_rate: config.serial.baud_rate,
            update_time: config.device.update_time,
            default_plug_value: config.device.default_plug_value,
            views: HashMap::new(),
            next_ticket: 0,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.reconciler
    }

    pub fn registry(&self) -> &Registry {
        self.reconciler.registry()
    }

    /// Applies a push event, then closes views whose device disappeared.
    pub fn handle_event(&mut self, event: Event) {
        self.reconciler.handle(event);
        let registry = self.reconciler.registry();
        self.views.retain(|ticket, view| {
            let keep = registry.contains(&view.device_id);
            if !keep {
                debug!("Closing plug view {:?} of vanished device {}", ticket, view.device_id);
            }
            keep
        });
    }

    async fn call<T: DeserializeOwned>(&mut self, command: &str, args: Value) -> Result<T, CallError> {
        debug!("Calling {} with {}", command, args);
        let result = self.backend.invoke(command, args).await.and_then(|value| {
            serde_json::from_value(value)
                .map_err(|e| format!("Invalid response to {}: {}", command, e))
        });

        result.map_err(|message| {
            error!("{} failed: {}", command, message);
            self.reconciler.notify(Notice::error(message.clone()));
            CallError::Backend(message)
        })
    }

    pub async fn list_connections(&mut self) -> Result<Vec<PortInfo>, CallError> {
        self.call(GET_DEVICE_LIST, json!({})).await
    }

    /// Connection on `com_port` with the configured baud rate.
    pub fn new_connection(&self, com_port: impl Into<String>) -> SerialConnection {
        SerialConnection {
            com_port: com_port.into(),
            baud_rate: self.baud_rate,
        }
    }

    /// Queries the board behind `connection` and seeds a draft from the
    /// config it currently holds.
    pub async fn identify(&mut self, connection: SerialConnection) -> Result<DeviceDraft, CallError> {
        let info: DeviceInfo = self
            .call(LOAD_DEVICE_INFO, json!({ "serialInfo": &connection }))
            .await?;
        info!(
            "Found {} on {} with {} port(s)",
            info.board_name, connection.com_port, info.max_ports
        );
        let config = self.load_config(DeviceTarget::Connection(&connection)).await?;
        let layout = ChannelLayout::new(&config, &info).with_default_value(self.default_plug_value);
        Ok(DeviceDraft {
            connection,
            info,
            layout,
        })
    }

    /// Replaces the draft's channels with the board's factory defaults.
    pub async fn reset_draft(&mut self, draft: &mut DeviceDraft) -> Result<(), CallError> {
        let config = self
            .load_default_config(DeviceTarget::Connection(&draft.connection))
            .await?;
        draft.layout = ChannelLayout::new(&config, &draft.info).with_default_value(self.default_plug_value);
        Ok(())
    }

    /// Adds the drafted device. The registry picks it up from the next device
    /// snapshot.
    pub async fn commit_draft(&mut self, draft: &DeviceDraft) -> Result<(), CallError> {
        let args = json!({
            "serialInfo": &draft.connection,
            "deviceConfig": draft.config(),
        });
        self.call::<IgnoredAny>(ADD_DEVICE, args).await?;
        info!("Added device on {}", draft.connection.com_port);
        Ok(())
    }

    pub async fn load_config(&mut self, target: DeviceTarget<'_>) -> Result<DeviceConfig, CallError> {
        let (command, args) = target.config_request();
        self.call(command, args).await
    }

    pub async fn load_default_config(
        &mut self,
        target: DeviceTarget<'_>,
    ) -> Result<DeviceConfig, CallError> {
        let (command, args) = target.default_config_request();
        self.call(command, args).await
    }

    /// Editable layout of a registered device, loaded from the device itself.
    pub async fn edit_layout(&mut self, id: &str) -> Result<ChannelLayout, CallError> {
        let info = self
            .registry()
            .device(id)
            .map(|device| device.info.clone())
            .ok_or_else(|| CallError::UnknownDevice(id.to_string()))?;
        let config = self.load_config(DeviceTarget::Registered(id)).await?;
        Ok(ChannelLayout::new(&config, &info).with_default_value(self.default_plug_value))
    }

    /// Empty config for a board nothing could be loaded from.
    pub fn blank_config(&self) -> DeviceConfig {
        DeviceConfig::empty(self.update_time)
    }

    pub async fn update_device_config(&mut self, id: &str, config: &DeviceConfig) -> Result<(), CallError> {
        self.call::<IgnoredAny>(UPDATE_DEVICE_CONFIG, json!({ "id": id, "deviceConfig": config }))
            .await?;
        info!("Updated config of {}", id);
        Ok(())
    }

    /// Removes the device on the backend, then drops it locally along with
    /// its open views.
    pub async fn remove_device(&mut self, id: &str) -> Result<(), CallError> {
        self.call::<IgnoredAny>(REMOVE_DEVICE, json!({ "id": id })).await?;
        self.reconciler.registry_mut().forget(id);
        self.views.retain(|_, view| view.device_id != id);
        info!("Removed device {}", id);
        Ok(())
    }

    pub async fn refresh_status(&mut self, id: &str) -> Result<DeviceStatus, CallError> {
        let status: DeviceStatus = self.call(GET_DEVICE_STATUS, json!({ "deviceId": id })).await?;
        self.reconciler
            .registry_mut()
            .apply_device_status_update(HashMap::from([(id.to_string(), status.clone())]));
        Ok(status)
    }

    pub async fn refresh_plug_states(&mut self, id: &str) -> Result<Vec<Option<PlugState>>, CallError> {
        let states: Vec<Option<PlugState>> =
            self.call(GET_PLUG_STATES, json!({ "deviceId": id })).await?;
        self.reconciler
            .registry_mut()
            .apply_plug_states_update(HashMap::from([(id.to_string(), states.clone())]));
        Ok(states)
    }

    pub async fn sensors(&mut self) -> Result<SensorCatalog, CallError> {
        self.call(GET_SENSORS, json!({})).await
    }

    /// Moves the backend's startup messages into the notice log.
    pub async fn pull_core_messages(&mut self) -> Result<usize, CallError> {
        let messages: Vec<CoreMessage> = self.call(GET_CORE_MESSAGES, json!({})).await?;
        let count = messages.len();
        for message in messages {
            self.reconciler.notify(message.into());
        }
        Ok(count)
    }

    /// Opens the settings view of one channel. An earlier view of the same
    /// channel is superseded and its ticket goes stale.
    pub fn open_plug_view(&mut self, device_id: &str, index: usize) -> PlugViewTicket {
        self.views
            .retain(|_, view| !(view.device_id == device_id && view.index == index));
        let ticket = PlugViewTicket(self.next_ticket);
        self.next_ticket += 1;
        self.views.insert(
            ticket,
            PlugView {
                device_id: device_id.to_string(),
                index,
                config: None,
            },
        );
        ticket
    }

    pub fn close_plug_view(&mut self, ticket: PlugViewTicket) -> bool {
        self.views.remove(&ticket).is_some()
    }

    pub fn is_open(&self, ticket: PlugViewTicket) -> bool {
        self.views.contains_key(&ticket)
    }

    /// Loaded config of an open view; `None` until it has been loaded.
    pub fn plug_view(&self, ticket: PlugViewTicket) -> Option<&PlugConfig> {
        self.views.get(&ticket).and_then(|view| view.config.as_ref())
    }

    pub fn plug_view_mut(&mut self, ticket: PlugViewTicket) -> Option<&mut PlugConfig> {
        self.views.get_mut(&ticket).and_then(|view| view.config.as_mut())
    }

    pub async fn fetch_plug_config(&mut self, device_id: &str, index: usize) -> Result<PlugConfig, CallError> {
        let payload: Option<PlugHandlerPayload> = self
            .call(
                GET_PLUG_HANDLER_CONFIG,
                json!({ "deviceId": device_id, "plugIndex": index }),
            )
            .await?;
        Ok(decode_plug_config(payload))
    }

    /// Stores a fetched config in its view. A closed view or a device that is
    /// no longer registered leaves everything as it is.
    pub fn apply_plug_config(&mut self, ticket: PlugViewTicket, config: PlugConfig) -> Result<(), CallError> {
        let registry = self.reconciler.registry();
        let Some(view) = self.views.get_mut(&ticket) else {
            debug!("Dropping plug config for closed view {:?}", ticket);
            return Err(CallError::Stale(format!("{:?}", ticket)));
        };
        if !registry.contains(&view.device_id) {
            debug!("Dropping plug config for removed device {}", view.device_id);
            let device_id = view.device_id.clone();
            self.views.remove(&ticket);
            return Err(CallError::Stale(device_id));
        }
        view.config = Some(config);
        Ok(())
    }

    pub async fn load_plug_view(&mut self, ticket: PlugViewTicket) -> Result<(), CallError> {
        let (device_id, index) = match self.views.get(&ticket) {
            Some(view) => (view.device_id.clone(), view.index),
            None => return Err(CallError::Stale(format!("{:?}", ticket))),
        };
        let config = self.fetch_plug_config(&device_id, index).await?;
        self.apply_plug_config(ticket, config)
    }

    /// Validates the view's config and sends it together with its sensor.
    pub async fn save_plug_view(&mut self, ticket: PlugViewTicket) -> Result<(), CallError> {
        let view = self
            .views
            .get(&ticket)
            .ok_or_else(|| CallError::Stale(format!("{:?}", ticket)))?;
        let config = view.config.clone().unwrap_or_default();
        let (device_id, index) = (view.device_id.clone(), view.index);

        let sensor = match config.validate().and(config.sensor.clone().ok_or(ValidationError::UnboundSensor)) {
            Ok(sensor) => sensor,
            Err(e) => {
                warn!("Rejected plug {} config of {}: {}", index, device_id, e);
                self.reconciler.notify(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        let args = json!({
            "deviceId": device_id,
            "plugIndex": index,
            "plugConfig": PlugConfigPayload::from(&config),
            "sensorId": sensor,
        });
        self.call::<IgnoredAny>(SET_PLUG_HANDLER_CONFIG, args).await?;
        info!("Saved plug {} config of {}", index, device_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelField;
    use crate::models::curve::CurvePoint;
    use crate::models::sensor::{Sensor, SensorKind};
    use crate::registry::notices::NoticeKind;
    use crate::registry::tests::device;
    use indexmap::IndexMap;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBackend {
        responses: HashMap<&'static str, Result<Value, String>>,
        calls: RefCell<Vec<(String, Value)>>,
    }

    impl FakeBackend {
        fn respond(mut self, command: &'static str, response: Result<Value, String>) -> Self {
            self.responses.insert(command, response);
            self
        }

        fn last_call(&self, command: &str) -> Option<Value> {
            self.calls
                .borrow()
                .iter()
                .rev()
                .find(|(name, _)| name == command)
                .map(|(_, args)| args.clone())
        }
    }

    impl Backend for FakeBackend {
        async fn invoke(&self, command: &str, args: Value) -> Result<Value, String> {
            self.calls.borrow_mut().push((command.to_string(), args));
            self.responses
                .get(command)
                .cloned()
                .unwrap_or_else(|| Err(format!("Unhandled command {command}")))
        }
    }

    fn service(backend: FakeBackend) -> DeviceService<FakeBackend> {
        DeviceService::new(backend, &AppConfig::default())
    }

    fn with_devices(mut service: DeviceService<FakeBackend>, ids: &[&str]) -> DeviceService<FakeBackend> {
        let devices: IndexMap<String, _> = ids.iter().map(|id| (id.to_string(), device(id))).collect();
        service.handle_event(Event::DeviceSet(devices));
        service
    }

    #[tokio::test]
    async fn test_add_device_wizard() {
        let backend = FakeBackend::default()
            .respond(LOAD_DEVICE_INFO, Ok(json!({"board_name": "rp2040", "max_ports": 2})))
            .respond(
                LOAD_DEVICE_CONFIG,
                Ok(json!({"ports": [25], "default_values": [], "update_time": 60})),
            )
            .respond(ADD_DEVICE, Ok(Value::Null));
        let mut service = service(backend);

        let connection = service.new_connection("COM3");
        assert_eq!(connection.baud_rate, 115_200);

        let mut draft = service.identify(connection).await.unwrap();
        assert_eq!(draft.layout.len(), 1);
        draft.layout.add_channel();
        draft.layout.add_channel();
        draft.layout.edit_channel(1, ChannelField::Port(26));
        assert_eq!(draft.layout.len(), 2);

        service.commit_draft(&draft).await.unwrap();
        let args = service.backend.last_call(ADD_DEVICE).unwrap();
        assert_eq!(args["serialInfo"]["com_port"], "COM3");
        assert_eq!(
            args["deviceConfig"],
            json!({"ports": [25, 26], "default_values": [100, 100], "update_time": 60})
        );
    }

    #[tokio::test]
    async fn test_failed_call_leaves_state_untouched() {
        let backend = FakeBackend::default().respond(GET_DEVICE_STATUS, Err("Port busy".into()));
        let mut service = with_devices(service(backend), &["COM3"]);

        let err = service.refresh_status("COM3").await.unwrap_err();
        assert_eq!(err, CallError::Backend("Port busy".into()));
        assert_eq!(service.registry().status("COM3"), Some(&DeviceStatus::Ok));

        let notice = service.reconciler().notices().latest().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Port busy");
    }

    #[tokio::test]
    async fn test_malformed_response_is_a_backend_error() {
        let backend = FakeBackend::default().respond(
            GET_PLUG_STATES,
            Ok(json!([{"last_temp": 40.0, "plug_value": 150}])),
        );
        let mut service = with_devices(service(backend), &["COM3"]);

        assert!(matches!(
            service.refresh_plug_states("COM3").await,
            Err(CallError::Backend(_))
        ));
        assert_eq!(service.registry().plug_states("COM3"), None);
    }

    #[tokio::test]
    async fn test_refresh_applies_through_registry() {
        let backend = FakeBackend::default()
            .respond(GET_DEVICE_STATUS, Ok(json!({"Error": "Timeout"})))
            .respond(
                GET_PLUG_STATES,
                Ok(json!([{"last_temp": 41.5, "plug_value": 35}, null])),
            );
        let mut service = with_devices(service(backend), &["COM3"]);

        service.refresh_status("COM3").await.unwrap();
        assert_eq!(service.registry().status("COM3").unwrap().error_message(), "Timeout");
        assert_eq!(
            service.backend.last_call(GET_DEVICE_STATUS),
            Some(json!({"deviceId": "COM3"}))
        );

        service.refresh_plug_states("COM3").await.unwrap();
        let states = service.registry().plug_states("COM3").unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].unwrap().plug_value, 35);

        service.refresh_plug_states("ghost").await.unwrap();
        assert_eq!(service.registry().diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_device_forgets_it() {
        let backend = FakeBackend::default().respond(REMOVE_DEVICE, Ok(Value::Null));
        let mut service = with_devices(service(backend), &["COM3", "COM4"]);
        let ticket = service.open_plug_view("COM3", 0);

        service.remove_device("COM3").await.unwrap();
        assert!(!service.registry().contains("COM3"));
        assert!(service.registry().contains("COM4"));
        assert!(!service.is_open(ticket));
    }

    #[tokio::test]
    async fn test_plug_view_load_and_save() {
        let backend = FakeBackend::default()
            .respond(GET_PLUG_HANDLER_CONFIG, Ok(Value::Null))
            .respond(SET_PLUG_HANDLER_CONFIG, Ok(Value::Null));
        let mut service = with_devices(service(backend), &["COM3"]);

        let ticket = service.open_plug_view("COM3", 1);
        assert_eq!(service.plug_view(ticket), None);
        service.load_plug_view(ticket).await.unwrap();
        assert_eq!(service.plug_view(ticket), Some(&PlugConfig::default()));

        let config = service.plug_view_mut(ticket).unwrap();
        config.add_point();
        assert_eq!(
            service.save_plug_view(ticket).await,
            Err(CallError::Invalid(ValidationError::UnboundSensor))
        );
        assert!(service.backend.last_call(SET_PLUG_HANDLER_CONFIG).is_none());

        let config = service.plug_view_mut(ticket).unwrap();
        config.set_sensor(Some(Sensor::new(SensorKind::SysInfo, "k10temp Tctl")));
        config.edit_point(0, CurvePoint { temp: 60.0, value: 80.0 });
        service.save_plug_view(ticket).await.unwrap();

        let args = service.backend.last_call(SET_PLUG_HANDLER_CONFIG).unwrap();
        assert_eq!(args["deviceId"], "COM3");
        assert_eq!(args["plugIndex"], 1);
        assert_eq!(args["sensorId"], json!({"sensor_type": "SysInfo", "identifier": "k10temp Tctl"}));
        assert_eq!(
            args["plugConfig"],
            json!({"curve": [{"temp": 60.0, "value": 80.0}], "dead_areas": []})
        );
    }

    #[tokio::test]
    async fn test_late_response_is_a_no_op() {
        let backend = FakeBackend::default().respond(
            GET_PLUG_HANDLER_CONFIG,
            Ok(json!({
                "sensor": {"sensor_type": "Nvml", "identifier": "GPU 0"},
                "plug_config": {"curve": [], "dead_areas": []}
            })),
        );
        let mut service = with_devices(service(backend), &["COM3"]);

        let ticket = service.open_plug_view("COM3", 0);
        let fetched = service.fetch_plug_config("COM3", 0).await.unwrap();
        service.close_plug_view(ticket);
        assert!(matches!(
            service.apply_plug_config(ticket, fetched.clone()),
            Err(CallError::Stale(_))
        ));
        assert!(!service.is_open(ticket));

        let superseded = service.open_plug_view("COM3", 0);
        let current = service.open_plug_view("COM3", 0);
        assert!(service.apply_plug_config(superseded, fetched.clone()).is_err());
        assert!(service.apply_plug_config(current, fetched.clone()).is_ok());

        let ticket = service.open_plug_view("COM3", 1);
        service.reconciler_mut().registry_mut().forget("COM3");
        assert!(service.apply_plug_config(ticket, fetched).is_err());
        assert!(!service.registry().contains("COM3"));
        assert!(!service.is_open(ticket));
    }

    #[test]
    fn test_snapshot_closes_views_of_vanished_devices() {
        let mut service = with_devices(service(FakeBackend::default()), &["COM3", "COM4"]);
        let kept = service.open_plug_view("COM4", 0);
        let dropped = service.open_plug_view("COM3", 0);

        service.handle_event(Event::DeviceSet(IndexMap::from([("COM4".to_string(), device("COM4"))])));
        assert!(service.is_open(kept));
        assert!(!service.is_open(dropped));
    }

    #[tokio::test]
    async fn test_core_messages_become_notices() {
        let backend = FakeBackend::default().respond(
            GET_CORE_MESSAGES,
            Ok(json!([{"kind": "Warning", "message": "LHM not available"}])),
        );
        let mut service = service(backend);

        assert_eq!(service.pull_core_messages().await.unwrap(), 1);
        let notice = service.reconciler().notices().latest().unwrap();
        assert_eq!(notice.kind, NoticeKind::Warning);
    }

    #[tokio::test]
    async fn test_edit_layout_requires_registered_device() {
        let backend = FakeBackend::default().respond(
            LOAD_CONNECTED_DEVICE_CONFIG,
            Ok(json!({"ports": [25, 26], "default_values": [100, 50], "update_time": 120})),
        );
        let mut service = with_devices(service(backend), &["COM3"]);

        assert_eq!(
            service.edit_layout("COM9").await,
            Err(CallError::UnknownDevice("COM9".into()))
        );
        let layout = service.edit_layout("COM3").await.unwrap();
        assert_eq!(layout.channels()[1].default_value, 50);
        assert_eq!(service.blank_config().update_time, 120);
    }
}
