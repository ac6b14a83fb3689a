//! Canonical store of registered devices and their live telemetry.
//!
//! The registry is written only through whole-value replacement driven by
//! push events (see [`Reconciler`]). Readers get shared references and never
//! observe a partially applied update.

pub mod events;
pub mod notices;
pub mod reconciler;

use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashMap;

use crate::models::device::{Device, DeviceStatus};
use crate::models::plug::{plug_state_display, PlugState};
use notices::{BoundedLog, Diagnostic};

pub use events::Event;
pub use reconciler::Reconciler;

pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 64;

static HEALTHY: DeviceStatus = DeviceStatus::Ok;

#[derive(Debug, Clone)]
pub struct Registry {
    devices: IndexMap<String, Device>,
    statuses: HashMap<String, DeviceStatus>,
    plug_states: HashMap<String, Vec<Option<PlugState>>>,
    diagnostics: BoundedLog<Diagnostic>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTICS_CAPACITY)
    }
}

impl Registry {
    /// Empty registry keeping at most `diagnostics_capacity` diagnostics.
    pub fn new(diagnostics_capacity: usize) -> Self {
        Self {
            devices: IndexMap::new(),
            statuses: HashMap::new(),
            plug_states: HashMap::new(),
            diagnostics: BoundedLog::new(diagnostics_capacity),
        }
    }

    /// Replaces the whole registry with `devices`. Status and live state of
    /// devices missing from the snapshot are dropped with them.
    pub fn apply_device_set_snapshot(&mut self, devices: IndexMap<String, Device>) {
        debug!("Device snapshot with {} device(s)", devices.len());
        self.statuses.retain(|id, _| devices.contains_key(id));
        self.plug_states.retain(|id, _| devices.contains_key(id));
        self.devices = devices;
    }

    /// Replaces the status of every listed device, leaving the others as they were.
    pub fn apply_device_status_update(&mut self, statuses: HashMap<String, DeviceStatus>) {
        for (id, status) in statuses {
            if !self.devices.contains_key(&id) {
                self.record_unknown(&id, "status update");
                continue;
            }
            debug!("Device {} {}", id, status.display());
            self.statuses.insert(id, status);
        }
    }

    /// Replaces the live state array of every listed device.
    pub fn apply_plug_states_update(&mut self, states: HashMap<String, Vec<Option<PlugState>>>) {
        for (id, plug_states) in states {
            if !self.devices.contains_key(&id) {
                self.record_unknown(&id, "plug states update");
                continue;
            }
            self.plug_states.insert(id, plug_states);
        }
    }

    /// Drops a device and its ephemeral entries after it was removed on the backend.
    pub fn forget(&mut self, id: &str) -> Option<Device> {
        self.statuses.remove(id);
        self.plug_states.remove(id);
        self.devices.shift_remove(id)
    }

    fn record_unknown(&mut self, id: &str, what: &str) {
        warn!("Dropping {} for unknown device {}", what, id);
        self.diagnostics
            .push(Diagnostic::new(id, format!("Dropped {what} for unknown device")));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = (&String, &Device)> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Status of a registered device; devices without a reported status are healthy.
    pub fn status(&self, id: &str) -> Option<&DeviceStatus> {
        if !self.contains(id) {
            return None;
        }
        Some(self.statuses.get(id).unwrap_or(&HEALTHY))
    }

    pub fn plug_states(&self, id: &str) -> Option<&[Option<PlugState>]> {
        self.plug_states.get(id).map(Vec::as_slice)
    }

    pub fn diagnostics(&self) -> &BoundedLog<Diagnostic> {
        &self.diagnostics
    }

    /// One line per device, followed by one line per channel.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (id, device) in &self.devices {
            let status = self.status(id).map(DeviceStatus::display).unwrap_or_default();
            lines.push(format!(
                "{} ({}, {} channel(s)) {}",
                id,
                device.info.board_name,
                device.config.ports.len(),
                status
            ));
            if let Some(states) = self.plug_states(id) {
                for (index, state) in states.iter().enumerate() {
                    lines.push(format!("  {}", plug_state_display(index, state.as_ref())));
                }
            }
        }
        lines
    }
}
