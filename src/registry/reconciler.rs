use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::registry::events::Event;
use crate::registry::notices::{BoundedLog, Notice};
use crate::registry::Registry;

/// Single writer of the [`Registry`].
///
/// Events are applied one at a time in the order they are received.
/// Updates carry no sequence number, so a late delivery for a device can
/// overwrite a newer one.
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: Registry,
    notices: BoundedLog<Notice>,
}

impl Reconciler {
    pub fn new(diagnostics_capacity: usize, notices_capacity: usize) -> Self {
        Self {
            registry: Registry::new(diagnostics_capacity),
            notices: BoundedLog::new(notices_capacity),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.registry.diagnostics_capacity,
            config.registry.notices_capacity,
        )
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn notices(&self) -> &BoundedLog<Notice> {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    pub fn notify(&mut self, notice: Notice) {
        debug!("Notice {:?}: {}", notice.kind, notice.message);
        self.notices.push(notice);
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::DeviceSet(devices) => self.registry.apply_device_set_snapshot(devices),
            Event::DeviceStatus(statuses) => self.registry.apply_device_status_update(statuses),
            Event::PlugStates(states) => self.registry.apply_plug_states_update(states),
            Event::ErrorNotice(message) => {
                warn!("Backend error: {}", message);
                self.notify(Notice::error(message));
            }
        }
    }

    /// Applies events until every sender is dropped.
    pub async fn run(&mut self, events: &mut mpsc::Receiver<Event>) {
        let mut applied = 0usize;
        while let Some(event) = events.recv().await {
            self.handle(event);
            applied += 1;
        }
        info!("Event stream closed after {} event(s)", applied);
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
