use indexmap::IndexMap;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::models::device::{Device, DeviceStatus};
use crate::models::plug::PlugState;

/// Push event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum Event {
    /// Full set of registered devices.
    #[serde(rename = "devices_update")]
    DeviceSet(IndexMap<String, Device>),
    #[serde(rename = "device_state_update")]
    DeviceStatus(HashMap<String, DeviceStatus>),
    #[serde(rename = "plugs_states_update")]
    PlugStates(HashMap<String, Vec<Option<PlugState>>>),
    #[serde(rename = "error")]
    ErrorNotice(String),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::DeviceSet(_) => "devices_update",
            Event::DeviceStatus(_) => "device_state_update",
            Event::PlugStates(_) => "plugs_states_update",
            Event::ErrorNotice(_) => "error",
        }
    }
}

/// Reads one JSON event per line and forwards it, in order, to `events`.
///
/// Lines that fail to decode are forwarded as an [`Event::ErrorNotice`].
/// Returns the number of lines read once the reader is exhausted or the
/// receiving side is gone.
pub async fn forward_json_lines<R>(reader: R, events: mpsc::Sender<Event>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        count += 1;

        let event = match serde_json::from_str::<Event>(line) {
            Ok(event) => {
                debug!("Received {} event", event.name());
                event
            }
            Err(e) => {
                error!("Malformed event on line {}: {}", count, e);
                Event::ErrorNotice(format!("Malformed event: {}", e))
            }
        };

        if events.send(event).await.is_err() {
            debug!("Event receiver closed, stop reading");
            break;
        }
    }

    Ok(count)
}
