//! Channel-oriented editing of a device's configuration.
//!
//! On the wire a [`DeviceConfig`] keeps ports and default values in two
//! index-aligned arrays. While editing, channels are held as a single list of
//! [`ChannelSetting`] records so the two can never drift apart; the parallel
//! form is produced again only when the config is sent back.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{check_range, ValidationError};
use crate::models::device::{DeviceConfig, DeviceInfo};
use crate::models::{PortValue, DEFAULT_PLUG_VALUE, PERCENT_MAX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSetting {
    pub port: u8,
    pub default_value: PortValue,
}

impl ChannelSetting {
    pub fn new(default_value: PortValue) -> Self {
        Self {
            port: 0,
            default_value,
        }
    }
}

/// Zips ports with their default values. Missing default values are filled
/// with [`DEFAULT_PLUG_VALUE`]; extra ones are ignored.
pub fn to_channel_list(config: &DeviceConfig) -> Vec<ChannelSetting> {
    config
        .ports
        .iter()
        .enumerate()
        .map(|(index, port)| ChannelSetting {
            port: *port,
            default_value: config
                .default_values
                .get(index)
                .copied()
                .unwrap_or(DEFAULT_PLUG_VALUE),
        })
        .collect()
}

/// Unzips `channels` back into `config`, keeping every other field.
pub fn from_channel_list(config: &DeviceConfig, channels: &[ChannelSetting]) -> DeviceConfig {
    let (ports, default_values): (Vec<u8>, Vec<PortValue>) = channels
        .iter()
        .map(|channel| (channel.port, channel.default_value))
        .unzip();

    DeviceConfig {
        ports,
        default_values,
        ..config.clone()
    }
}

/// One edit of a single channel field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelField {
    Port(u8),
    DefaultValue(PortValue),
}

impl ChannelField {
    /// Parses raw user input for the field named `field` (`port` or
    /// `default_value`).
    pub fn parse(field: &str, input: &str) -> Result<Self, ValidationError> {
        match field {
            "port" => {
                let port = parse_integer("port", input)?;
                check_range("port", port as f32, 0.0, u8::MAX as f32)?;
                Ok(ChannelField::Port(port as u8))
            }
            "default_value" => {
                let value = parse_integer("default_value", input)?;
                check_range("default_value", value as f32, 0.0, PERCENT_MAX)?;
                Ok(ChannelField::DefaultValue(value as PortValue))
            }
            other => Err(ValidationError::UnknownField(other.to_string())),
        }
    }
}

fn parse_integer(field: &'static str, input: &str) -> Result<i64, ValidationError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::MalformedNumber {
            field,
            input: input.to_string(),
        })
}

/// Editable channel list of one device, bounded by the board's port count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    base: DeviceConfig,
    channels: Vec<ChannelSetting>,
    max_ports: u8,
    default_value: PortValue,
}

impl ChannelLayout {
    pub fn new(config: &DeviceConfig, info: &DeviceInfo) -> Self {
        Self {
            base: config.clone(),
            channels: to_channel_list(config),
            max_ports: info.max_ports,
            default_value: DEFAULT_PLUG_VALUE,
        }
    }

    /// Default value given to channels created by [`ChannelLayout::add_channel`].
    pub fn with_default_value(mut self, default_value: PortValue) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn channels(&self) -> &[ChannelSetting] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn max_ports(&self) -> u8 {
        self.max_ports
    }

    pub fn is_full(&self) -> bool {
        self.channels.len() >= self.max_ports as usize
    }

    pub fn update_time(&self) -> u64 {
        self.base.update_time
    }

    pub fn set_update_time(&mut self, update_time: u64) {
        self.base.update_time = update_time;
    }

    /// Appends a default channel. Does nothing once the board's port count is
    /// reached; no error is reported.
    pub fn add_channel(&mut self) {
        if self.is_full() {
            debug!(
                "Channel limit of {} reached, add ignored",
                self.max_ports
            );
            return;
        }
        self.channels.push(ChannelSetting::new(self.default_value));
    }

    /// Panics if `index` is out of range.
    pub fn edit_channel(&mut self, index: usize, field: ChannelField) {
        assert!(
            index < self.channels.len(),
            "channel {index} out of range ({} channels)",
            self.channels.len()
        );
        let channel = &mut self.channels[index];
        match field {
            ChannelField::Port(port) => channel.port = port,
            ChannelField::DefaultValue(value) => channel.default_value = value,
        }
    }

    /// Panics if `index` is out of range.
    pub fn remove_channel(&mut self, index: usize) {
        assert!(
            index < self.channels.len(),
            "channel {index} out of range ({} channels)",
            self.channels.len()
        );
        self.channels.remove(index);
    }

    /// Wire form of the edited config.
    pub fn to_config(&self) -> DeviceConfig {
        from_channel_list(&self.base, &self.channels)
    }
}
