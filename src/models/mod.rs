pub mod curve;
pub mod device;
pub mod plug;
pub mod sensor;

/// Output level of a channel, in percent.
pub type PortValue = u8;

pub const PERCENT_MAX: f32 = 100.0;

/// Default output assigned to a channel that has no explicit default value.
pub const DEFAULT_PLUG_VALUE: PortValue = 100;

/// Milliseconds between two device refreshes for a freshly created config.
pub const DEFAULT_UPDATE_TIME: u64 = 120;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
