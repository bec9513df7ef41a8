//! Interface boundary for the wireless collaborator.
//!
//! The monitor does not know radio mechanics; it talks to a link in terms
//! of named channels that read, write, or notify integer values. The
//! channel names are owned by the device firmware and treated as opaque
//! here.

pub mod sim;

use std::time::Duration;

use anyhow::Result;

pub use sim::SimLink;

/// A discovered device handle, opaque to the monitor (an address on real
/// hardware).
pub type DeviceId = String;

/// The device's characteristic map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    CompostTempF,
    DeviceClock,
    AmbientTempF,
    CompostMoisture,
    MethanePpm,
    WaterLevel,
    VentControl,
    WaterValveControl,
    ScrapNotify,
}

impl Channel {
    /// Readable sensor channels, in read order.
    pub const READABLE: [Channel; 6] = [
        Channel::CompostTempF,
        Channel::DeviceClock,
        Channel::AmbientTempF,
        Channel::CompostMoisture,
        Channel::MethanePpm,
        Channel::WaterLevel,
    ];

    /// The wire name the transport collaborator resolves to a
    /// characteristic.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CompostTempF => "compostTempF",
            Self::DeviceClock => "datetime",
            Self::AmbientTempF => "ambientTempF",
            Self::CompostMoisture => "compostMoisture",
            Self::MethanePpm => "methanePPM",
            Self::WaterLevel => "waterLevel",
            Self::VentControl => "ventControl",
            Self::WaterValveControl => "waterValveControl",
            Self::ScrapNotify => "scrapNotify",
        }
    }
}

/// One wireless session endpoint. Every call may suspend but is bounded
/// by the implementation; all values on the wire are integers.
#[allow(async_fn_in_trait)]
pub trait SensorLink {
    /// Scan for a device advertising `device_name`. `None` means nothing
    /// answered, which is not an error.
    async fn discover(&mut self, device_name: &str) -> Result<Option<DeviceId>>;

    async fn connect(&mut self, device: &DeviceId) -> Result<()>;

    async fn read_channel(&mut self, channel: Channel) -> Result<i64>;

    async fn write_channel(&mut self, channel: Channel, value: i64) -> Result<()>;

    /// Register for notifications on `channel`.
    async fn subscribe(&mut self, channel: Channel) -> Result<()>;

    /// Wait up to `timeout` for the next notification value. `None`
    /// means the wait timed out with the link still healthy.
    async fn next_notification(&mut self, timeout: Duration) -> Result<Option<i64>>;

    async fn disconnect(&mut self) -> Result<()>;
}
