// PowerMon - Sensor Errors

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// A reading was requested before the first sample was taken.
    #[error("Sensor '{id}' has no reading yet")]
    NoData { id: char },

    #[error("Sensor '{id}': current sensitivity must be non-zero")]
    ZeroSensitivity { id: char },

    #[error("Sensor '{id}': read interval must be non-zero")]
    ZeroInterval { id: char },

    #[error("Sensor '{id}': read interval {interval_ms} ms exceeds the clock's wrap window")]
    IntervalTooLong { id: char, interval_ms: u32 },

    #[error("Sensor '{id}': voltage and current both wired to ADC channel {channel}")]
    SharedChannel { id: char, channel: u8 },

    #[error("Sensor '{id}': ADC channel {channel} does not exist")]
    ChannelOutOfRange { id: char, channel: u8 },
}

impl SensorError {
    /// Id of the sensor the error concerns.
    pub fn sensor_id(&self) -> char {
        match *self {
            Self::NoData { id }
            | Self::ZeroSensitivity { id }
            | Self::ZeroInterval { id }
            | Self::IntervalTooLong { id, .. }
            | Self::SharedChannel { id, .. }
            | Self::ChannelOutOfRange { id, .. } => id,
        }
    }
}
