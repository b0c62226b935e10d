// PowerMon - Reading Reporters
//
// Consumers of sensor readings. The report task hands every reporter the
// latest reading (or no-data status) of each sensor once per interval.

pub mod display;

use crate::error::SensorError;
use crate::events::SensorReading;

pub use display::DisplayReporter;

pub type ReadingResult = Result<SensorReading, SensorError>;

pub trait Reporter {
    fn name(&self) -> &str;

    fn report(&mut self, readings: &[ReadingResult]) -> anyhow::Result<()>;
}

/// Writes one log line per sensor (the serial console on the firmware).
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn name(&self) -> &str {
        "log"
    }

    fn report(&mut self, readings: &[ReadingResult]) -> anyhow::Result<()> {
        for reading in readings {
            match reading {
                Ok(reading) => log::info!("{}", reading),
                Err(e) => log::info!("{}", e),
            }
        }
        Ok(())
    }
}
