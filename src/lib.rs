// PowerMon - Voltage/Current/Power Monitor
//
// Periodic sampling of voltage-divider and Hall-effect current-sensor
// channels under a cooperative scheduler, with fixed-point conversion of the
// raw samples to mV, mA and mW.

pub mod config;
pub mod conversion;
pub mod drivers;
pub mod error;
pub mod events;
pub mod platform;
pub mod report;
pub mod tasks;

pub use error::SensorError;
pub use events::{RawSample, SampleEvent, SensorReading};
