// PowerMon - Sample & Reading Types

use std::fmt;

// ---------------------------------------------------------------------------
// Raw Sample (state captured by one sensor run)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    /// Clock value passed to the run that took this sample.
    pub ts: u32,
    pub vcc_mv: u16,
    pub pin_v: u16,
    pub pin_i: u16,
}

// ---------------------------------------------------------------------------
// Sample Event (passed to the observer hook on every run)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleEvent {
    pub id: char,
    pub sample: RawSample,
    pub current_calibration: i16,
    pub voltage_calibration: i16,
}

// ---------------------------------------------------------------------------
// Sensor Reading (snapshot handed to reporters)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading {
    pub id: char,
    pub ts: u32,
    pub pin_v: u16,
    pub pin_i: u16,
    pub mv: i32,
    pub ma: i32,
    pub mw: i32,
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] @{} ms: {} mV, {} mA, {} mW (V pin {}, I pin {})",
            self.id, self.ts, self.mv, self.ma, self.mw, self.pin_v, self.pin_i
        )
    }
}
