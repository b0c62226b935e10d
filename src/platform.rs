// PowerMon - Platform Capabilities
//
// The clock, ADC and supply monitor the sampling tasks depend on. Firmware
// wires in the ESP-IDF drivers; tests and the host build substitute fakes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Wrapping millisecond counter (rolls over after ~49 days).
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// One-shot analog reads. Values lie in `0..=ADC_MAX`.
pub trait AnalogReader {
    fn read(&mut self, channel: u8) -> u16;
}

/// Effective ADC reference (Vcc), in millivolts.
pub trait SupplyMonitor {
    fn read_vcc_mv(&mut self) -> u16;
}

// One ADC unit is shared by every sensor on the board.
impl<T: AnalogReader> AnalogReader for Arc<Mutex<T>> {
    fn read(&mut self, channel: u8) -> u16 {
        self.lock().unwrap_or_else(PoisonError::into_inner).read(channel)
    }
}

impl<T: SupplyMonitor> SupplyMonitor for Arc<Mutex<T>> {
    fn read_vcc_mv(&mut self) -> u16 {
        self.lock().unwrap_or_else(PoisonError::into_inner).read_vcc_mv()
    }
}

/// Supply monitor for boards without a Vcc measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSupply(pub u16);

impl SupplyMonitor for FixedSupply {
    fn read_vcc_mv(&mut self) -> u16 {
        self.0
    }
}

/// Milliseconds since construction, truncated to the wrapping counter.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u16);

    impl AnalogReader for Counter {
        fn read(&mut self, channel: u8) -> u16 {
            self.0 += 1;
            self.0 + u16::from(channel) * 100
        }
    }

    #[test]
    fn shared_reader_forwards_to_inner_adc() {
        let adc = Arc::new(Mutex::new(Counter(0)));
        let mut first = Arc::clone(&adc);
        let mut second = Arc::clone(&adc);

        assert_eq!(first.read(0), 1);
        assert_eq!(second.read(2), 202);
        assert_eq!(adc.lock().unwrap().0, 2);
    }

    #[test]
    fn fixed_supply_is_constant() {
        let mut supply = FixedSupply(4_950);
        assert_eq!(supply.read_vcc_mv(), 4_950);
        assert_eq!(supply.read_vcc_mv(), 4_950);
    }

    #[test]
    fn std_clock_starts_near_zero() {
        let clock = StdClock::new();
        assert!(clock.now_ms() < 1_000);
    }
}
