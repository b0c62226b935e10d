// PowerMon - Power Sensor Task
//
// Samples a voltage divider and a Hall-effect current sensor on a fixed
// interval. Raw samples are stored as-is; voltage, current and power are
// derived on demand when a reading is requested.

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{PowerSensorConfig, SupplyPolicy};
use crate::conversion;
use crate::error::SensorError;
use crate::events::{RawSample, SampleEvent, SensorReading};
use crate::platform::{AnalogReader, SupplyMonitor};
use crate::tasks::timed::{Task, TimedTask};

/// Called with the raw values at the end of every run.
pub type SampleObserver = Box<dyn FnMut(&SampleEvent) + Send>;

/// Anything a [`ReportTask`](super::report::ReportTask) can pull readings from.
pub trait ReadingSource {
    fn id(&self) -> char;

    fn last_reading(&self) -> Result<SensorReading, SensorError>;
}

pub struct PowerSensor<A, S> {
    name: String,
    config: PowerSensorConfig,
    timer: TimedTask,
    adc: A,
    supply: S,
    sample: Option<RawSample>,
    observer: Option<SampleObserver>,
}

impl<A: AnalogReader, S: SupplyMonitor> PowerSensor<A, S> {
    /// Build a sensor that is due for its first sample at `now`.
    pub fn new(config: PowerSensorConfig, adc: A, supply: S, now: u32) -> Result<Self, SensorError> {
        config.validate()?;
        log::info!(
            "Power sensor '{}' on V ch{} / I ch{} (max {} V, {} mV/A, every {} ms)",
            config.id,
            config.voltage_channel,
            config.current_channel,
            config.max_voltage,
            config.sensitivity_mv_per_a,
            config.read_interval_ms
        );
        Ok(Self {
            name: format!("power-sensor-{}", config.id),
            config,
            timer: TimedTask::new(now),
            adc,
            supply,
            sample: None,
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: impl FnMut(&SampleEvent) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &PowerSensorConfig {
        &self.config
    }

    pub fn timer(&self) -> &TimedTask {
        &self.timer
    }

    /// Most recent raw sample, if any run has happened.
    pub fn sample(&self) -> Option<RawSample> {
        self.sample
    }

    pub fn voltage_calibration(&self) -> i16 {
        self.config.voltage_calibration
    }

    /// Take one sample of supply, voltage and current, then reschedule.
    pub fn sample_now(&mut self, now: u32) {
        self.timer.begin(now);

        let vcc_mv = self.supply.read_vcc_mv();
        let pin_v = self.adc.read(self.config.voltage_channel);
        let pin_i = self.adc.read(self.config.current_channel);

        let sample = RawSample {
            ts: now,
            vcc_mv,
            pin_v,
            pin_i,
        };
        self.sample = Some(sample);

        log::debug!(
            "[{}] : V pin: {}  V cal: {} - I pin: {}  I cal: {}",
            self.config.id,
            pin_v,
            self.config.voltage_calibration,
            pin_i,
            self.config.current_calibration
        );
        if let Some(observer) = self.observer.as_mut() {
            observer(&SampleEvent {
                id: self.config.id,
                sample,
                current_calibration: self.config.current_calibration,
                voltage_calibration: self.config.voltage_calibration,
            });
        }

        self.timer.advance(self.config.read_interval_ms);
    }
}

impl<A, S> PowerSensor<A, S> {
    fn raw(&self) -> RawSample {
        self.sample.unwrap_or_default()
    }

    /// Calibrated current in mA from the last current sample.
    pub fn current(&self) -> i32 {
        let raw = self.raw();
        let c = &self.config;
        match c.supply_policy {
            SupplyPolicy::Nominal => {
                conversion::current_ma(raw.pin_i, c.current_calibration, c.sensitivity_mv_per_a)
            }
            SupplyPolicy::Measured => conversion::current_ma_at_vcc(
                raw.pin_i,
                c.current_calibration,
                c.sensitivity_mv_per_a,
                raw.vcc_mv,
            ),
        }
    }

    /// Divider input voltage in mV from the last voltage sample.
    ///
    /// `voltage_calibration` is not applied here, unlike the current offset.
    pub fn voltage(&self) -> i32 {
        let raw = self.raw();
        match self.config.supply_policy {
            SupplyPolicy::Nominal => conversion::voltage_mv(raw.pin_v, self.config.max_voltage),
            SupplyPolicy::Measured => {
                conversion::voltage_mv_at_vcc(raw.pin_v, self.config.max_voltage, raw.vcc_mv)
            }
        }
    }

    pub fn power(mv: i32, ma: i32) -> i32 {
        conversion::power_mw(mv, ma)
    }

    /// Snapshot of the last sample with derived values. Does not touch the
    /// stored state, so repeated calls between runs return the same record.
    pub fn last_reading(&self) -> Result<SensorReading, SensorError> {
        let sample = self.sample.ok_or(SensorError::NoData { id: self.config.id })?;
        let mv = self.voltage();
        let ma = self.current();
        Ok(SensorReading {
            id: self.config.id,
            ts: sample.ts,
            pin_v: sample.pin_v,
            pin_i: sample.pin_i,
            mv,
            ma,
            mw: Self::power(mv, ma),
        })
    }
}

impl<A: AnalogReader, S: SupplyMonitor> Task for PowerSensor<A, S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_due(&self, now: u32) -> bool {
        self.timer.is_due(now)
    }

    fn run(&mut self, now: u32) {
        self.sample_now(now);
    }
}

impl<A, S> ReadingSource for PowerSensor<A, S> {
    fn id(&self) -> char {
        self.config.id
    }

    fn last_reading(&self) -> Result<SensorReading, SensorError> {
        PowerSensor::last_reading(self)
    }
}

// ---------------------------------------------------------------------------
// Shared handle: sampling and reading under one lock
// ---------------------------------------------------------------------------

/// A sensor that can be sampled by the scheduler and read from elsewhere
/// (another task or thread). Both sides take the same lock.
pub struct SharedPowerSensor<A, S> {
    id: char,
    name: String,
    inner: Arc<Mutex<PowerSensor<A, S>>>,
}

impl<A, S> SharedPowerSensor<A, S> {
    pub fn new(sensor: PowerSensor<A, S>) -> Self {
        Self {
            id: sensor.config.id,
            name: sensor.name.clone(),
            inner: Arc::new(Mutex::new(sensor)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut PowerSensor<A, S>) -> R) -> R {
        let mut sensor = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut sensor)
    }
}

impl<A, S> Clone for SharedPowerSensor<A, S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AnalogReader, S: SupplyMonitor> Task for SharedPowerSensor<A, S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_due(&self, now: u32) -> bool {
        self.with(|sensor| sensor.is_due(now))
    }

    fn run(&mut self, now: u32) {
        self.with(|sensor| sensor.sample_now(now));
    }
}

impl<A, S> ReadingSource for SharedPowerSensor<A, S> {
    fn id(&self) -> char {
        self.id
    }

    fn last_reading(&self) -> Result<SensorReading, SensorError> {
        self.with(|sensor| sensor.last_reading())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::config::{NOMINAL_VCC_MV, SENSOR_OUTPUT};
    use crate::platform::FixedSupply;

    /// Returns fixed values per channel and counts reads.
    #[derive(Clone, Default)]
    struct FakeAdc {
        values: [u16; 8],
        reads: usize,
    }

    impl FakeAdc {
        fn with(channel_values: &[(u8, u16)]) -> Self {
            let mut adc = Self::default();
            for &(channel, value) in channel_values {
                adc.values[channel as usize] = value;
            }
            adc
        }
    }

    impl AnalogReader for FakeAdc {
        fn read(&mut self, channel: u8) -> u16 {
            self.reads += 1;
            self.values[channel as usize]
        }
    }

    fn config() -> PowerSensorConfig {
        PowerSensorConfig {
            id: 'T',
            voltage_channel: 2,
            current_channel: 3,
            max_voltage: 20,
            sensitivity_mv_per_a: 100,
            read_interval_ms: 1000,
            ..SENSOR_OUTPUT
        }
    }

    fn sensor(pin_v: u16, pin_i: u16) -> PowerSensor<FakeAdc, FixedSupply> {
        PowerSensor::new(
            config(),
            FakeAdc::with(&[(2, pin_v), (3, pin_i)]),
            FixedSupply(NOMINAL_VCC_MV),
            0,
        )
        .unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = PowerSensorConfig {
            sensitivity_mv_per_a: 0,
            ..config()
        };
        let result = PowerSensor::new(bad, FakeAdc::default(), FixedSupply(5000), 0);
        assert!(matches!(result, Err(SensorError::ZeroSensitivity { id: 'T' })));
    }

    #[test]
    fn no_data_before_first_run() {
        let sensor = sensor(700, 522);
        assert_eq!(sensor.last_reading(), Err(SensorError::NoData { id: 'T' }));
        assert_eq!(sensor.sample(), None);
        assert_eq!(sensor.adc.reads, 0);
    }

    #[test]
    fn run_stores_raw_samples_and_timestamp() {
        let mut sensor = sensor(700, 522);
        sensor.run(1234);

        let reading = sensor.last_reading().unwrap();
        assert_eq!(reading.id, 'T');
        assert_eq!(reading.ts, 1234);
        assert_eq!(reading.pin_v, 700);
        assert_eq!(reading.pin_i, 522);
        // 700 * 20 * 125 / 128 = 13671.875
        assert_eq!(reading.mv, 13_671);
        assert_eq!(reading.ma, 488);
        // 13671 * 488 / 1000 = 6671.448
        assert_eq!(reading.mw, 6_671);
        assert_eq!(sensor.sample().unwrap().vcc_mv, NOMINAL_VCC_MV);
    }

    #[test]
    fn last_reading_is_idempotent() {
        let mut sensor = sensor(512, 530);
        sensor.run(50);

        let first = sensor.last_reading().unwrap();
        let reads = sensor.adc.reads;
        for _ in 0..3 {
            assert_eq!(sensor.last_reading().unwrap(), first);
        }
        assert_eq!(sensor.adc.reads, reads);
    }

    #[test]
    fn run_reschedules_by_interval() {
        let mut sensor = sensor(0, 512);
        assert!(sensor.is_due(0));
        sensor.run(0);
        assert!(!sensor.is_due(999));
        assert!(sensor.is_due(1000));

        sensor.run(1005);
        assert_eq!(sensor.timer().next_run(), 2000);
    }

    #[test]
    fn current_calibration_is_applied() {
        let calibrated = PowerSensorConfig {
            current_calibration: -10,
            ..config()
        };
        let mut sensor = PowerSensor::new(
            calibrated,
            FakeAdc::with(&[(2, 100), (3, 522)]),
            FixedSupply(NOMINAL_VCC_MV),
            0,
        )
        .unwrap();
        sensor.run(1);
        assert_eq!(sensor.current(), 0);
    }

    // Known discrepancy: the voltage offset is accepted but never applied,
    // while the current offset is. Kept as-is until calibration is revisited.
    #[test]
    fn voltage_calibration_is_not_applied() {
        let calibrated = PowerSensorConfig {
            voltage_calibration: 40,
            ..config()
        };
        let mut with_offset = PowerSensor::new(
            calibrated,
            FakeAdc::with(&[(2, 600), (3, 512)]),
            FixedSupply(NOMINAL_VCC_MV),
            0,
        )
        .unwrap();
        let mut without_offset = sensor(600, 512);
        with_offset.run(1);
        without_offset.run(1);

        assert_eq!(with_offset.voltage_calibration(), 40);
        assert_eq!(with_offset.voltage(), without_offset.voltage());
    }

    #[test]
    fn nominal_policy_ignores_measured_supply() {
        let mut sensor = PowerSensor::new(
            config(),
            FakeAdc::with(&[(2, 1000), (3, 522)]),
            FixedSupply(4_800),
            0,
        )
        .unwrap();
        sensor.run(1);
        assert_eq!(sensor.sample().unwrap().vcc_mv, 4_800);
        // 1000 * 20 * 125 / 128 = 19531.25
        assert_eq!(sensor.voltage(), 19_531);
        assert_eq!(sensor.current(), 488);
    }

    #[test]
    fn measured_policy_uses_supply_from_last_run() {
        struct Stepping(u16);
        impl SupplyMonitor for Stepping {
            fn read_vcc_mv(&mut self) -> u16 {
                self.0 -= 200;
                self.0
            }
        }

        let measured = PowerSensorConfig {
            supply_policy: SupplyPolicy::Measured,
            ..config()
        };
        let mut sensor = PowerSensor::new(
            measured,
            FakeAdc::with(&[(2, 1000), (3, 522)]),
            Stepping(5_000),
            0,
        )
        .unwrap();
        sensor.run(1);
        assert_eq!(sensor.voltage(), 18_750);
        assert_eq!(sensor.current(), 468);
        // Reading again does not take a new supply measurement.
        assert_eq!(sensor.voltage(), 18_750);
        assert_eq!(sensor.supply.0, 4_800);
    }

    #[test]
    fn observer_sees_every_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&runs);
        let mut sensor = sensor(300, 500).with_observer(move |event| {
            assert_eq!(event.id, 'T');
            assert_eq!(event.sample.pin_v, 300);
            assert_eq!(event.sample.pin_i, 500);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        sensor.run(0);
        sensor.run(1000);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shared_sensor_reads_from_another_thread() {
        let mut shared = SharedPowerSensor::new(sensor(700, 522));
        let reader = shared.clone();
        assert_eq!(reader.id(), 'T');
        assert_eq!(shared.name(), "power-sensor-T");
        assert!(reader.last_reading().is_err());

        shared.run(42);
        let reading = thread::spawn(move || reader.last_reading())
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(reading.ts, 42);
        assert_eq!(reading.ma, 488);
        assert!(!shared.is_due(43));
    }
}
