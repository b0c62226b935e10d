// PowerMon - Firmware Entry Point
//
// Start-up sequence:
//   1. Initialise logging.
//   2. Bring up the shared I2C bus and the SSD1306 OLED (optional, the
//      monitor keeps running on the serial log without it).
//   3. Configure ADC1 for every sensor channel.
//   4. Register one sampling task per power sensor plus the report task.
//   5. Run the cooperative scheduler forever.
//
// Host builds run the same wiring against a simulated ADC for a fixed time.

use std::sync::{Arc, Mutex};

use powermon::config::*;
use powermon::platform::{AnalogReader, SupplyMonitor};
use powermon::report::LogReporter;
use powermon::tasks::{PowerSensor, ReportTask, Scheduler, SharedPowerSensor};

const SENSOR_CHANNELS: [u8; 4] = [ADC_CH_INPUT_V, ADC_CH_INPUT_I, ADC_CH_OUTPUT_V, ADC_CH_OUTPUT_I];

// ---------------------------------------------------------------------------
// Main (ESP32-C3)
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use powermon::drivers::adc::{EspAdc, EspClock};
    use powermon::drivers::display::{SharedBus, Ssd1306};
    use powermon::platform::{Clock, FixedSupply};
    use powermon::report::DisplayReporter;

    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("PowerMon firmware starting");

    // ---- Peripherals ------------------------------------------------------
    let peripherals = Peripherals::take()?;

    // ---- I2C bus + OLED ---------------------------------------------------
    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
    let i2c: I2cDriver<'static> = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // SDA
        peripherals.pins.gpio7, // SCL
        &i2c_config,
    )?;
    // The bus lives for the whole programme (firmware never exits).
    let i2c_bus: SharedBus = Box::leak(Box::new(Mutex::new(i2c)));

    let mut oled = Ssd1306::new(i2c_bus);
    let oled_ok = oled.is_connected() && {
        match oled.init() {
            Ok(()) => true,
            Err(e) => {
                log::error!("OLED init failed: {}", e);
                false
            }
        }
    };
    if !oled_ok {
        log::warn!("OLED not available, reporting to serial only");
    }

    // ---- ADC + sensors ----------------------------------------------------
    let adc = Arc::new(Mutex::new(EspAdc::new(&SENSOR_CHANNELS)?));
    let clock = EspClock;
    let now = clock.now_ms();

    let sensors = build_sensors(&adc, FixedSupply(NOMINAL_VCC_MV), now)?;

    let mut report = ReportTask::new(REPORT_INTERVAL_MS, now).reporter(LogReporter);
    if oled_ok {
        report = report.reporter(DisplayReporter::new(oled));
    }

    let mut scheduler = Scheduler::new();
    register(&mut scheduler, report, sensors.into_iter().map(SharedPowerSensor::new));

    log::info!("Start-up complete, entering sampling loop");
    scheduler.run_forever(&clock)
}

// ---------------------------------------------------------------------------
// Main (host simulation)
// ---------------------------------------------------------------------------
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};

    use powermon::drivers::sim::SimulatedAdc;
    use powermon::platform::{Clock, FixedSupply, StdClock};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("PowerMon host simulation starting ({} ms)", SIM_RUN_MS);

    let adc = Arc::new(Mutex::new(
        SimulatedAdc::new()
            .channel(ADC_CH_INPUT_V, 740, 6)
            .channel(ADC_CH_INPUT_I, 560, 4)
            .channel(ADC_CH_OUTPUT_V, 820, 3)
            .channel(ADC_CH_OUTPUT_I, 545, 5),
    ));
    let clock = StdClock::new();
    let now = clock.now_ms();

    let samples = Arc::new(AtomicU32::new(0));
    let sensors = build_sensors(&adc, FixedSupply(NOMINAL_VCC_MV), now)?
        .into_iter()
        .map(|sensor| {
            let samples = Arc::clone(&samples);
            let sensor = sensor.with_observer(move |_| {
                samples.fetch_add(1, Ordering::Relaxed);
            });
            SharedPowerSensor::new(sensor)
        });

    let report = ReportTask::new(REPORT_INTERVAL_MS, now).reporter(LogReporter);
    let mut scheduler = Scheduler::new();
    register(&mut scheduler, report, sensors);

    scheduler.run_for(&clock, SIM_RUN_MS);
    log::info!("Simulation done: {} samples taken", samples.load(Ordering::Relaxed));
    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring helpers
// ---------------------------------------------------------------------------

/// One sensor per board definition, all sharing the same ADC unit.
fn build_sensors<A, S>(adc: &A, supply: S, now: u32) -> anyhow::Result<Vec<PowerSensor<A, S>>>
where
    A: AnalogReader + Clone,
    S: SupplyMonitor + Clone,
{
    SENSORS
        .iter()
        .map(|config| Ok(PowerSensor::new(*config, adc.clone(), supply.clone(), now)?))
        .collect()
}

/// Sensors sample before the report task reads them within the same pass.
fn register<'a, A, S>(
    scheduler: &mut Scheduler<'a>,
    mut report: ReportTask<'a>,
    sensors: impl IntoIterator<Item = SharedPowerSensor<A, S>>,
) where
    A: AnalogReader + 'a,
    S: SupplyMonitor + 'a,
{
    for sensor in sensors {
        report = report.source(sensor.clone());
        scheduler.add(sensor);
    }
    scheduler.add(report);
}
