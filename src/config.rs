// PowerMon - Hardware & System Configuration
// Target: ESP32-C3 (RISC-V), Xiao-style pinout

use crate::error::SensorError;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 6; // D4 - I2C data line
pub const PIN_I2C_SCL: i32 = 7; // D5 - I2C clock line

// ADC1 channels (channel N is GPIO N on the C3).
pub const ADC_CH_INPUT_V: u8 = 0; // GPIO0 - input divider centre
pub const ADC_CH_INPUT_I: u8 = 1; // GPIO1 - input ACS7xx VIOUT
pub const ADC_CH_OUTPUT_V: u8 = 3; // GPIO3 / D1 - output divider centre
pub const ADC_CH_OUTPUT_I: u8 = 4; // GPIO4 / D2 - output ACS7xx VIOUT
pub const ADC_CHANNEL_COUNT: u8 = 5;

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_OLED: u8 = 0x3C;
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Display (SSD1306 OLED)
// ---------------------------------------------------------------------------
pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;
pub const DISPLAY_BUFFER_SIZE: usize = (SCREEN_WIDTH as usize * SCREEN_HEIGHT as usize) / 8; // 1024

// ---------------------------------------------------------------------------
// ADC & fixed-point conversion
// ---------------------------------------------------------------------------
pub const ADC_BITS: u32 = 10;
pub const ADC_MAX: u16 = (1 << ADC_BITS) - 1; // 1023
pub const ADC_HALF_SCALE: i32 = 1 << (ADC_BITS - 1); // 512, Hall sensor zero-current output

/// Reference supply the scale constants below are derived for.
pub const NOMINAL_VCC_MV: u16 = 5000;

// 5000 mV / 1024 steps * 1000 mA/A, reduced by 8 top and bottom.
pub const CURRENT_SCALE_NUM: i64 = 625_000;
pub const CURRENT_SCALE_DEN: i64 = 128;

// Approximates 1000/1024 (V -> mV over the full ADC scale).
pub const VOLTAGE_SCALE_NUM: i64 = 125;
pub const VOLTAGE_SCALE_DEN: i64 = 128;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const SENSOR_READ_INTERVAL_MS: u32 = 500;
pub const REPORT_INTERVAL_MS: u32 = 2000;
pub const SCHEDULER_IDLE_MS: u64 = 5; // sleep between scheduler passes
pub const SIM_RUN_MS: u32 = 10_000; // host simulation length

/// Largest interval `TimedTask` can compare across a counter wrap.
pub const MAX_INTERVAL_MS: u32 = (1 << 31) - 1;

// ---------------------------------------------------------------------------
// Power sensor configuration
// ---------------------------------------------------------------------------

/// Which supply voltage the conversions are scaled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupplyPolicy {
    /// Assume the ADC reference sits at [`NOMINAL_VCC_MV`]. The supply
    /// reading taken on each run is stored but not used.
    #[default]
    Nominal,
    /// Scale by the supply voltage captured during the most recent run.
    Measured,
}

/// Construction-time wiring and calibration of one power sensor circuit.
///
/// The divider is expected to be sized so `max_voltage` at its input maps to
/// ADC full scale. A good starting point is 4k7 for R2 (ground to centre),
/// then R1 = `max_voltage` / 1.064 mA rounded to a stock value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSensorConfig {
    pub id: char,
    pub voltage_channel: u8,
    pub current_channel: u8,
    /// Maximum voltage across the divider, in volts.
    pub max_voltage: u16,
    /// Current sensor output in millivolts per amp.
    pub sensitivity_mv_per_a: u16,
    /// Divider resistors in ohms. Not used by the conversion.
    pub r1_ohms: u32,
    pub r2_ohms: u32,
    pub read_interval_ms: u32,
    /// Added to the zero-referenced current sample. May be negative.
    pub current_calibration: i16,
    /// Accepted but not applied by the voltage conversion.
    pub voltage_calibration: i16,
    pub supply_policy: SupplyPolicy,
}

impl PowerSensorConfig {
    pub fn validate(&self) -> Result<(), SensorError> {
        let id = self.id;
        if self.sensitivity_mv_per_a == 0 {
            return Err(SensorError::ZeroSensitivity { id });
        }
        if self.read_interval_ms == 0 {
            return Err(SensorError::ZeroInterval { id });
        }
        if self.read_interval_ms > MAX_INTERVAL_MS {
            return Err(SensorError::IntervalTooLong {
                id,
                interval_ms: self.read_interval_ms,
            });
        }
        if self.voltage_channel == self.current_channel {
            return Err(SensorError::SharedChannel {
                id,
                channel: self.voltage_channel,
            });
        }
        for channel in [self.voltage_channel, self.current_channel] {
            if channel >= ADC_CHANNEL_COUNT {
                return Err(SensorError::ChannelOutOfRange { id, channel });
            }
        }
        Ok(())
    }
}

/// Solar panel side: 25 V divider (R1 = 18k, R2 = 4k7), ACS712-30A.
pub const SENSOR_INPUT: PowerSensorConfig = PowerSensorConfig {
    id: 'I',
    voltage_channel: ADC_CH_INPUT_V,
    current_channel: ADC_CH_INPUT_I,
    max_voltage: 25,
    sensitivity_mv_per_a: 66,
    r1_ohms: 18_000,
    r2_ohms: 4_700,
    read_interval_ms: SENSOR_READ_INTERVAL_MS,
    current_calibration: 0,
    voltage_calibration: 0,
    supply_policy: SupplyPolicy::Nominal,
};

/// Load side: 15 V divider (R1 = 10k, R2 = 4k7), ACS712-20A.
pub const SENSOR_OUTPUT: PowerSensorConfig = PowerSensorConfig {
    id: 'O',
    voltage_channel: ADC_CH_OUTPUT_V,
    current_channel: ADC_CH_OUTPUT_I,
    max_voltage: 15,
    sensitivity_mv_per_a: 100,
    r1_ohms: 10_000,
    r2_ohms: 4_700,
    read_interval_ms: SENSOR_READ_INTERVAL_MS,
    current_calibration: 0,
    voltage_calibration: 0,
    supply_policy: SupplyPolicy::Nominal,
};

pub const SENSORS: [PowerSensorConfig; 2] = [SENSOR_INPUT, SENSOR_OUTPUT];
