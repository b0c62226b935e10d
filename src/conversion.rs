// PowerMon - Fixed-point Conversions
//
// Raw ADC samples to millivolts, milliamps and milliwatts. Integer arithmetic
// with 64-bit intermediates; the scale constants encode a 5 V ADC reference
// over 1024 steps.

use crate::config::*;

/// Current through a Hall-effect sensor, in mA. Negative means reverse flow.
///
/// The sensor rests at half scale with no current and moves by
/// `sensitivity_mv_per_a` per amp:
///
/// ```text
///        (raw - 512 + cal) * 5000 * 1000     (raw - 512 + cal) * 625000
///   mA = ------------------------------  =  -------------------------
///              1024 * sensitivity                128 * sensitivity
/// ```
pub fn current_ma(raw: u16, calibration: i16, sensitivity_mv_per_a: u16) -> i32 {
    let zero = i64::from(raw) - i64::from(ADC_HALF_SCALE) + i64::from(calibration);
    let ma = zero * CURRENT_SCALE_NUM / (CURRENT_SCALE_DEN * i64::from(sensitivity_mv_per_a));
    saturate(ma)
}

/// Like [`current_ma`], but with the ADC step derived from a measured supply
/// instead of the nominal 5000 mV. Identical to it when `vcc_mv` is nominal.
pub fn current_ma_at_vcc(raw: u16, calibration: i16, sensitivity_mv_per_a: u16, vcc_mv: u16) -> i32 {
    let zero = i64::from(raw) - i64::from(ADC_HALF_SCALE) + i64::from(calibration);
    let num = CURRENT_SCALE_NUM * i64::from(vcc_mv);
    let den = CURRENT_SCALE_DEN * i64::from(sensitivity_mv_per_a) * i64::from(NOMINAL_VCC_MV);
    saturate(zero * num / den)
}

/// Divider input voltage in mV, for a divider sized so `max_voltage` (V)
/// lands on ADC full scale.
pub fn voltage_mv(raw: u16, max_voltage: u16) -> i32 {
    let mv = i64::from(raw) * i64::from(max_voltage) * VOLTAGE_SCALE_NUM / VOLTAGE_SCALE_DEN;
    saturate(mv)
}

/// Like [`voltage_mv`], rescaled by a measured supply.
pub fn voltage_mv_at_vcc(raw: u16, max_voltage: u16, vcc_mv: u16) -> i32 {
    let num = i64::from(raw) * i64::from(max_voltage) * VOLTAGE_SCALE_NUM * i64::from(vcc_mv);
    let den = VOLTAGE_SCALE_DEN * i64::from(NOMINAL_VCC_MV);
    saturate(num / den)
}

/// P = V * I, with mV * mA scaled down to mW.
pub fn power_mw(mv: i32, ma: i32) -> i32 {
    saturate(i64::from(mv) * i64::from(ma) / 1000)
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_current_at_half_scale() {
        assert_eq!(current_ma(512, 0, 100), 0);
        // Calibration shifts the zero point.
        assert_eq!(current_ma(507, 5, 100), 0);
        assert_eq!(current_ma(515, -3, 100), 0);
    }

    #[test]
    fn current_matches_fixed_point_formula() {
        // 10 * 625000 / 12800 = 488.28
        assert_eq!(current_ma(522, 0, 100), 488);
        assert_eq!(current_ma(502, 0, 100), -488);
        // Full scale on a 66 mV/A sensor: 511 * 625000 / 8448
        assert_eq!(current_ma(ADC_MAX, 0, 66), 37_804);
        assert_eq!(current_ma(0, 0, 66), -37_878);
    }

    #[test]
    fn current_is_monotonic_in_raw_plus_calibration() {
        for calibration in [-20i16, 0, 7] {
            let mut previous = i32::MIN;
            for raw in 0..=ADC_MAX {
                let ma = current_ma(raw, calibration, 185);
                assert!(ma >= previous, "raw {} cal {}", raw, calibration);
                previous = ma;
            }
        }
    }

    #[test]
    fn current_with_low_sensitivity_does_not_truncate() {
        // 511 * 625000 / (128 * 10) = 249511, well past i16.
        assert_eq!(current_ma(ADC_MAX, 0, 10), 249_511);
    }

    #[test]
    fn voltage_at_range_ends() {
        assert_eq!(voltage_mv(0, 25), 0);
        // 1023 * 25 * 125 / 128 = 24975.59
        assert_eq!(voltage_mv(ADC_MAX, 25), 24_975);
        // 1023 * 255 * 125 / 128 = 254750.98, beyond 16 bits.
        assert_eq!(voltage_mv(ADC_MAX, 255), 254_750);
    }

    #[test]
    fn measured_supply_matches_nominal_at_5v() {
        for raw in [0, 1, 300, 512, 777, ADC_MAX] {
            assert_eq!(voltage_mv_at_vcc(raw, 15, NOMINAL_VCC_MV), voltage_mv(raw, 15));
            assert_eq!(
                current_ma_at_vcc(raw, -4, 100, NOMINAL_VCC_MV),
                current_ma(raw, -4, 100)
            );
        }
    }

    #[test]
    fn measured_supply_scales_readings() {
        // 1000 * 20 * 125 * 4800 / (128 * 5000) = 18750
        assert_eq!(voltage_mv_at_vcc(1000, 20, 4800), 18_750);
        // 10 * 625000 * 4800 / (128 * 100 * 5000) = 468.75
        assert_eq!(current_ma_at_vcc(522, 0, 100, 4800), 468);
    }

    #[test]
    fn power_is_integer_product() {
        assert_eq!(power_mw(0, 1234), 0);
        assert_eq!(power_mw(12_000, 500), 6_000);
        assert_eq!(power_mw(12_000, -500), -6_000);
        assert_eq!(power_mw(-3_300, -250), 825);
        assert_eq!(power_mw(5_000, 999), 4_995);
        // Needs a wide intermediate before the division.
        assert_eq!(power_mw(48_000, 10_000), 480_000);
        assert_eq!(power_mw(254_750, 249_511), 63_562_927);
    }
}
