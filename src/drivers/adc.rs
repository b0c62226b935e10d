// PowerMon - ESP32-C3 ADC & Clock
//
// ADC1 in one-shot mode through the raw ESP-IDF API. The C3 converts at 12
// bits; readings are reduced to the 10-bit range the conversions assume.

use crate::config::*;
use crate::platform::{AnalogReader, Clock};

/// Milliseconds since boot (wraps at ~49 days).
#[derive(Debug, Clone, Copy, Default)]
pub struct EspClock;

impl Clock for EspClock {
    fn now_ms(&self) -> u32 {
        unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
    }
}

pub struct EspAdc {
    handle: esp_idf_sys::adc_oneshot_unit_handle_t,
    last: [u16; ADC_CHANNEL_COUNT as usize],
}

// SAFETY: the one-shot unit handle is only used through `&mut self`, and every
// sensor reaches it through the same `Mutex`.
unsafe impl Send for EspAdc {}

impl EspAdc {
    /// Bring up ADC1 and configure `channels` with 11 dB attenuation.
    pub fn new(channels: &[u8]) -> anyhow::Result<Self> {
        let mut handle: esp_idf_sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        unsafe {
            let unit_cfg = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
                unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: esp_idf_sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            esp_idf_sys::esp!(esp_idf_sys::adc_oneshot_new_unit(&unit_cfg, &mut handle))?;

            let chan_cfg = esp_idf_sys::adc_oneshot_chan_cfg_t {
                atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_11,
                bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            for &channel in channels {
                esp_idf_sys::esp!(esp_idf_sys::adc_oneshot_config_channel(
                    handle,
                    esp_idf_sys::adc_channel_t::from(channel),
                    &chan_cfg
                ))?;
            }
        }
        log::info!("ADC1 one-shot ready on channels {:?}", channels);
        Ok(Self {
            handle,
            last: [0; ADC_CHANNEL_COUNT as usize],
        })
    }
}

impl AnalogReader for EspAdc {
    /// A failed conversion repeats the channel's previous value.
    fn read(&mut self, channel: u8) -> u16 {
        let mut raw: i32 = 0;
        let ret = unsafe {
            esp_idf_sys::adc_oneshot_read(
                self.handle,
                esp_idf_sys::adc_channel_t::from(channel),
                &mut raw,
            )
        };
        let slot = &mut self.last[usize::from(channel) % self.last.len()];
        if ret == esp_idf_sys::ESP_OK {
            *slot = ((raw.clamp(0, 4095) as u16) >> 2).min(ADC_MAX);
        } else {
            log::warn!("ADC read on channel {} failed ({})", channel, ret);
        }
        *slot
    }
}

impl Drop for EspAdc {
    fn drop(&mut self) {
        unsafe {
            esp_idf_sys::adc_oneshot_del_unit(self.handle);
        }
    }
}
