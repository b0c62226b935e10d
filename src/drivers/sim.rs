// PowerMon - Simulated Bench (host builds)
//
// Deterministic stand-in for the board's ADC: each channel sits at a baseline
// with a triangle ripple that advances one step per read.

use crate::config::ADC_MAX;
use crate::platform::AnalogReader;

const RIPPLE_PERIOD: u16 = 16;

#[derive(Debug, Clone, Copy)]
struct SimChannel {
    channel: u8,
    baseline: u16,
    amplitude: u16,
    step: u16,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedAdc {
    channels: Vec<SimChannel>,
}

impl SimulatedAdc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `channel` around `baseline` with +/- `amplitude` counts.
    pub fn channel(mut self, channel: u8, baseline: u16, amplitude: u16) -> Self {
        self.channels.retain(|c| c.channel != channel);
        self.channels.push(SimChannel {
            channel,
            baseline,
            amplitude,
            step: 0,
        });
        self
    }
}

impl AnalogReader for SimulatedAdc {
    fn read(&mut self, channel: u8) -> u16 {
        let Some(sim) = self.channels.iter_mut().find(|c| c.channel == channel) else {
            return 0;
        };
        let half = RIPPLE_PERIOD / 2;
        let phase = sim.step % RIPPLE_PERIOD;
        sim.step = sim.step.wrapping_add(1);

        // 0..half rises, half..period falls; centred on the baseline.
        let tri = if phase < half { phase } else { RIPPLE_PERIOD - phase };
        let offset = i32::from(sim.amplitude) * (2 * i32::from(tri) - i32::from(half)) / i32::from(half);
        (i32::from(sim.baseline) + offset).clamp(0, i32::from(ADC_MAX)) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ripples_around_baseline() {
        let mut adc = SimulatedAdc::new().channel(1, 512, 8);
        let samples: Vec<u16> = (0..RIPPLE_PERIOD).map(|_| adc.read(1)).collect();

        assert_eq!(samples[0], 504);
        assert_eq!(samples[4], 512);
        assert_eq!(samples[8], 520);
        assert_eq!(samples[12], 512);
        assert_eq!(*samples.iter().min().unwrap(), 504);
        assert_eq!(*samples.iter().max().unwrap(), 520);
        // Period repeats.
        assert_eq!(adc.read(1), 504);
    }

    #[test]
    fn clamps_to_adc_range_and_unknown_channels_read_zero() {
        let mut adc = SimulatedAdc::new().channel(0, 1020, 10).channel(2, 3, 10);
        for _ in 0..RIPPLE_PERIOD {
            assert!(adc.read(0) <= ADC_MAX);
            adc.read(2);
        }
        assert_eq!(adc.read(2), 0);
        assert_eq!(adc.read(7), 0);
    }
}
