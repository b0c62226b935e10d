// PowerMon - OLED Reading Reporter
//
// Two text lines per sensor: id, voltage and current on the first, power on
// the second. Sensors beyond what fits on the panel are clipped.

use core::fmt::Debug;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use crate::drivers::display::Flush;
use crate::report::{ReadingResult, Reporter};

const LINE_HEIGHT: i32 = 10;

pub struct DisplayReporter<D> {
    display: D,
}

impl<D> DisplayReporter<D>
where
    D: DrawTarget<Color = BinaryColor> + Flush,
    D::Error: Debug,
{
    pub fn new(display: D) -> Self {
        Self { display }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Text lines for one sensor.
    pub fn lines(reading: &ReadingResult) -> [String; 2] {
        match reading {
            Ok(r) => [
                format!("{} {:>6}mV {:>6}mA", r.id, r.mv, r.ma),
                format!("  {:>8}mW", r.mw),
            ],
            Err(e) => [format!("{} no data", e.sensor_id()), String::new()],
        }
    }

    fn draw(&mut self, readings: &[ReadingResult]) -> Result<(), D::Error> {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        self.display.clear(BinaryColor::Off)?;

        let mut y = 0;
        for reading in readings {
            for line in Self::lines(reading) {
                Text::with_baseline(&line, Point::new(0, y), style, Baseline::Top)
                    .draw(&mut self.display)?;
                y += LINE_HEIGHT;
            }
        }
        Ok(())
    }
}

impl<D> Reporter for DisplayReporter<D>
where
    D: DrawTarget<Color = BinaryColor> + Flush,
    D::Error: Debug,
{
    fn name(&self) -> &str {
        "oled"
    }

    fn report(&mut self, readings: &[ReadingResult]) -> anyhow::Result<()> {
        self.draw(readings)
            .map_err(|e| anyhow::anyhow!("Display draw failed: {:?}", e))?;
        self.display.flush()
    }
}
