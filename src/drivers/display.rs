// PowerMon - SSD1306 OLED Driver
//
// In-memory frame buffer in the controller's page layout (8 vertical pixels
// per byte), drawn into with embedded-graphics and pushed to the panel over
// the shared I2C bus on flush.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::config::*;

/// A draw target whose contents are shown only after `flush`.
pub trait Flush {
    fn flush(&mut self) -> anyhow::Result<()>;
}

pub struct FrameBuffer {
    buf: [u8; DISPLAY_BUFFER_SIZE],
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            buf: [0; DISPLAY_BUFFER_SIZE],
        }
    }

    pub fn as_bytes(&self) -> &[u8; DISPLAY_BUFFER_SIZE] {
        &self.buf
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return false;
        }
        let (idx, bit) = Self::locate(x, y);
        self.buf[idx] & bit != 0
    }

    pub fn lit_pixels(&self) -> u32 {
        self.buf.iter().map(|b| b.count_ones()).sum()
    }

    fn locate(x: u32, y: u32) -> (usize, u8) {
        let idx = x as usize + (y as usize / 8) * SCREEN_WIDTH as usize;
        (idx, 1 << (y % 8))
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Off-screen pixels are clipped.
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
                continue;
            }
            let (idx, bit) = Self::locate(x, y);
            if color.is_on() {
                self.buf[idx] |= bit;
            } else {
                self.buf[idx] &= !bit;
            }
        }
        Ok(())
    }
}

impl Flush for FrameBuffer {
    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Panel (ESP-IDF I2C)
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
pub use panel::{SharedBus, Ssd1306};

#[cfg(target_os = "espidf")]
mod panel {
    use std::sync::{Mutex, PoisonError};

    use esp_idf_hal::i2c::I2cDriver;

    use super::*;

    /// Thread-safe handle to a shared I2C bus.
    pub type SharedBus = &'static Mutex<I2cDriver<'static>>;

    const CONTROL_CMD: u8 = 0x00;
    const CONTROL_DATA: u8 = 0x40;
    const DATA_CHUNK: usize = 16;

    // 128x64, charge pump on, horizontal addressing, segment/COM remapped.
    const INIT_SEQUENCE: [u8; 25] = [
        0xAE, 0xD5, 0x80, 0xA8, 0x3F, 0xD3, 0x00, 0x40, 0x8D, 0x14, 0x20, 0x00, 0xA1, 0xC8, 0xDA,
        0x12, 0x81, 0xCF, 0xD9, 0xF1, 0xDB, 0x40, 0xA4, 0xA6, 0xAF,
    ];

    pub struct Ssd1306 {
        bus: SharedBus,
        frame: FrameBuffer,
    }

    impl Ssd1306 {
        pub fn new(bus: SharedBus) -> Self {
            Self {
                bus,
                frame: FrameBuffer::new(),
            }
        }

        /// Probe with a NOP command.
        pub fn is_connected(&self) -> bool {
            self.command(&[0xE3]).is_ok()
        }

        pub fn init(&mut self) -> anyhow::Result<()> {
            self.command(&INIT_SEQUENCE)?;
            self.frame.clear(BinaryColor::Off)?;
            self.flush()?;
            log::info!("SSD1306 initialised ({}x{})", SCREEN_WIDTH, SCREEN_HEIGHT);
            Ok(())
        }

        fn command(&self, cmds: &[u8]) -> anyhow::Result<()> {
            let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
            for &cmd in cmds {
                bus.write(I2C_ADDR_OLED, &[CONTROL_CMD, cmd], I2C_TIMEOUT_TICKS)?;
            }
            Ok(())
        }
    }

    impl OriginDimensions for Ssd1306 {
        fn size(&self) -> Size {
            self.frame.size()
        }
    }

    impl DrawTarget for Ssd1306 {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            self.frame.draw_iter(pixels)
        }
    }

    impl Flush for Ssd1306 {
        fn flush(&mut self) -> anyhow::Result<()> {
            // Full-screen window, then stream the buffer.
            self.command(&[0x21, 0, (SCREEN_WIDTH - 1) as u8, 0x22, 0, (SCREEN_HEIGHT / 8 - 1) as u8])?;
            let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
            let mut packet = [0u8; DATA_CHUNK + 1];
            packet[0] = CONTROL_DATA;
            for chunk in self.frame.as_bytes().chunks(DATA_CHUNK) {
                packet[1..=chunk.len()].copy_from_slice(chunk);
                bus.write(I2C_ADDR_OLED, &packet[..=chunk.len()], I2C_TIMEOUT_TICKS)?;
            }
            Ok(())
        }
    }
}
