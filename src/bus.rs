//! Register transport abstraction.
//!
//! The AD9361 is controlled through a byte-wide SPI register file. This
//! driver never talks to a bus directly; every hardware access goes through
//! the [`RegisterIo`] trait, which the embedding application implements for
//! its transport (SPI controller, USB bridge, simulation model).

use crate::Result;
use std::time::Duration;

/// Byte-level register access over the control bus.
///
/// Only [`read`](Self::read) and [`write`](Self::write) are required; the
/// field and burst accessors have default implementations composed from
/// them. Implementations backed by a transport with native multi-byte
/// transfers should override the burst methods.
pub trait RegisterIo {
    /// Read one register.
    fn read(&mut self, reg: u16) -> Result<u8>;

    /// Write one register.
    fn write(&mut self, reg: u16, val: u8) -> Result<()>;

    /// Read a bit field. The returned value is shifted down by the mask's
    /// trailing-zero count, so a mask of `0x30` yields values `0..=3`.
    fn read_field(&mut self, reg: u16, mask: u8) -> Result<u8> {
        let val = self.read(reg)?;
        Ok((val & mask) >> mask.trailing_zeros())
    }

    /// Read-modify-write a bit field. `val` is taken in field units and
    /// shifted up into the mask position.
    fn write_field(&mut self, reg: u16, mask: u8, val: u8) -> Result<()> {
        let old = self.read(reg)?;
        let new = (old & !mask) | ((val << mask.trailing_zeros()) & mask);
        self.write(reg, new)
    }

    /// Read `buf.len()` registers starting at `reg` and walking *down* the
    /// address space, matching the chip's auto-decrementing multi-byte SPI
    /// transfers. `buf[0]` holds the value at `reg`, `buf[1]` the value at
    /// `reg - 1`, and so on.
    fn read_burst(&mut self, reg: u16, buf: &mut [u8]) -> Result<()> {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read(reg - i as u16)?;
        }
        Ok(())
    }

    /// Write `buf.len()` registers starting at `reg`, descending, with the
    /// same address order as [`read_burst`](Self::read_burst).
    fn write_burst(&mut self, reg: u16, buf: &[u8]) -> Result<()> {
        for (i, val) in buf.iter().enumerate() {
            self.write(reg - i as u16, *val)?;
        }
        Ok(())
    }

    /// Sleep hook for bounded status polls and settle delays.
    ///
    /// The default blocks the calling thread. Test doubles override this to
    /// count poll iterations instead of sleeping.
    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}
