/// This module lives in a subfolder as mod.rs instead of a common.rs under
/// tests, so the test runner does not search it for runnable tests.
/// https://doc.rust-lang.org/rust-by-example/testing/integration_testing.html
use std::collections::{BTreeMap, VecDeque};

use ad9361::regs::*;
use ad9361::{RegisterIo, Result};

pub fn logging_init(module: &str) {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Error)
        .filter_module("ad9361", log::LevelFilter::Trace)
        .filter_module(module, log::LevelFilter::Trace)
        .try_init();
}

/// In-memory register file standing in for the SPI transport.
///
/// Reads come from a sparse image (unwritten registers read 0), every write
/// lands in a journal, and two behaviors can be scripted per register:
/// a fixed read override (status bits the driver polls for 1) and
/// self-clearing (calibration triggers that read back N times before the
/// "hardware" clears them). `delay_us` counts instead of sleeping, so
/// polling budgets are asserted in microseconds of *requested* delay.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockBus {
    regs: BTreeMap<u16, u8>,
    pub journal: Vec<(u16, u8)>,
    overrides: BTreeMap<u16, u8>,
    self_clearing: BTreeMap<u16, u32>,
    self_clear_queue: BTreeMap<u16, VecDeque<u32>>,
    countdown: BTreeMap<u16, u32>,
    pub delay_calls: u32,
    pub delay_total_us: u64,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus a device attaches to cleanly: the ENSM reads back ALERT, every
    /// lock/valid bit the driver polls reports done immediately, and the
    /// calibration trigger bits clear after one observed read.
    pub fn ready() -> Self {
        let mut bus = Self::new();
        bus.set_reg(REG_STATE, 0x05);
        bus.override_read(REG_CH_1_OVERFLOW, BBPLL_LOCK);
        bus.override_read(REG_RFPLL_CP_OVERRANGE_VCO_LOCK, VCO_LOCK);
        bus.override_read(REG_RFPLL_CP_OVERRANGE_VCO_LOCK + TX_SYNTH_OFFSET, VCO_LOCK);
        bus.override_read(REG_RFPLL_CAL_STATUS, CP_CAL_VALID);
        bus.override_read(REG_RFPLL_CAL_STATUS + TX_SYNTH_OFFSET, CP_CAL_VALID);
        bus.override_read(REG_QUAD_CAL_STATUS_TX1, TX1_LO_CONV | TX1_SSB_CONV);
        bus.self_clear_after(REG_CALIBRATION_CTRL, 1);
        bus
    }

    pub fn set_reg(&mut self, reg: u16, val: u8) {
        self.regs.insert(reg, val);
    }

    pub fn reg(&self, reg: u16) -> u8 {
        self.regs.get(&reg).copied().unwrap_or(0)
    }

    /// Make every read of `reg` return `val`, regardless of writes.
    pub fn override_read(&mut self, reg: u16, val: u8) {
        self.overrides.insert(reg, val);
    }

    pub fn clear_override(&mut self, reg: u16) {
        self.overrides.remove(&reg);
    }

    /// After a non-zero write to `reg`, let `reads` reads observe the
    /// written value, then clear the register. `u32::MAX` never clears,
    /// which is how the timeout paths are exercised.
    pub fn self_clear_after(&mut self, reg: u16, reads: u32) {
        self.self_clearing.insert(reg, reads);
    }

    /// Like `self_clear_after`, but each successive non-zero write consumes
    /// the next count from `counts`. Once the schedule is exhausted the
    /// per-register default from `self_clear_after` applies again.
    pub fn self_clear_schedule(&mut self, reg: u16, counts: &[u32]) {
        self.self_clear_queue.insert(reg, counts.iter().copied().collect());
    }

    /// All values written to `reg`, in order.
    pub fn writes_to(&self, reg: u16) -> Vec<u8> {
        self.journal
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl RegisterIo for MockBus {
    fn read(&mut self, reg: u16) -> Result<u8> {
        if let Some(&val) = self.overrides.get(&reg) {
            return Ok(val);
        }
        if let Some(left) = self.countdown.get_mut(&reg) {
            if *left == 0 {
                self.countdown.remove(&reg);
                self.regs.insert(reg, 0);
            } else {
                *left -= 1;
            }
        }
        Ok(self.reg(reg))
    }

    fn write(&mut self, reg: u16, val: u8) -> Result<()> {
        self.journal.push((reg, val));
        self.regs.insert(reg, val);
        if val != 0 {
            let scheduled = self
                .self_clear_queue
                .get_mut(&reg)
                .and_then(|queue| queue.pop_front());
            if let Some(reads) = scheduled {
                self.countdown.insert(reg, reads);
            } else if let Some(&reads) = self.self_clearing.get(&reg) {
                self.countdown.insert(reg, reads);
            }
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_calls += 1;
        self.delay_total_us += us as u64;
    }
}
