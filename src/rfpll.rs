//! RF synthesizers (RX and TX fractional-N PLLs) and fastlock profiles.
//!
//! Both synthesizers expose identical register blocks 0x40 apart, so every
//! routine here takes a `tx` flag (or a [`ClockId`]) and works on a register
//! offset. Tuning programs the VCO from a characterization LUT, writes the
//! 5-byte frequency word burst, then polls lock. A retune on the RX side
//! also reloads the gain table when the carrier crosses a band boundary; on
//! the TX side it can trigger an automatic quadrature re-calibration.

use log::{debug, error};

use crate::bus::RegisterIo;
use crate::calib::OneShotCal;
use crate::clocks::ClockId;
use crate::device::{Ad9361, DuplexMode, FASTLOCK_PROFILES};
use crate::regs::*;
use crate::tables::{self, GainBand, SYNTH_LUT_FDD, SYNTH_LUT_TDD};
use crate::{Error, Result};

pub(crate) const MIN_CARRIER_FREQ: u64 = 47_000_000;
pub(crate) const MAX_CARRIER_FREQ: u64 = 6_000_000_000;
pub(crate) const MIN_VCO_FREQ: u64 = 6_000_000_000;
pub(crate) const RFPLL_MODULUS: u64 = 8_388_593;

/// TX carrier delta beyond which an automatic TX quadrature re-calibration
/// is due.
pub(crate) const QUAD_CAL_THRESHOLD_FREQ: u64 = 100_000_000;

/// Words per fastlock profile. Words 0..=4 hold the frequency words, the
/// rest pack VCO/charge-pump/loop-filter settings; word 15 is the ALC word.
pub(crate) const FASTLOCK_PROFILE_WORDS: usize = 16;

/// VCO divider setting for a carrier: shift the carrier up until the VCO
/// floor is cleared. Returns `(register_code, vco_freq)`; the actual
/// divider is `2 << code`.
pub(crate) fn calc_rfpll_divider(freq: u64) -> Result<(u8, u64)> {
    if !(MIN_CARRIER_FREQ..=MAX_CARRIER_FREQ).contains(&freq) {
        return Err(Error::Argument("carrier out of 47 MHz..6 GHz range"));
    }
    let mut vco = freq;
    let mut code: i32 = -1;
    while vco <= MIN_VCO_FREQ {
        vco <<= 1;
        code += 1;
    }
    Ok((code as u8, vco))
}

fn calc_rfpll_freq(parent: u64, integer: u64, fract: u64, vco_div: u8) -> u64 {
    let vco = parent * integer + (parent * fract) / RFPLL_MODULUS;
    vco >> (vco_div + 1)
}

fn rfpll_words(vco: u64, parent: u64) -> (u32, u32) {
    let integer = vco / parent;
    let rem = vco % parent;
    let fract = (rem * RFPLL_MODULUS + (parent >> 1)) / parent;
    (integer as u32, fract as u32)
}

fn synth_offs(tx: bool) -> u16 {
    if tx { TX_SYNTH_OFFSET } else { 0 }
}

impl<B: RegisterIo> Ad9361<B> {
    /// Pure range check; a representable carrier commits exactly.
    pub(crate) fn rfpll_round_rate(&self, rate: u64) -> Result<u64> {
        if !(MIN_CARRIER_FREQ..=MAX_CARRIER_FREQ).contains(&rate) {
            return Err(Error::Argument("carrier out of 47 MHz..6 GHz range"));
        }
        Ok(rate)
    }

    /// Tune one RF synthesizer to `rate` Hz.
    pub(crate) fn rfpll_set_rate(&mut self, id: ClockId, rate: u64) -> Result<()> {
        let tx = id == ClockId::TxRfPll;
        let (vco_div, vco) = calc_rfpll_divider(rate)?;
        let parent = self.clk_get_rate(if tx {
            ClockId::TxRefclk
        } else {
            ClockId::RxRefclk
        });
        if parent == 0 {
            return Err(Error::Argument("RFPLL reference rate is 0"));
        }
        debug!(
            "rfpll_set_rate {:?}: {} Hz (vco {} Hz, div code {})",
            id, rate, vco, vco_div
        );

        if self.config.tdd_skip_vco_cal {
            self.trx_vco_cal_control(tx, true)?;
        }

        // Tuning through the normal synth path requires fastlock off.
        self.fastlock_prepare(tx, 0, false)?;

        self.rfpll_vco_init(tx, vco, parent)?;

        let (integer, fract) = rfpll_words(vco, parent);
        let buf = [
            ((fract >> 16) as u8) & FRACT_BYTE_2_MASK,
            (fract >> 8) as u8,
            fract as u8,
            ((integer >> 8) as u8) & INTEGER_BYTE_1_MASK,
            integer as u8,
        ];
        self.bus
            .write_burst(REG_RX_FRACT_BYTE_2 + synth_offs(tx), &buf)?;
        let div_mask = if tx { TX_VCO_DIVIDER } else { RX_VCO_DIVIDER };
        self.bus
            .write_field(REG_RFPLL_DIVIDERS, div_mask, vco_div)?;

        let scale = &mut self.clk[id.index()];
        scale.mult = 1;
        scale.div = 1;
        scale.rate = calc_rfpll_freq(parent, integer as u64, fract as u64, vco_div);

        if !tx {
            self.load_gain_table(rate)?;
        } else if self.config.auto_tx_quad_cal
            && self.last_tx_quad_lo.abs_diff(rate) > QUAD_CAL_THRESHOLD_FREQ
        {
            // A failed quadrature pass does not abort the tune; the lock
            // poll and the VCO-cal unwind below still have to run.
            if let Err(err) = self.calibrate(OneShotCal::TxQuad { rx_phase: None }) {
                error!("tx quad calibration after retune failed: {}", err);
            }
            self.last_tx_quad_lo = rate;
        }

        let lock_reg = REG_RFPLL_CP_OVERRANGE_VCO_LOCK + synth_offs(tx);
        self.poll_cal_done(lock_reg, VCO_LOCK, true)?;

        if self.config.tdd_skip_vco_cal {
            self.trx_vco_cal_control(tx, false)?;
        }
        Ok(())
    }

    /// Read the carrier back from the hardware and refresh the cache. With
    /// a fastlock profile active, the frequency words live in the profile
    /// memory rather than the synth registers.
    pub(crate) fn rfpll_recalc_rate(&mut self, id: ClockId) -> Result<u64> {
        let tx = id == ClockId::TxRfPll;
        let parent = self.clk_get_rate(if tx {
            ClockId::TxRefclk
        } else {
            ClockId::RxRefclk
        });

        let profile = self.fastlock.current_profile[tx as usize];
        let (buf, vco_div) = if profile != 0 {
            let profile = profile - 1;
            let buf = [
                self.fastlock_readval(tx, profile, 4)?,
                self.fastlock_readval(tx, profile, 3)?,
                self.fastlock_readval(tx, profile, 2)?,
                self.fastlock_readval(tx, profile, 1)?,
                self.fastlock_readval(tx, profile, 0)?,
            ];
            let vco_div = self.fastlock_readval(tx, profile, 12)? & 0x0F;
            (buf, vco_div)
        } else {
            let mut buf = [0u8; 5];
            self.bus
                .read_burst(REG_RX_FRACT_BYTE_2 + synth_offs(tx), &mut buf)?;
            let div_mask = if tx { TX_VCO_DIVIDER } else { RX_VCO_DIVIDER };
            let vco_div = self.bus.read_field(REG_RFPLL_DIVIDERS, div_mask)?;
            (buf, vco_div)
        };

        let fract = (((buf[0] & FRACT_BYTE_2_MASK) as u64) << 16)
            | ((buf[1] as u64) << 8)
            | buf[2] as u64;
        let integer = (((buf[3] & INTEGER_BYTE_1_MASK) as u64) << 8) | buf[4] as u64;
        let rate = calc_rfpll_freq(parent, integer, fract, vco_div);

        let scale = &mut self.clk[id.index()];
        scale.mult = 1;
        scale.div = 1;
        scale.rate = rate;
        Ok(rate)
    }

    /// Program the VCO conditioning registers from the characterization LUT
    /// row for `vco_freq`.
    fn rfpll_vco_init(&mut self, tx: bool, vco_freq: u64, ref_clk: u64) -> Result<()> {
        let fdd_tables =
            self.config.duplex == DuplexMode::Fdd || self.config.tdd_use_fdd_vco_tables;
        let range = tables::synth_lut_range(ref_clk);
        let table = if fdd_tables {
            SYNTH_LUT_FDD[range]
        } else {
            SYNTH_LUT_TDD[range]
        };

        let vco_mhz = (vco_freq / 1_000_000) as u16;
        let row = table
            .iter()
            .find(|row| row.vco_mhz <= vco_mhz)
            .unwrap_or(table.last().ok_or(Error::Argument("empty synth LUT"))?);

        let offs = synth_offs(tx);
        self.bus.write(
            REG_RFPLL_VCO_OUTPUT + offs,
            PORB_VCO_LOGIC | (row.vco_output_level & VCO_OUTPUT_LEVEL),
        )?;
        self.bus
            .write_field(REG_RFPLL_ALC_VARACTOR + offs, VCO_VARACTOR, row.vco_varactor)?;
        self.bus.write(
            REG_RFPLL_VCO_BIAS_1 + offs,
            (row.vco_bias_ref & VCO_BIAS_REF) | ((row.vco_bias_tcf << 3) & VCO_BIAS_TCF),
        )?;
        self.bus.write_field(
            REG_RFPLL_FORCE_VCO_TUNE_1 + offs,
            VCO_CAL_OFFSET,
            row.vco_cal_offset,
        )?;
        self.bus.write_field(
            REG_RFPLL_VARACTOR_CTRL_1 + offs,
            VCO_VARACTOR_REFERENCE,
            row.vco_varactor_reference,
        )?;
        self.bus
            .write_field(REG_RFPLL_VCO_CAL_REF + offs, VCO_CAL_REF_TCF, 0)?;
        // Varactor offset 0, reference TCF 7.
        self.bus.write(
            REG_RFPLL_VARACTOR_CTRL_0 + offs,
            VCO_VARACTOR_REFERENCE_TCF & (7 << 5),
        )?;
        self.bus.write_field(
            REG_RFPLL_CP_CURRENT + offs,
            CHARGE_PUMP_CURRENT,
            row.charge_pump_current,
        )?;
        self.bus.write(
            REG_RFPLL_LOOP_FILTER_1 + offs,
            ((row.lf_c2 << 4) & LOOP_FILTER_C2) | (row.lf_c1 & LOOP_FILTER_C1),
        )?;
        self.bus.write(
            REG_RFPLL_LOOP_FILTER_2 + offs,
            ((row.lf_r1 << 4) & LOOP_FILTER_R1) | (row.lf_c3 & LOOP_FILTER_C3),
        )?;
        self.bus
            .write_field(REG_RFPLL_LOOP_FILTER_3 + offs, LOOP_FILTER_R3, row.lf_r3)?;
        Ok(())
    }

    /// Load the RX gain table bank for `freq` into both receivers. A no-op
    /// when the carrier stays inside the already-loaded band.
    pub(crate) fn load_gain_table(&mut self, freq: u64) -> Result<()> {
        let band = GainBand::from_freq(freq);
        if self.loaded_gain_band == Some(band) {
            return Ok(());
        }
        debug!("load_gain_table: band {:?}", band);
        let table = tables::gain_table(band);
        let both_rx = 3;

        self.bus
            .write_field(REG_AGC_CONFIG_2, AGC_USE_FULL_GAIN_TABLE, 1)?;
        self.bus
            .write(REG_GAIN_TABLE_CONFIG, START_GAIN_TABLE_CLOCK | both_rx)?;

        for (i, row) in table.iter().enumerate() {
            self.bus.write(REG_GAIN_TABLE_ADDRESS, i as u8)?;
            self.bus.write(REG_GAIN_TABLE_WRITE_DATA1, row[0])?;
            self.bus.write(REG_GAIN_TABLE_WRITE_DATA2, row[1])?;
            self.bus.write(REG_GAIN_TABLE_WRITE_DATA3, row[2])?;
            self.bus.write(
                REG_GAIN_TABLE_CONFIG,
                START_GAIN_TABLE_CLOCK | WRITE_GAIN_TABLE | both_rx,
            )?;
            // Dummy reads delay ~1 us for the table write to land.
            self.bus.write(REG_GAIN_TABLE_READ_DATA1, 0)?;
            self.bus.write(REG_GAIN_TABLE_READ_DATA1, 0)?;
        }

        self.bus
            .write(REG_GAIN_TABLE_CONFIG, START_GAIN_TABLE_CLOCK | both_rx)?;
        self.bus.write(REG_GAIN_TABLE_READ_DATA1, 0)?;
        self.bus.write(REG_GAIN_TABLE_READ_DATA1, 0)?;
        self.bus.write(REG_GAIN_TABLE_CONFIG, 0)?;

        self.loaded_gain_band = Some(band);
        Ok(())
    }

    // Fastlock profiles

    pub(crate) fn fastlock_readval(&mut self, tx: bool, profile: u8, word: u8) -> Result<u8> {
        let offs = synth_offs(tx);
        self.bus.write(
            REG_RX_FAST_LOCK_PROGRAM_ADDR + offs,
            ((profile << 4) & RX_FAST_LOCK_PROFILE_ADDR) | (word & RX_FAST_LOCK_PROFILE_WORD),
        )?;
        self.bus.read(REG_RX_FAST_LOCK_PROGRAM_READ + offs)
    }

    pub(crate) fn fastlock_writeval(
        &mut self,
        tx: bool,
        profile: u8,
        word: u8,
        val: u8,
        last: bool,
    ) -> Result<()> {
        let offs = synth_offs(tx);
        self.bus.write(
            REG_RX_FAST_LOCK_PROGRAM_ADDR + offs,
            ((profile << 4) & RX_FAST_LOCK_PROFILE_ADDR) | (word & RX_FAST_LOCK_PROFILE_WORD),
        )?;
        self.bus.write(REG_RX_FAST_LOCK_PROGRAM_DATA + offs, val)?;
        self.bus.write(
            REG_RX_FAST_LOCK_PROGRAM_CTRL + offs,
            RX_FAST_LOCK_PROGRAM_WRITE | RX_FAST_LOCK_PROGRAM_CLOCK_ENABLE,
        )?;
        if last {
            self.bus.write(REG_RX_FAST_LOCK_PROGRAM_CTRL + offs, 0)?;
        }
        Ok(())
    }

    /// Write a full 16-word profile into the fastlock memory and record it
    /// in the driver shadow.
    pub fn fastlock_load(
        &mut self,
        tx: bool,
        profile: u8,
        values: &[u8; FASTLOCK_PROFILE_WORDS],
    ) -> Result<()> {
        if profile as usize >= FASTLOCK_PROFILES {
            return Err(Error::Argument("fastlock profile out of range"));
        }
        for (word, val) in values.iter().enumerate() {
            self.fastlock_writeval(
                tx,
                profile,
                word as u8,
                *val,
                word == FASTLOCK_PROFILE_WORDS - 1,
            )?;
        }
        let entry = &mut self.fastlock.entry[tx as usize][profile as usize];
        entry.initialized = true;
        entry.alc_orig = values[15];
        entry.alc_written = values[15];
        Ok(())
    }

    /// Snapshot the synthesizer's current tuning into fastlock `profile`.
    pub fn fastlock_store(&mut self, tx: bool, profile: u8) -> Result<()> {
        if profile as usize >= FASTLOCK_PROFILES {
            return Err(Error::Argument("fastlock profile out of range"));
        }
        debug!("fastlock_store: tx {} profile {}", tx, profile);
        let offs = synth_offs(tx);

        let mut val = [0u8; FASTLOCK_PROFILE_WORDS];
        val[0] = self.bus.read(REG_RX_INTEGER_BYTE_0 + offs)?;
        val[1] = self.bus.read(REG_RX_INTEGER_BYTE_1 + offs)? & INTEGER_BYTE_1_MASK;
        val[2] = self.bus.read(REG_RX_FRACT_BYTE_0 + offs)?;
        val[3] = self.bus.read(REG_RX_FRACT_BYTE_1 + offs)?;
        val[4] = self.bus.read(REG_RX_FRACT_BYTE_2 + offs)? & FRACT_BYTE_2_MASK;

        let bias_ref = self.bus.read_field(REG_RFPLL_VCO_BIAS_1 + offs, VCO_BIAS_REF)?;
        let varactor = self
            .bus
            .read_field(REG_RFPLL_ALC_VARACTOR + offs, VCO_VARACTOR)?;
        val[5] = (bias_ref << 4) | varactor;

        let bias_tcf = self.bus.read_field(REG_RFPLL_VCO_BIAS_1 + offs, VCO_BIAS_TCF)?;
        let cp = self
            .bus
            .read_field(REG_RFPLL_CP_CURRENT + offs, CHARGE_PUMP_CURRENT)?;
        val[6] = (bias_tcf << 6) | (cp / 4);

        let r3 = self
            .bus
            .read_field(REG_RFPLL_LOOP_FILTER_3 + offs, LOOP_FILTER_R3)?;
        let level = self
            .bus
            .read_field(REG_RFPLL_VCO_OUTPUT + offs, VCO_OUTPUT_LEVEL)?;
        val[7] = (level << 4) | r3;

        val[8] = self.bus.read(REG_RFPLL_LOOP_FILTER_1 + offs)?;
        val[9] = self.bus.read(REG_RFPLL_LOOP_FILTER_2 + offs)?;
        val[10] = self
            .bus
            .read_field(REG_RFPLL_VARACTOR_CTRL_1 + offs, VCO_VARACTOR_REFERENCE)?;
        val[11] = self
            .bus
            .read_field(REG_RFPLL_FORCE_VCO_TUNE_1 + offs, VCO_CAL_OFFSET)?;
        val[12] = {
            let div_mask = if tx { TX_VCO_DIVIDER } else { RX_VCO_DIVIDER };
            self.bus.read_field(REG_RFPLL_DIVIDERS, div_mask)? & 0x0F
        };
        val[13] = self.bus.read(REG_RFPLL_VARACTOR_CTRL_0 + offs)?;
        val[14] = self.bus.read(REG_RFPLL_FORCE_VCO_TUNE_0 + offs)?;
        val[15] = self
            .bus
            .read_field(REG_RFPLL_ALC_VARACTOR + offs, INIT_ALC_VALUE)?
            << 1;

        self.fastlock_load(tx, profile, &val)
    }

    /// Dump a stored profile's 16 words back out of the fastlock memory.
    pub fn fastlock_save(
        &mut self,
        tx: bool,
        profile: u8,
    ) -> Result<[u8; FASTLOCK_PROFILE_WORDS]> {
        if profile as usize >= FASTLOCK_PROFILES {
            return Err(Error::Argument("fastlock profile out of range"));
        }
        let mut values = [0u8; FASTLOCK_PROFILE_WORDS];
        for (word, slot) in values.iter_mut().enumerate() {
            *slot = self.fastlock_readval(tx, profile, word as u8)?;
        }
        Ok(values)
    }

    /// Switch the synthesizer onto a stored profile.
    pub fn fastlock_recall(&mut self, tx: bool, profile: u8) -> Result<()> {
        if profile as usize >= FASTLOCK_PROFILES {
            return Err(Error::Argument("fastlock profile out of range"));
        }
        if !self.fastlock.entry[tx as usize][profile as usize].initialized {
            return Err(Error::Argument("fastlock profile not initialized"));
        }
        let offs = synth_offs(tx);
        self.bus.write_field(
            REG_RX_FAST_LOCK_SETUP + offs,
            RX_FAST_LOCK_PROFILE,
            profile,
        )?;

        // The ALC word only latches on a value change. When the target
        // profile's word matches the one currently applied, rewrite it with
        // the LSB toggled so the hardware sees an edge.
        let current = self.fastlock.current_profile[tx as usize];
        let new_alc = self.fastlock.entry[tx as usize][profile as usize].alc_written;
        let curr_alc = if current == 0 {
            self.bus.read_field(REG_RFPLL_FORCE_ALC + offs, FORCE_ALC_WORD)?
        } else {
            self.fastlock.entry[tx as usize][(current - 1) as usize].alc_written
        };
        if curr_alc >> 1 == new_alc >> 1 {
            let orig = self.fastlock.entry[tx as usize][profile as usize].alc_orig;
            let rewritten = orig ^ 1;
            self.fastlock_writeval(tx, profile, 15, rewritten, true)?;
            self.fastlock.entry[tx as usize][profile as usize].alc_written = rewritten;
        }

        self.fastlock_prepare(tx, profile, true)
    }

    /// Enter or leave fastlock mode. Idempotent; the driver shadow tracks
    /// which profile (if any) is live.
    pub(crate) fn fastlock_prepare(&mut self, tx: bool, profile: u8, prepare: bool) -> Result<()> {
        let offs = synth_offs(tx);
        let ready_mask = if tx {
            TX_SYNTH_READY_MASK
        } else {
            RX_SYNTH_READY_MASK
        };

        let is_prepared = self.fastlock.current_profile[tx as usize] != 0;
        if prepare == is_prepared {
            return Ok(());
        }
        debug!("fastlock_prepare: tx {} profile {} -> {}", tx, profile, prepare);

        if prepare {
            self.bus.write(
                REG_RX_FAST_LOCK_SETUP_INIT_DELAY + offs,
                self.config.fastlock_init_delay,
            )?;
            self.bus.write(
                REG_RX_FAST_LOCK_SETUP + offs,
                ((profile << 5) & RX_FAST_LOCK_PROFILE) | RX_FAST_LOCK_MODE_ENABLE,
            )?;
            self.bus.write(REG_RFPLL_LO_GEN_POWER_MODE + offs, 0x00)?;
        } else {
            self.bus.write(REG_RX_FAST_LOCK_SETUP + offs, 0)?;

            // Exiting fastlock leaves the ALC/VCO tune overrides armed;
            // pulse them so the synth returns to closed-loop control.
            self.bus
                .write_field(REG_RFPLL_FORCE_ALC + offs, FORCE_ALC_ENABLE, 1)?;
            self.bus
                .write_field(REG_RFPLL_FORCE_VCO_TUNE_1 + offs, VCO_TUNE_FORCE, 1)?;
            self.bus
                .write_field(REG_RFPLL_FORCE_ALC + offs, FORCE_ALC_ENABLE, 0)?;
            self.bus
                .write_field(REG_RFPLL_FORCE_VCO_TUNE_1 + offs, VCO_TUNE_FORCE, 0)?;

            self.bus.write(REG_RFPLL_LO_GEN_POWER_MODE + offs, 0x0A)?;
        }

        self.bus
            .write_field(REG_ENSM_CONFIG_2, ready_mask, (!prepare) as u8)?;
        self.fastlock.current_profile[tx as usize] = if prepare { profile + 1 } else { 0 };
        Ok(())
    }

    /// Convenience carrier accessors over the clock graph.
    pub fn set_rx_lo_freq(&mut self, freq: u64) -> Result<()> {
        self.clk_set_rate(ClockId::RxRfPll, freq)
    }

    pub fn set_tx_lo_freq(&mut self, freq: u64) -> Result<()> {
        self.clk_set_rate(ClockId::TxRfPll, freq)
    }

    pub fn rx_lo_freq(&self) -> u64 {
        self.clk_get_rate(ClockId::RxRfPll)
    }

    pub fn tx_lo_freq(&self) -> u64 {
        self.clk_get_rate(ClockId::TxRfPll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_picks_first_vco_above_floor() {
        let (code, vco) = calc_rfpll_divider(2_400_000_000).unwrap();
        assert_eq!(code, 1);
        assert_eq!(vco, 9_600_000_000);

        let (code, vco) = calc_rfpll_divider(70_000_000).unwrap();
        assert_eq!(code, 6);
        assert_eq!(vco, 8_960_000_000);

        assert!(calc_rfpll_divider(46_999_999).is_err());
        assert!(calc_rfpll_divider(6_000_000_001).is_err());
    }

    #[test]
    fn freq_words_round_trip_within_one_lsb() {
        let parent = 40_000_000;
        for freq in [70_000_000u64, 433_920_000, 915_000_000, 2_412_000_000, 5_800_000_000] {
            let (_, vco) = calc_rfpll_divider(freq).unwrap();
            let (integer, fract) = rfpll_words(vco, parent);
            let (vco_div, _) = calc_rfpll_divider(freq).unwrap();
            let back = calc_rfpll_freq(parent, integer as u64, fract as u64, vco_div);
            let lsb = (parent / RFPLL_MODULUS).max(1) + 1;
            assert!(
                back.abs_diff(freq) <= lsb * (1u64 << (vco_div + 1)),
                "{freq} -> {back}"
            );
        }
    }
}
