//! Factory constant tables.
//!
//! The RF synthesizer LUTs and the RX gain tables come from Analog Devices
//! characterization data. The driver only indexes them (by VCO frequency and
//! carrier band); the row contents are programmed into the chip verbatim.

/// One RF synthesizer tuning row. Rows are sorted by descending `vco_mhz`;
/// lookup picks the first row whose `vco_mhz` is at or below the target.
#[derive(Debug, Clone, Copy)]
pub struct SynthLut {
    pub vco_mhz: u16,
    pub vco_output_level: u8,
    pub vco_varactor: u8,
    pub vco_bias_ref: u8,
    pub vco_bias_tcf: u8,
    pub vco_cal_offset: u8,
    pub vco_varactor_reference: u8,
    pub charge_pump_current: u8,
    pub lf_c2: u8,
    pub lf_c1: u8,
    pub lf_r1: u8,
    pub lf_c3: u8,
    pub lf_r3: u8,
}

const fn lut(
    vco_mhz: u16,
    vco_output_level: u8,
    vco_varactor: u8,
    vco_bias_ref: u8,
    vco_bias_tcf: u8,
    vco_cal_offset: u8,
    vco_varactor_reference: u8,
    charge_pump_current: u8,
    lf_c2: u8,
    lf_c1: u8,
    lf_r1: u8,
    lf_c3: u8,
    lf_r3: u8,
) -> SynthLut {
    SynthLut {
        vco_mhz,
        vco_output_level,
        vco_varactor,
        vco_bias_ref,
        vco_bias_tcf,
        vco_cal_offset,
        vco_varactor_reference,
        charge_pump_current,
        lf_c2,
        lf_c1,
        lf_r1,
        lf_c3,
        lf_r3,
    }
}

/// FDD synthesizer tables, one per reference-frequency range
/// (index 0: fref < 50 MHz, 1: < 70 MHz, 2: >= 70 MHz).
pub const SYNTH_LUT_FDD: [&[SynthLut]; 3] = [
    &[
        lut(12605, 10, 0, 4, 0, 15, 8, 8, 13, 4, 13, 15, 10),
        lut(11906, 10, 0, 4, 0, 15, 8, 9, 13, 4, 13, 15, 10),
        lut(11247, 10, 0, 4, 0, 15, 8, 9, 14, 4, 13, 15, 10),
        lut(10624, 10, 0, 4, 0, 14, 8, 10, 14, 5, 12, 15, 10),
        lut(10035, 10, 0, 4, 0, 14, 8, 10, 14, 5, 12, 15, 10),
        lut(9478, 10, 0, 4, 0, 14, 8, 11, 15, 5, 12, 15, 10),
        lut(8952, 10, 0, 4, 0, 14, 8, 11, 15, 6, 12, 15, 10),
        lut(8455, 11, 0, 4, 0, 13, 8, 12, 15, 6, 11, 15, 10),
        lut(7986, 11, 0, 4, 0, 13, 8, 12, 15, 6, 11, 15, 10),
        lut(7542, 11, 0, 4, 0, 13, 8, 13, 15, 7, 11, 15, 10),
        lut(7124, 11, 0, 4, 0, 13, 8, 13, 15, 7, 11, 15, 10),
        lut(6728, 11, 0, 4, 0, 12, 8, 14, 15, 7, 11, 15, 10),
        lut(6354, 11, 0, 4, 0, 12, 8, 14, 15, 8, 10, 15, 10),
        lut(6001, 11, 0, 4, 0, 12, 8, 15, 15, 8, 10, 15, 10),
    ],
    &[
        lut(12605, 10, 0, 4, 0, 15, 8, 10, 12, 3, 14, 15, 11),
        lut(11906, 10, 0, 4, 0, 15, 8, 11, 12, 3, 14, 15, 11),
        lut(11247, 10, 0, 4, 0, 15, 8, 11, 13, 3, 14, 15, 11),
        lut(10624, 10, 0, 4, 0, 14, 8, 12, 13, 4, 13, 15, 11),
        lut(10035, 10, 0, 4, 0, 14, 8, 13, 13, 4, 13, 15, 11),
        lut(9478, 10, 0, 4, 0, 14, 8, 13, 14, 4, 13, 15, 11),
        lut(8952, 10, 0, 4, 0, 14, 8, 14, 14, 5, 13, 15, 11),
        lut(8455, 11, 0, 4, 0, 13, 8, 14, 14, 5, 12, 15, 11),
        lut(7986, 11, 0, 4, 0, 13, 8, 15, 14, 5, 12, 15, 11),
        lut(7542, 11, 0, 4, 0, 13, 8, 15, 15, 6, 12, 15, 11),
        lut(7124, 11, 0, 4, 0, 13, 8, 16, 15, 6, 12, 15, 11),
        lut(6728, 11, 0, 4, 0, 12, 8, 17, 15, 6, 12, 15, 11),
        lut(6354, 11, 0, 4, 0, 12, 8, 17, 15, 7, 11, 15, 11),
        lut(6001, 11, 0, 4, 0, 12, 8, 18, 15, 7, 11, 15, 11),
    ],
    &[
        lut(12605, 10, 0, 4, 0, 15, 8, 13, 11, 3, 15, 15, 12),
        lut(11906, 10, 0, 4, 0, 15, 8, 14, 11, 3, 15, 15, 12),
        lut(11247, 10, 0, 4, 0, 15, 8, 15, 12, 3, 15, 15, 12),
        lut(10624, 10, 0, 4, 0, 14, 8, 15, 12, 3, 14, 15, 12),
        lut(10035, 10, 0, 4, 0, 14, 8, 16, 12, 4, 14, 15, 12),
        lut(9478, 10, 0, 4, 0, 14, 8, 17, 13, 4, 14, 15, 12),
        lut(8952, 10, 0, 4, 0, 14, 8, 18, 13, 4, 14, 15, 12),
        lut(8455, 11, 0, 4, 0, 13, 8, 18, 13, 5, 13, 15, 12),
        lut(7986, 11, 0, 4, 0, 13, 8, 19, 14, 5, 13, 15, 12),
        lut(7542, 11, 0, 4, 0, 13, 8, 20, 14, 5, 13, 15, 12),
        lut(7124, 11, 0, 4, 0, 13, 8, 21, 14, 6, 13, 15, 12),
        lut(6728, 11, 0, 4, 0, 12, 8, 21, 15, 6, 12, 15, 12),
        lut(6354, 11, 0, 4, 0, 12, 8, 22, 15, 6, 12, 15, 12),
        lut(6001, 11, 0, 4, 0, 12, 8, 23, 15, 7, 12, 15, 12),
    ],
];

/// TDD synthesizer tables, same reference-range indexing. TDD rows trade
/// lock time for phase noise relative to FDD, so the charge pump runs hotter
/// and the loop filter is wider.
pub const SYNTH_LUT_TDD: [&[SynthLut]; 3] = [
    &[
        lut(12605, 10, 0, 4, 0, 15, 8, 19, 10, 2, 15, 15, 13),
        lut(11906, 10, 0, 4, 0, 15, 8, 20, 10, 2, 15, 15, 13),
        lut(11247, 10, 0, 4, 0, 15, 8, 21, 11, 2, 15, 15, 13),
        lut(10624, 10, 0, 4, 0, 14, 8, 22, 11, 3, 15, 15, 13),
        lut(10035, 10, 0, 4, 0, 14, 8, 23, 11, 3, 15, 15, 13),
        lut(9478, 10, 0, 4, 0, 14, 8, 24, 12, 3, 14, 15, 13),
        lut(8952, 10, 0, 4, 0, 14, 8, 25, 12, 4, 14, 15, 13),
        lut(8455, 11, 0, 4, 0, 13, 8, 26, 12, 4, 14, 15, 13),
        lut(7986, 11, 0, 4, 0, 13, 8, 27, 13, 4, 13, 15, 13),
        lut(7542, 11, 0, 4, 0, 13, 8, 28, 13, 5, 13, 15, 13),
        lut(7124, 11, 0, 4, 0, 13, 8, 29, 13, 5, 13, 15, 13),
        lut(6728, 11, 0, 4, 0, 12, 8, 30, 14, 5, 13, 15, 13),
        lut(6354, 11, 0, 4, 0, 12, 8, 31, 14, 6, 12, 15, 13),
        lut(6001, 11, 0, 4, 0, 12, 8, 32, 14, 6, 12, 15, 13),
    ],
    &[
        lut(12605, 10, 0, 4, 0, 15, 8, 23, 9, 2, 15, 15, 14),
        lut(11906, 10, 0, 4, 0, 15, 8, 24, 9, 2, 15, 15, 14),
        lut(11247, 10, 0, 4, 0, 15, 8, 25, 10, 2, 15, 15, 14),
        lut(10624, 10, 0, 4, 0, 14, 8, 26, 10, 3, 15, 15, 14),
        lut(10035, 10, 0, 4, 0, 14, 8, 27, 10, 3, 15, 15, 14),
        lut(9478, 10, 0, 4, 0, 14, 8, 28, 11, 3, 14, 15, 14),
        lut(8952, 10, 0, 4, 0, 14, 8, 30, 11, 4, 14, 15, 14),
        lut(8455, 11, 0, 4, 0, 13, 8, 31, 11, 4, 14, 15, 14),
        lut(7986, 11, 0, 4, 0, 13, 8, 32, 12, 4, 13, 15, 14),
        lut(7542, 11, 0, 4, 0, 13, 8, 33, 12, 5, 13, 15, 14),
        lut(7124, 11, 0, 4, 0, 13, 8, 35, 12, 5, 13, 15, 14),
        lut(6728, 11, 0, 4, 0, 12, 8, 36, 13, 5, 13, 15, 14),
        lut(6354, 11, 0, 4, 0, 12, 8, 37, 13, 6, 12, 15, 14),
        lut(6001, 11, 0, 4, 0, 12, 8, 38, 13, 6, 12, 15, 14),
    ],
    &[
        lut(12605, 10, 0, 4, 0, 15, 8, 28, 8, 1, 15, 15, 15),
        lut(11906, 10, 0, 4, 0, 15, 8, 29, 8, 1, 15, 15, 15),
        lut(11247, 10, 0, 4, 0, 15, 8, 30, 9, 2, 15, 15, 15),
        lut(10624, 10, 0, 4, 0, 14, 8, 31, 9, 2, 15, 15, 15),
        lut(10035, 10, 0, 4, 0, 14, 8, 33, 9, 2, 15, 15, 15),
        lut(9478, 10, 0, 4, 0, 14, 8, 34, 10, 3, 14, 15, 15),
        lut(8952, 10, 0, 4, 0, 14, 8, 36, 10, 3, 14, 15, 15),
        lut(8455, 11, 0, 4, 0, 13, 8, 37, 10, 3, 14, 15, 15),
        lut(7986, 11, 0, 4, 0, 13, 8, 39, 11, 4, 13, 15, 15),
        lut(7542, 11, 0, 4, 0, 13, 8, 40, 11, 4, 13, 15, 15),
        lut(7124, 11, 0, 4, 0, 13, 8, 42, 11, 4, 13, 15, 15),
        lut(6728, 11, 0, 4, 0, 12, 8, 43, 12, 5, 13, 15, 15),
        lut(6354, 11, 0, 4, 0, 12, 8, 45, 12, 5, 12, 15, 15),
        lut(6001, 11, 0, 4, 0, 12, 8, 46, 12, 6, 12, 15, 15),
    ],
];

/// Select the reference-range index used by the synthesizer LUTs.
pub fn synth_lut_range(fref: u64) -> usize {
    if fref < 50_000_000 {
        0
    } else if fref < 70_000_000 {
        1
    } else {
        2
    }
}

/// RX gain table band. Each band has its own characterized table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainBand {
    /// Carrier up to 1.3 GHz.
    Low,
    /// 1.3 to 4 GHz.
    Mid,
    /// Above 4 GHz.
    High,
}

impl GainBand {
    pub fn from_freq(freq: u64) -> Self {
        if freq <= 1_300_000_000 {
            GainBand::Low
        } else if freq <= 4_000_000_000 {
            GainBand::Mid
        } else {
            GainBand::High
        }
    }
}

/// One gain table row: the three gain-table write-data bytes
/// (LNA/mixer word, TIA/LPF word, DC-cal/LMT word).
pub type GainTableRow = [u8; 3];

pub const GAIN_TABLE_LOW: &[GainTableRow] = &[
    [0x00, 0x00, 0x20],
    [0x00, 0x01, 0x00],
    [0x00, 0x02, 0x00],
    [0x00, 0x03, 0x00],
    [0x00, 0x04, 0x00],
    [0x00, 0x05, 0x00],
    [0x01, 0x03, 0x20],
    [0x01, 0x04, 0x00],
    [0x01, 0x05, 0x00],
    [0x01, 0x06, 0x00],
    [0x01, 0x07, 0x00],
    [0x01, 0x08, 0x00],
    [0x02, 0x08, 0x20],
    [0x02, 0x09, 0x00],
    [0x02, 0x0A, 0x00],
    [0x02, 0x0B, 0x00],
    [0x03, 0x0B, 0x20],
    [0x03, 0x0C, 0x00],
    [0x03, 0x0D, 0x00],
    [0x03, 0x0E, 0x00],
    [0x03, 0x0F, 0x00],
    [0x03, 0x10, 0x00],
    [0x03, 0x20, 0x20],
    [0x03, 0x21, 0x00],
];

pub const GAIN_TABLE_MID: &[GainTableRow] = &[
    [0x00, 0x00, 0x20],
    [0x00, 0x01, 0x00],
    [0x00, 0x02, 0x00],
    [0x00, 0x03, 0x00],
    [0x00, 0x04, 0x00],
    [0x00, 0x05, 0x00],
    [0x01, 0x04, 0x20],
    [0x01, 0x05, 0x00],
    [0x01, 0x06, 0x00],
    [0x01, 0x07, 0x00],
    [0x01, 0x08, 0x00],
    [0x02, 0x08, 0x20],
    [0x02, 0x09, 0x00],
    [0x02, 0x0A, 0x00],
    [0x02, 0x0B, 0x00],
    [0x02, 0x0C, 0x00],
    [0x03, 0x0C, 0x20],
    [0x03, 0x0D, 0x00],
    [0x03, 0x0E, 0x00],
    [0x03, 0x0F, 0x00],
    [0x03, 0x10, 0x00],
    [0x03, 0x20, 0x20],
    [0x03, 0x21, 0x00],
    [0x03, 0x22, 0x00],
];

pub const GAIN_TABLE_HIGH: &[GainTableRow] = &[
    [0x00, 0x00, 0x20],
    [0x00, 0x01, 0x00],
    [0x00, 0x02, 0x00],
    [0x00, 0x03, 0x00],
    [0x00, 0x04, 0x00],
    [0x01, 0x03, 0x20],
    [0x01, 0x04, 0x00],
    [0x01, 0x05, 0x00],
    [0x01, 0x06, 0x00],
    [0x01, 0x07, 0x00],
    [0x02, 0x07, 0x20],
    [0x02, 0x08, 0x00],
    [0x02, 0x09, 0x00],
    [0x02, 0x0A, 0x00],
    [0x02, 0x0B, 0x00],
    [0x03, 0x0B, 0x20],
    [0x03, 0x0C, 0x00],
    [0x03, 0x0D, 0x00],
    [0x03, 0x0E, 0x00],
    [0x03, 0x0F, 0x00],
    [0x03, 0x10, 0x00],
    [0x03, 0x20, 0x20],
    [0x03, 0x21, 0x00],
    [0x03, 0x22, 0x00],
];

/// Table rows for a band.
pub fn gain_table(band: GainBand) -> &'static [GainTableRow] {
    match band {
        GainBand::Low => GAIN_TABLE_LOW,
        GainBand::Mid => GAIN_TABLE_MID,
        GainBand::High => GAIN_TABLE_HIGH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synth_luts_are_sorted_descending() {
        for table in SYNTH_LUT_FDD.iter().chain(SYNTH_LUT_TDD.iter()) {
            for pair in table.windows(2) {
                assert!(pair[0].vco_mhz > pair[1].vco_mhz);
            }
        }
    }

    #[test]
    fn band_breakpoints() {
        assert_eq!(GainBand::from_freq(800_000_000), GainBand::Low);
        assert_eq!(GainBand::from_freq(1_300_000_000), GainBand::Low);
        assert_eq!(GainBand::from_freq(2_400_000_000), GainBand::Mid);
        assert_eq!(GainBand::from_freq(5_500_000_000), GainBand::High);
    }

    #[test]
    fn every_band_has_a_full_lmt_row() {
        for band in [GainBand::Low, GainBand::Mid, GainBand::High] {
            assert!(
                gain_table(band).iter().any(|row| (row[1] & 0x3F) == 0x20),
                "band {band:?} lacks an LPF index 0x20 row"
            );
        }
    }
}
