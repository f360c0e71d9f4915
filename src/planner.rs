//! Frequency planner.
//!
//! Given a target TX baseband sample rate, chooses a consistent rate for
//! every node of the RX and TX divider cascades plus the BBPLL. The search
//! walks a fixed table of divider tuples from the fastest (most oversampled)
//! assignment downwards; the "rate governor" level picks the starting row,
//! trading oversampling headroom for converter power.

use log::debug;

use crate::bus::RegisterIo;
use crate::clocks::{
    ClockId, MAX_ADC_CLK, MAX_BBPLL_DIV, MAX_BBPLL_FREQ, MAX_DAC_CLK, MIN_ADC_CLK, MIN_BBPLL_DIV,
};
use crate::device::Ad9361;
use crate::{Error, Result};

/// Divider tuples `[adc_over_clkrf, d2, d1, df]`: the converter runs at
/// `clkrf * tuple[0]`, and the three cascade stages divide by the remaining
/// entries. Ordered from highest oversampling to pass-through.
const CLK_DIVIDERS: [[u32; 4]; 7] = [
    [12, 3, 2, 2],
    [8, 2, 2, 2],
    [6, 3, 1, 2],
    [4, 2, 2, 1],
    [3, 3, 1, 1],
    [2, 2, 1, 1],
    [1, 1, 1, 1],
];

/// Planned RX-side rates, BBPLL down to the sample clock, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxChainRates {
    pub bbpll: u64,
    pub adc: u64,
    pub r2: u64,
    pub r1: u64,
    pub clkrf: u64,
    pub sampl: u64,
}

/// Planned TX-side rates, BBPLL down to the sample clock, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxChainRates {
    pub bbpll: u64,
    pub dac: u64,
    pub t2: u64,
    pub t1: u64,
    pub clktf: u64,
    pub sampl: u64,
}

struct Solution {
    index_rx: usize,
    index_tx: usize,
    adc_rate: u64,
    dac_rate: u64,
}

/// Search one governor level: take the first table row (at or below
/// `level`) whose ADC rate lands in range, then derive the TX row index
/// from the DAC/ADC ratio.
fn try_level(level: usize, clkrf: u64, clktf: u64) -> Option<Solution> {
    for (i, row) in CLK_DIVIDERS.iter().enumerate().skip(level) {
        let adc_rate = clkrf * row[0] as u64;
        let mut dac_rate = clktf * row[0] as u64;

        if !(MIN_ADC_CLK..=MAX_ADC_CLK).contains(&adc_rate) {
            continue;
        }

        let ratio: i64 = if dac_rate > adc_rate {
            -((dac_rate / adc_rate) as i64)
        } else {
            (adc_rate / dac_rate) as i64
        };

        let index_rx = i as i64;
        let index_tx = if adc_rate <= MAX_DAC_CLK {
            dac_rate = adc_rate;
            index_rx - if ratio == 1 { 0 } else { ratio }
        } else {
            dac_rate = adc_rate / 2;
            if i == 4 && ratio >= 0 {
                // 3/2 is not an integer divider step.
                7
            } else {
                index_rx + if i == 5 && ratio >= 0 { 1 } else { 2 }
                    - if ratio == 1 { 0 } else { ratio }
            }
        };

        if !(0..=6).contains(&index_tx) {
            return None;
        }
        return Some(Solution {
            index_rx: index_rx as usize,
            index_tx: index_tx as usize,
            adc_rate,
            dac_rate,
        });
    }
    None
}

impl<B: RegisterIo> Ad9361<B> {
    /// Plan the full clock chain for `tx_sample_rate`, starting the divider
    /// search at `rate_gov`. Does not touch hardware.
    pub fn plan_clock_chain(
        &self,
        tx_sample_rate: u64,
        rate_gov: u32,
    ) -> Result<(RxChainRates, TxChainRates)> {
        let rx_intdec = self.rx_fir_dec as u64;
        let tx_intdec = self.tx_fir_int as u64;

        let ceiling = if self.config.rx2tx2 {
            61_440_000
        } else {
            122_880_000
        };
        if tx_sample_rate > ceiling {
            return Err(Error::Argument("sample rate above interface ceiling"));
        }
        if tx_sample_rate == 0 {
            return Err(Error::Argument("sample rate is 0"));
        }

        let clktf = tx_sample_rate * tx_intdec;
        let clkrf = tx_sample_rate * rx_intdec * if self.config.rx_eq_2tx { 2 } else { 1 };
        debug!(
            "plan_clock_chain: rate {} gov {} clkrf {} clktf {}",
            tx_sample_rate, rate_gov, clkrf, clktf
        );

        // The search escalates through the governor levels instead of
        // recursing: each level scans the table from its own row down, so a
        // row that yields an out-of-range TX index at one level gets skipped
        // once the level passes it.
        let mut solution = None;
        for level in rate_gov as usize..=6 {
            solution = try_level(level, clkrf, clktf);
            if solution.is_some() {
                break;
            }
        }
        let sol = solution.ok_or(Error::NoSolution("no divider assignment for sample rate"))?;

        let mut div = MAX_BBPLL_DIV as u64;
        let bbpll = loop {
            let bbpll = sol.adc_rate * div;
            div >>= 1;
            if bbpll <= MAX_BBPLL_FREQ || div < MIN_BBPLL_DIV as u64 {
                break bbpll;
            }
        };

        let rx_div = &CLK_DIVIDERS[sol.index_rx];
        let tx_div = &CLK_DIVIDERS[sol.index_tx];

        let rx = {
            let r2 = sol.adc_rate / rx_div[1] as u64;
            let r1 = r2 / rx_div[2] as u64;
            let clkrf = r1 / rx_div[3] as u64;
            RxChainRates {
                bbpll,
                adc: sol.adc_rate,
                r2,
                r1,
                clkrf,
                sampl: clkrf / rx_intdec,
            }
        };
        let tx = {
            let t2 = sol.dac_rate / tx_div[1] as u64;
            let t1 = t2 / tx_div[2] as u64;
            let clktf = t1 / tx_div[3] as u64;
            TxChainRates {
                bbpll,
                dac: sol.dac_rate,
                t2,
                t1,
                clktf,
                sampl: clktf / tx_intdec,
            }
        };
        debug!("plan_clock_chain: rx {:?} tx {:?}", rx, tx);
        Ok((rx, tx))
    }

    /// The interface data clock must appear somewhere in the RX cascade or
    /// the serializer cannot be clocked.
    fn validate_clock_chain(&self, rx: &RxChainRates) -> Result<()> {
        let data_clk = if self.config.rx2tx2 { 4 } else { 2 } * rx.sampl;
        let candidates = [rx.adc, rx.r2, rx.r1, rx.clkrf, rx.sampl];
        if candidates.iter().any(|c| c.abs_diff(data_clk) < 4) {
            Ok(())
        } else {
            Err(Error::Argument(
                "no clock in the RX chain matches the data clock rate",
            ))
        }
    }

    /// Commit a planned chain to the hardware, RX and TX interleaved from
    /// the converters downwards.
    pub fn set_clock_chain(&mut self, rx: &RxChainRates, tx: &TxChainRates) -> Result<()> {
        self.validate_clock_chain(rx)?;
        self.clk_set_rate(ClockId::BbPll, rx.bbpll)?;

        let pairs = [
            (ClockId::Adc, rx.adc, ClockId::Dac, tx.dac),
            (ClockId::R2, rx.r2, ClockId::T2, tx.t2),
            (ClockId::R1, rx.r1, ClockId::T1, tx.t1),
            (ClockId::ClkRf, rx.clkrf, ClockId::ClkTf, tx.clktf),
            (ClockId::RxSampl, rx.sampl, ClockId::TxSampl, tx.sampl),
        ];
        for (rx_id, rx_rate, tx_id, tx_rate) in pairs {
            self.clk_set_rate(rx_id, rx_rate)?;
            self.clk_set_rate(tx_id, tx_rate)?;
        }
        Ok(())
    }

    /// Plan and commit in one step, using the configured governor level.
    pub fn set_sample_rate(&mut self, tx_sample_rate: u64) -> Result<()> {
        let (rx, tx) = self.plan_clock_chain(tx_sample_rate, self.config.rate_governor)?;
        self.set_clock_chain(&rx, &tx)
    }

    /// Committed TX sample rate.
    pub fn sample_rate(&self) -> u64 {
        self.clk_get_rate(ClockId::TxSampl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_rows_multiply_out() {
        for row in CLK_DIVIDERS {
            assert_eq!(row[0], row[1] * row[2] * row[3]);
        }
    }

    #[test]
    fn fastest_level_for_lte20() {
        // 30.72 MS/s, no FIR: ADC at 368.64 MHz forces the halved DAC and
        // a TX row two steps down.
        let sol = try_level(0, 30_720_000, 30_720_000).unwrap();
        assert_eq!(sol.index_rx, 0);
        assert_eq!(sol.index_tx, 2);
        assert_eq!(sol.adc_rate, 368_640_000);
        assert_eq!(sol.dac_rate, 184_320_000);
        // TX cascade still lands on the requested rate.
        let tx_div = &CLK_DIVIDERS[sol.index_tx];
        assert_eq!(
            sol.dac_rate / (tx_div[1] * tx_div[2] * tx_div[3]) as u64,
            30_720_000
        );
    }

    #[test]
    fn ceiling_rate_resolves_with_halved_dac() {
        let sol = try_level(0, 61_440_000, 61_440_000).unwrap();
        assert_eq!(sol.index_rx, 1);
        assert_eq!(sol.index_tx, 3);
        assert!(sol.adc_rate <= MAX_ADC_CLK);
        assert!(sol.dac_rate <= MAX_DAC_CLK);
        let tx_div = &CLK_DIVIDERS[sol.index_tx];
        assert_eq!(
            sol.dac_rate / (tx_div[1] * tx_div[2] * tx_div[3]) as u64,
            61_440_000
        );
    }
}
