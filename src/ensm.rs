//! Enable state machine (ENSM) control.
//!
//! The ENSM gates the analog signal chains. The driver moves it over SPI
//! (or hands control to the ENABLE/TXNRX pins); which transitions are legal
//! depends on the configured duplex mode. Calibrations use the
//! force/restore pair to park the machine in ALERT and put it back exactly
//! as found, including pin-control ownership.

use log::{debug, error, warn};

use crate::bus::RegisterIo;
use crate::clocks::ClockId;
use crate::device::{Ad9361, DuplexMode};
use crate::regs::*;
use crate::{Error, Result};

/// ENSM state. All but [`Sleep`](Self::Sleep) correspond to hardware
/// readback codes; SLEEP is tracked in software because the state register
/// reads back as wait once the clocks stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsmState {
    SleepWait,
    Alert,
    Tx,
    TxFlush,
    Rx,
    RxFlush,
    Fdd,
    FddFlush,
    Sleep,
}

impl EnsmState {
    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            0x5 => EnsmState::Alert,
            0x6 => EnsmState::Tx,
            0x7 => EnsmState::TxFlush,
            0x8 => EnsmState::Rx,
            0x9 => EnsmState::RxFlush,
            0xA => EnsmState::Fdd,
            0xB => EnsmState::FddFlush,
            0x0 => EnsmState::SleepWait,
            other => {
                warn!("unknown ENSM readback code {:#x}", other);
                EnsmState::SleepWait
            }
        }
    }
}

impl<B: RegisterIo> Ad9361<B> {
    /// Move the ENSM to `state` through SPI control.
    ///
    /// `pinctrl` leaves the ENABLE/TXNRX pins in charge afterwards. TX/RX
    /// are TDD states reachable from ALERT only; FDD requires FDD duplex
    /// configuration.
    pub fn ensm_set_state(&mut self, state: EnsmState, pinctrl: bool) -> Result<()> {
        let fdd = self.config.duplex == DuplexMode::Fdd;
        debug!("ensm_set_state: {:?} -> {:?}", self.ensm_state, state);

        if self.ensm_state == EnsmState::Sleep {
            self.bus.write(
                REG_CLOCK_ENABLE,
                DIGITAL_POWER_UP | CLOCK_ENABLE_DFLT | BBPLL_ENABLE,
            )?;
            self.bus.delay_us(20);
            self.bus
                .write(REG_ENSM_CONFIG_1, TO_ALERT | FORCE_ALERT_STATE)?;
            self.trx_vco_cal_control(false, true)?;
            self.trx_vco_cal_control(true, true)?;
        }

        let mut val = TO_ALERT
            | if self.config.ensm_pin_pulse_mode { 0 } else { LEVEL_MODE }
            | if pinctrl { ENABLE_ENSM_PIN_CTRL } else { 0 };

        let from = self.ensm_state;
        let illegal = move |requested| Error::IllegalTransition {
            from,
            requested,
            fdd,
        };

        match state {
            EnsmState::Tx => {
                val |= FORCE_TX_ON;
                if fdd || self.ensm_state != EnsmState::Alert {
                    return Err(illegal(state));
                }
            }
            EnsmState::Rx => {
                val |= FORCE_RX_ON;
                if fdd || self.ensm_state != EnsmState::Alert {
                    return Err(illegal(state));
                }
            }
            EnsmState::Fdd => {
                val |= FORCE_TX_ON | FORCE_RX_ON;
                if !fdd {
                    return Err(illegal(state));
                }
            }
            EnsmState::Alert => {
                val &= !(FORCE_TX_ON | FORCE_RX_ON);
                val |= TO_ALERT | FORCE_ALERT_STATE;
            }
            EnsmState::SleepWait => {}
            EnsmState::Sleep => {
                self.trx_vco_cal_control(false, false)?;
                self.trx_vco_cal_control(true, false)?;
                self.bus.write(REG_ENSM_CONFIG_1, 0)?;
                self.bus.write(
                    REG_ENSM_CONFIG_1,
                    if fdd { FORCE_TX_ON } else { FORCE_RX_ON },
                )?;
                // Flush 384 converter clock cycles before stopping clocks.
                let adc = self.clk_get_rate(ClockId::Adc).max(1);
                self.bus.delay_us((384_000_000 / adc) as u32);
                self.bus.write(REG_ENSM_CONFIG_1, 0)?;
                self.bus.delay_us(1);
                self.bus.write(REG_CLOCK_ENABLE, 0)?;
                self.ensm_state = EnsmState::Sleep;
                return Ok(());
            }
            EnsmState::TxFlush | EnsmState::RxFlush | EnsmState::FddFlush => {
                return Err(illegal(state));
            }
        }

        self.bus.write(REG_ENSM_CONFIG_1, val)?;

        // Forcing RX with manual gain control re-latches a stale gain word;
        // pulse the gain-word reset so the programmed index takes effect.
        if val & FORCE_RX_ON != 0 && self.manual_gain_active() {
            let tmp = self.bus.read(REG_SMALL_LMT_OVERLOAD_THRESH)?;
            self.bus.write(
                REG_SMALL_LMT_OVERLOAD_THRESH,
                (tmp & SMALL_LMT_OVERLOAD_THRESH_MASK) | FORCE_PD_RESET_RX1 | FORCE_PD_RESET_RX2,
            )?;
            self.bus.write(
                REG_SMALL_LMT_OVERLOAD_THRESH,
                tmp & SMALL_LMT_OVERLOAD_THRESH_MASK,
            )?;
        }

        self.ensm_state = state;
        Ok(())
    }

    /// Force the ENSM to `state` regardless of duplex rules, snapshotting
    /// the hardware state (and pin-control ownership) for
    /// [`ensm_restore_prev_state`](Self::ensm_restore_prev_state).
    pub(crate) fn ensm_force_state(&mut self, state: EnsmState) -> Result<()> {
        let code = self.bus.read_field(REG_STATE, ENSM_STATE)?;
        let dev_state = EnsmState::from_code(code);
        self.prev_ensm_state = Some(dev_state);

        if dev_state == state {
            debug!("ensm_force_state: already in {:?}", state);
            return Ok(());
        }
        debug!("ensm_force_state: {:?} -> {:?}", dev_state, state);

        let mut val = self.bus.read(REG_ENSM_CONFIG_1)?;

        // Take control away from the pins for the duration of the force.
        self.ensm_pin_ctl_en = val & ENABLE_ENSM_PIN_CTRL != 0;
        val &= !ENABLE_ENSM_PIN_CTRL;

        if code != 0 {
            val &= !TO_ALERT;
        }

        match state {
            EnsmState::Tx => val |= FORCE_TX_ON,
            EnsmState::Rx => val |= FORCE_RX_ON,
            EnsmState::Fdd => val |= FORCE_TX_ON | FORCE_RX_ON,
            EnsmState::Alert => {
                val &= !(FORCE_TX_ON | FORCE_RX_ON);
                val |= TO_ALERT | FORCE_ALERT_STATE;
            }
            other => {
                error!("no handling for forcing {:?}", other);
                return Ok(());
            }
        }

        self.bus
            .write(REG_ENSM_CONFIG_1, TO_ALERT | FORCE_ALERT_STATE)?;
        self.bus.write(REG_ENSM_CONFIG_1, val)?;
        self.ensm_state = state;
        Ok(())
    }

    /// Undo [`ensm_force_state`](Self::ensm_force_state). A no-op when no
    /// snapshot was taken.
    pub(crate) fn ensm_restore_prev_state(&mut self) -> Result<()> {
        let Some(prev) = self.prev_ensm_state.take() else {
            debug!("ensm_restore_prev_state: nothing saved");
            return Ok(());
        };

        let mut val = self.bus.read(REG_ENSM_CONFIG_1)?;
        val &= !(FORCE_TX_ON | FORCE_RX_ON | TO_ALERT | FORCE_ALERT_STATE);

        match prev {
            EnsmState::Tx => val |= FORCE_TX_ON,
            EnsmState::Rx => val |= FORCE_RX_ON,
            EnsmState::Fdd => val |= FORCE_TX_ON | FORCE_RX_ON,
            EnsmState::Alert => val |= TO_ALERT,
            other => {
                debug!("cannot restore to {:?}", other);
                return Ok(());
            }
        }

        self.bus
            .write(REG_ENSM_CONFIG_1, TO_ALERT | FORCE_ALERT_STATE)?;
        self.bus.write(REG_ENSM_CONFIG_1, val)?;

        if self.ensm_pin_ctl_en {
            val |= ENABLE_ENSM_PIN_CTRL;
            self.bus.write(REG_ENSM_CONFIG_1, val)?;
        }

        self.ensm_state = prev;
        Ok(())
    }

    /// Program the duplex mode registers: FDD/TDD select plus the
    /// synthesizer enable scheme.
    pub fn set_duplex_mode(&mut self, duplex: DuplexMode, pinctrl: bool) -> Result<()> {
        let fdd = duplex == DuplexMode::Fdd;
        self.bus
            .write(REG_ENSM_MODE, if fdd { FDD_MODE } else { 0 })?;

        let mut val = 0;
        if self.config.use_ext_rx_lo {
            val |= POWER_DOWN_RX_SYNTH;
        }
        if self.config.use_ext_tx_lo {
            val |= POWER_DOWN_TX_SYNTH;
        }

        if fdd {
            val |= DUAL_SYNTH_MODE;
            if pinctrl && self.config.fdd_independent_mode {
                val |= FDD_EXTERNAL_CTRL_ENABLE;
            }
        } else if self.config.tdd_use_dual_synth {
            val |= DUAL_SYNTH_MODE;
        } else if pinctrl {
            val |= SYNTH_ENABLE_PIN_CTRL_MODE;
        } else {
            val |= TXNRX_SPI_CTRL;
        }
        self.bus.write(REG_ENSM_CONFIG_2, val)?;

        self.config.duplex = duplex;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_decode() {
        assert_eq!(EnsmState::from_code(0x5), EnsmState::Alert);
        assert_eq!(EnsmState::from_code(0xA), EnsmState::Fdd);
        assert_eq!(EnsmState::from_code(0x0), EnsmState::SleepWait);
        assert_eq!(EnsmState::from_code(0x3), EnsmState::SleepWait);
    }
}
