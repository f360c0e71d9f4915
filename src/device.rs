//! Device context and configuration.

use log::debug;

use crate::bus::RegisterIo;
use crate::clocks::ClockId;
use crate::ensm::EnsmState;
use crate::regs::*;
use crate::tables::GainBand;
use crate::Result;

/// Duplexing scheme the chip is wired for. Selects the ENSM transition
/// rules and which synthesizer tuning tables apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplexMode {
    Fdd,
    Tdd,
}

/// RX gain control mode, per receive chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RxGainMode {
    Manual,
    #[default]
    SlowAttackAgc,
    FastAttackAgc,
    HybridAgc,
}

/// Static device configuration, captured at construction.
///
/// Mirrors the board-level platform data: everything here is a property of
/// the board design or the application, not something the driver derives
/// from the hardware.
#[derive(Debug, Clone)]
pub struct Ad9361Config {
    /// Reference input rate at the XTALN pin, in Hz.
    pub reference_clk_rate: u64,
    pub duplex: DuplexMode,
    /// Both RX and both TX chains active (2R2T). Halves the sample rate
    /// ceiling.
    pub rx2tx2: bool,
    /// RX sample rate is twice the TX sample rate.
    pub rx_eq_2tx: bool,
    /// Initial divider-table level for the frequency planner. 0 runs the
    /// converters as fast as possible, higher levels trade oversampling for
    /// power.
    pub rate_governor: u32,
    /// Hand ENSM control to the ENABLE/TXNRX pins instead of SPI.
    pub ensm_pin_ctrl: bool,
    /// Pin control uses pulses rather than levels.
    pub ensm_pin_pulse_mode: bool,
    /// In TDD mode, tune the synthesizers with the FDD tables.
    pub tdd_use_fdd_vco_tables: bool,
    /// Skip the RX/TX VCO calibration toggle around ALERT transitions.
    pub tdd_skip_vco_cal: bool,
    /// Run both synthesizers continuously in TDD mode.
    pub tdd_use_dual_synth: bool,
    /// External LO injected, power the on-chip synthesizer down.
    pub use_ext_rx_lo: bool,
    pub use_ext_tx_lo: bool,
    /// In FDD pin-control mode, run RX and TX enables independently.
    pub fdd_independent_mode: bool,
    /// Re-run TX quadrature calibration automatically when the TX carrier
    /// moves more than 100 MHz.
    pub auto_tx_quad_cal: bool,
    pub rx1_gain_mode: RxGainMode,
    pub rx2_gain_mode: RxGainMode,
    /// RF DC offset calibration count, carrier below/above 4 GHz.
    pub rf_dc_offset_count_low: u8,
    pub rf_dc_offset_count_high: u8,
    /// RF DC offset attenuation, carrier below/above 4 GHz.
    pub rf_dc_offset_atten_low: u8,
    pub rf_dc_offset_atten_high: u8,
    /// DC offset tracking update event mask.
    pub dc_offset_update_events: u8,
    /// Fastlock profile settle delay in 250 ns steps.
    pub fastlock_init_delay: u8,
    pub rf_rx_bandwidth_hz: u32,
    pub rf_tx_bandwidth_hz: u32,
}

impl Default for Ad9361Config {
    fn default() -> Self {
        Self {
            reference_clk_rate: 40_000_000,
            duplex: DuplexMode::Fdd,
            rx2tx2: true,
            rx_eq_2tx: false,
            rate_governor: 0,
            ensm_pin_ctrl: false,
            ensm_pin_pulse_mode: false,
            tdd_use_fdd_vco_tables: false,
            tdd_skip_vco_cal: false,
            tdd_use_dual_synth: true,
            use_ext_rx_lo: false,
            use_ext_tx_lo: false,
            fdd_independent_mode: false,
            auto_tx_quad_cal: true,
            rx1_gain_mode: RxGainMode::default(),
            rx2_gain_mode: RxGainMode::default(),
            rf_dc_offset_count_low: 0x32,
            rf_dc_offset_count_high: 0x28,
            rf_dc_offset_atten_low: 4,
            rf_dc_offset_atten_high: 6,
            dc_offset_update_events: 0x05,
            fastlock_init_delay: 0x40,
            rf_rx_bandwidth_hz: 18_000_000,
            rf_tx_bandwidth_hz: 18_000_000,
        }
    }
}

/// Cached scale of one clock node: `rate = parent_rate * mult / div`.
///
/// Written only by that node's `set_rate` path (or the bring-up readback);
/// everything else treats the cache as read-only.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClkScale {
    pub mult: u32,
    pub div: u32,
    pub rate: u64,
}

impl ClkScale {
    const UNITY: ClkScale = ClkScale {
        mult: 1,
        div: 1,
        rate: 0,
    };
}

pub(crate) const FASTLOCK_PROFILES: usize = 8;

/// Driver-side shadow of one stored fastlock profile.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FastlockEntry {
    pub initialized: bool,
    pub alc_orig: u8,
    pub alc_written: u8,
}

/// Fastlock bookkeeping for both synthesizers (index 0 = RX, 1 = TX).
/// `current_profile` is `profile + 1`, 0 meaning fastlock inactive.
#[derive(Debug, Clone, Default)]
pub(crate) struct FastlockState {
    pub current_profile: [u8; 2],
    pub entry: [[FastlockEntry; FASTLOCK_PROFILES]; 2],
}

/// AD9361 device context.
///
/// Owns the register transport and all driver state. One value per physical
/// chip; clone nothing, share through a caller-side mutex if needed.
pub struct Ad9361<B> {
    pub(crate) bus: B,
    pub(crate) config: Ad9361Config,
    pub(crate) clk: [ClkScale; ClockId::COUNT],
    pub(crate) ensm_state: EnsmState,
    pub(crate) prev_ensm_state: Option<EnsmState>,
    /// Pin control was active when `ensm_force_state` took over; restore
    /// puts it back.
    pub(crate) ensm_pin_ctl_en: bool,
    pub(crate) fastlock: FastlockState,
    pub(crate) loaded_gain_band: Option<GainBand>,
    /// TX carrier at the last TX quadrature calibration, for the automatic
    /// re-calibration threshold.
    pub(crate) last_tx_quad_lo: u64,
    pub(crate) rx_bandwidth_hz: u32,
    pub(crate) tx_bandwidth_hz: u32,
    /// Programmed FIR factors (1 = bypass). FIR coefficient loading itself
    /// is outside this driver; the planner only needs the factors.
    pub(crate) rx_fir_dec: u32,
    pub(crate) tx_fir_int: u32,
    pub(crate) bbdc_track_en: bool,
    pub(crate) rfdc_track_en: bool,
    pub(crate) quad_track_en: bool,
}

impl<B: RegisterIo> Ad9361<B> {
    /// Attach to a powered chip through `bus`.
    ///
    /// Performs the clock registration pass: every node's scale is read back
    /// from the hardware so the cached rates reflect whatever state the chip
    /// is already in (fresh reset or a warm handover from a bootloader).
    pub fn new(bus: B, config: Ad9361Config) -> Result<Self> {
        let mut phy = Self {
            bus,
            config,
            clk: [ClkScale::UNITY; ClockId::COUNT],
            ensm_state: EnsmState::SleepWait,
            prev_ensm_state: None,
            ensm_pin_ctl_en: false,
            fastlock: FastlockState::default(),
            loaded_gain_band: None,
            last_tx_quad_lo: 0,
            rx_bandwidth_hz: 0,
            tx_bandwidth_hz: 0,
            rx_fir_dec: 1,
            tx_fir_int: 1,
            bbdc_track_en: false,
            rfdc_track_en: false,
            quad_track_en: false,
        };
        phy.rx_bandwidth_hz = phy.config.rf_rx_bandwidth_hz;
        phy.tx_bandwidth_hz = phy.config.rf_tx_bandwidth_hz;

        for id in ClockId::ALL {
            let rate = phy.recalc_rate(id)?;
            debug!("clk register {:?}: {} Hz", id, rate);
        }

        let code = phy.bus.read_field(REG_STATE, ENSM_STATE)?;
        phy.ensm_state = EnsmState::from_code(code);
        debug!("attached, ENSM {:?}", phy.ensm_state);
        Ok(phy)
    }

    pub fn config(&self) -> &Ad9361Config {
        &self.config
    }

    /// Driver's view of the enable-state machine.
    pub fn ensm_state(&self) -> EnsmState {
        self.ensm_state
    }

    /// Analog RX channel bandwidth last committed to the chip, in Hz.
    pub fn rx_bandwidth(&self) -> u32 {
        self.rx_bandwidth_hz
    }

    pub fn tx_bandwidth(&self) -> u32 {
        self.tx_bandwidth_hz
    }

    /// Record the programmed FIR interpolation/decimation factors so the
    /// frequency planner can account for them. Factor 1 means bypass.
    /// Coefficient loading itself happens outside this driver.
    pub fn set_fir_factors(&mut self, rx_dec: u32, tx_int: u32) -> Result<()> {
        for factor in [rx_dec, tx_int] {
            if !matches!(factor, 1 | 2 | 4) {
                return Err(crate::Error::Argument("FIR factor must be 1, 2 or 4"));
            }
        }
        self.rx_fir_dec = rx_dec;
        self.tx_fir_int = tx_int;
        Ok(())
    }

    /// Give the transport back, consuming the device.
    pub fn release(self) -> B {
        self.bus
    }

    /// True when either RX chain runs manual gain control. Used by the ENSM
    /// controller, which pulses the gain-word reset when forcing RX.
    pub(crate) fn manual_gain_active(&self) -> bool {
        self.config.rx1_gain_mode == RxGainMode::Manual
            || self.config.rx2_gain_mode == RxGainMode::Manual
    }
}
