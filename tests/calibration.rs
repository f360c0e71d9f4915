mod common;

use crate::common::*;

use ad9361::regs::*;
use ad9361::{Ad9361, Ad9361Config, Error, OneShotCal, Result};

fn attach() -> Result<Ad9361<MockBus>> {
    Ad9361::new(MockBus::ready(), Ad9361Config::default())
}

fn attach_with_rates() -> Result<Ad9361<MockBus>> {
    let mut phy = attach()?;
    phy.set_sample_rate(30_720_000)?;
    Ok(phy)
}

#[test]
fn one_shot_cal_times_out_after_poll_budget() -> Result<()> {
    logging_init("calibration");
    let mut bus = MockBus::ready();
    // Trigger bit never clears.
    bus.self_clear_after(REG_CALIBRATION_CTRL, u32::MAX);
    let mut phy = Ad9361::new(bus, Ad9361Config::default())?;

    match phy.bb_dc_offset_calib() {
        Err(Error::Timeout { reg, mask }) => {
            assert_eq!(reg, REG_CALIBRATION_CTRL);
            assert_eq!(mask, BBDC_CAL);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }

    let bus = phy.release();
    // 5000 polls at the 1200 us calibration-register interval.
    assert_eq!(bus.delay_calls, 5000);
    assert_eq!(bus.delay_total_us, 5000 * 1200);
    Ok(())
}

#[test]
fn failed_calibration_still_restores_tracking_and_ensm() -> Result<()> {
    logging_init("calibration");
    let mut phy = attach_with_rates()?;

    // Make the TX quadrature trigger stick so the pass times out.
    let mut bus = phy.release();
    bus.self_clear_after(REG_CALIBRATION_CTRL, u32::MAX);
    bus.journal.clear();
    let mut phy = Ad9361::new(bus, Ad9361Config::default())?;
    phy.set_tracking(true, true, true)?;

    assert!(matches!(
        phy.calibrate(OneShotCal::TxQuad { rx_phase: None }),
        Err(Error::Timeout { .. })
    ));

    let bus = phy.release();
    // Tracking config toggled off for the pass, then back on despite the
    // failure: last write carries the channel tracking bits again.
    let track = bus.writes_to(REG_CALIBRATION_CONFIG_1);
    assert_eq!(track.len(), 3);
    assert_eq!(
        track[1] & (ENABLE_TRACKING_MODE_CH1 | ENABLE_TRACKING_MODE_CH2),
        0
    );
    assert_eq!(
        track.last().unwrap() & (ENABLE_TRACKING_MODE_CH1 | ENABLE_TRACKING_MODE_CH2),
        ENABLE_TRACKING_MODE_CH1 | ENABLE_TRACKING_MODE_CH2
    );
    // The ENSM restore ran after the failing trigger write.
    let last_trigger = bus
        .journal
        .iter()
        .rposition(|&(r, _)| r == REG_CALIBRATION_CTRL)
        .unwrap();
    let last_ensm = bus
        .journal
        .iter()
        .rposition(|&(r, _)| r == REG_ENSM_CONFIG_1)
        .unwrap();
    assert!(last_ensm > last_trigger);
    Ok(())
}

#[test]
fn tx_quad_cal_programs_nco_and_triggers() -> Result<()> {
    logging_init("calibration");
    let mut phy = attach_with_rates()?;
    phy.calibrate(OneShotCal::TxQuad { rx_phase: None })?;

    let bus = phy.release();
    assert_eq!(bus.writes_to(REG_CALIBRATION_CTRL), vec![TX_QUAD_CAL]);
    // 18 MHz bandwidth at CLKTF 30.72 MHz: NCO word 1 on both sides.
    let nco = bus.writes_to(REG_QUAD_CAL_NCO_FREQ_PHASE_OFFSET);
    assert_eq!(nco.len(), 1);
    assert_eq!(nco[0] >> 6, 1);
    assert_eq!(bus.reg(REG_KEXP_2) >> 6, 1);
    // The full-LMT gain index was looked up and written.
    assert_eq!(bus.writes_to(REG_TX_QUAD_FULL_LMT_GAIN).len(), 1);
    Ok(())
}

#[test]
fn tx_quad_phase_override_lands_in_nco_register() -> Result<()> {
    logging_init("calibration");
    let mut phy = attach_with_rates()?;
    phy.calibrate(OneShotCal::TxQuad { rx_phase: Some(0x11) })?;
    // The phase field is six bits wide; words in the upper half survive too.
    phy.calibrate(OneShotCal::TxQuad { rx_phase: Some(0x2B) })?;

    let bus = phy.release();
    let nco = bus.writes_to(REG_QUAD_CAL_NCO_FREQ_PHASE_OFFSET);
    assert_eq!(nco.len(), 2);
    assert_eq!(nco[0] & RX_NCO_PHASE_OFFSET, 0x11);
    assert_eq!(nco[1] & RX_NCO_PHASE_OFFSET, 0x2B);
    Ok(())
}

#[test]
fn failed_auto_quad_cal_does_not_abort_tx_retune() -> Result<()> {
    logging_init("calibration");
    let mut bus = MockBus::ready();
    // TX quadrature trigger never clears.
    bus.self_clear_after(REG_CALIBRATION_CTRL, u32::MAX);
    let config = Ad9361Config {
        tdd_skip_vco_cal: true,
        ..Ad9361Config::default()
    };
    let mut phy = Ad9361::new(bus, config)?;
    phy.set_sample_rate(30_720_000)?;

    // The automatic quadrature pass times out, but the retune still polls
    // for lock and re-enables the VCO cal machinery.
    phy.set_tx_lo_freq(2_400_000_000)?;
    // A nearby retune stays under the re-cal threshold: no second trigger.
    phy.set_tx_lo_freq(2_450_000_000)?;

    let bus = phy.release();
    assert_eq!(bus.writes_to(REG_CALIBRATION_CTRL), vec![TX_QUAD_CAL]);
    // Both retunes bypassed lock detect on the way in and restored it on
    // the way out.
    assert_eq!(
        bus.writes_to(REG_TX_PFD_CONFIG),
        vec![0, BYPASS_LD_SYNTH, 0, BYPASS_LD_SYNTH]
    );
    Ok(())
}

#[test]
fn unconverged_quad_cal_falls_back_to_phase_search() -> Result<()> {
    logging_init("calibration");
    let mut phy = attach_with_rates()?;

    let mut bus = phy.release();
    // Status never reports LO+SSB convergence.
    bus.override_read(REG_QUAD_CAL_STATUS_TX1, 0);
    bus.journal.clear();
    let mut phy = Ad9361::new(bus, Ad9361Config::default())?;

    phy.calibrate(OneShotCal::TxQuad { rx_phase: None })?;

    let bus = phy.release();
    // Initial run + 32 phase probes + the double confirmation run.
    assert_eq!(bus.writes_to(REG_CALIBRATION_CTRL).len(), 35);
    // Every probe re-programs the NCO phase; the final write applies the
    // search result.
    let nco = bus.writes_to(REG_QUAD_CAL_NCO_FREQ_PHASE_OFFSET);
    assert_eq!(nco.len(), 1 + 32 + 1);
    Ok(())
}

#[test]
fn phase_search_tolerates_stuck_first_confirmation_run() -> Result<()> {
    logging_init("calibration");
    let mut phy = attach_with_rates()?;

    let mut bus = phy.release();
    // Status never reports convergence, forcing the full sweep.
    bus.override_read(REG_QUAD_CAL_STATUS_TX1, 0);
    // Initial run and the 32 phase probes clear normally, the first
    // confirmation run sticks, the second clears again.
    let mut schedule = vec![1u32; 33];
    schedule.push(u32::MAX);
    schedule.push(1);
    bus.self_clear_schedule(REG_CALIBRATION_CTRL, &schedule);
    bus.journal.clear();
    let mut phy = Ad9361::new(bus, Ad9361Config::default())?;

    phy.calibrate(OneShotCal::TxQuad { rx_phase: None })?;

    let bus = phy.release();
    assert_eq!(bus.writes_to(REG_CALIBRATION_CTRL).len(), 35);
    // The stuck run burned a full polling budget before the last run.
    assert!(bus.delay_calls >= 5000);
    Ok(())
}

#[test]
fn rf_dc_cal_uses_high_band_parameters_above_4ghz() -> Result<()> {
    logging_init("calibration");
    let mut phy = attach_with_rates()?;
    phy.set_rx_lo_freq(5_500_000_000)?;

    let mut bus = phy.release();
    bus.journal.clear();
    let mut phy = Ad9361::new(bus, Ad9361Config::default())?;
    phy.calibrate(OneShotCal::RfDc)?;

    let config = Ad9361Config::default();
    let bus = phy.release();
    assert_eq!(
        bus.writes_to(REG_RF_DC_OFFSET_COUNT),
        vec![config.rf_dc_offset_count_high]
    );
    assert_eq!(
        bus.writes_to(REG_RF_DC_OFFSET_ATTEN),
        vec![config.rf_dc_offset_atten_high]
    );
    assert_eq!(bus.writes_to(REG_CALIBRATION_CTRL), vec![RFDC_CAL]);
    Ok(())
}

#[test]
fn update_rf_bandwidth_tunes_filters_and_requads() -> Result<()> {
    logging_init("calibration");
    let mut phy = attach_with_rates()?;
    phy.update_rf_bandwidth(10_000_000, 10_000_000)?;

    assert_eq!(phy.rx_bandwidth(), 10_000_000);
    assert_eq!(phy.tx_bandwidth(), 10_000_000);

    let bus = phy.release();
    // BBPLL at 737.28 MHz, RX pole target 1.4 * 5 MHz: divider 12.
    assert_eq!(bus.writes_to(REG_RX_BBF_TUNE_DIVIDE), vec![12]);
    // All four tune triggers fired, quadrature last.
    assert_eq!(
        bus.writes_to(REG_CALIBRATION_CTRL),
        vec![RX_BB_TUNE_CAL, TX_BB_TUNE_CAL, TX_QUAD_CAL]
    );
    // TIA and secondary-filter passes programmed their banks.
    assert_eq!(bus.writes_to(REG_RX_TIA_CONFIG).len(), 1);
    assert_eq!(bus.writes_to(REG_CAPACITOR).len(), 1);
    Ok(())
}

#[test]
fn synth_cp_calib_polls_valid_bit() -> Result<()> {
    logging_init("calibration");
    let mut phy = attach()?;
    phy.synth_cp_calib(false)?;
    phy.synth_cp_calib(true)?;

    let bus = phy.release();
    assert_eq!(
        bus.writes_to(REG_RFPLL_CP_CONFIG),
        vec![0, CP_CAL_ENABLE]
    );
    assert_eq!(
        bus.writes_to(REG_RFPLL_CP_CONFIG + TX_SYNTH_OFFSET),
        vec![0, CP_CAL_ENABLE]
    );
    Ok(())
}
