mod common;

use crate::common::*;

use ad9361::{Ad9361, Ad9361Config, ClockId, Result};

fn attach() -> Result<Ad9361<MockBus>> {
    Ad9361::new(MockBus::ready(), Ad9361Config::default())
}

#[test]
fn plan_lte20_rates() -> Result<()> {
    logging_init("planner");
    let phy = attach()?;

    let (rx, tx) = phy.plan_clock_chain(30_720_000, 0)?;
    assert_eq!(rx.adc, 368_640_000);
    assert_eq!(rx.r2, 122_880_000);
    assert_eq!(rx.sampl, 30_720_000);
    assert_eq!(tx.dac, 184_320_000);
    assert_eq!(tx.sampl, 30_720_000);
    assert_eq!(rx.bbpll, tx.bbpll);
    assert_eq!(rx.bbpll, 737_280_000);
    Ok(())
}

#[test]
fn plan_rejects_rate_above_ceiling() -> Result<()> {
    logging_init("planner");
    let phy = attach()?;

    // rx2tx2 caps the interface at 61.44 MS/s.
    assert!(phy.plan_clock_chain(61_440_000, 0).is_ok());
    assert!(phy.plan_clock_chain(61_440_001, 0).is_err());
    assert!(phy.plan_clock_chain(0, 0).is_err());
    Ok(())
}

#[test]
fn plan_single_channel_ceiling() -> Result<()> {
    logging_init("planner");
    let config = Ad9361Config {
        rx2tx2: false,
        ..Ad9361Config::default()
    };
    let phy = Ad9361::new(MockBus::ready(), config)?;

    assert!(phy.plan_clock_chain(122_880_000, 0).is_ok());
    assert!(phy.plan_clock_chain(122_880_001, 0).is_err());
    Ok(())
}

#[test]
fn rx_rate_doubles_when_rx_runs_twice_tx() -> Result<()> {
    logging_init("planner");
    let config = Ad9361Config {
        rx_eq_2tx: true,
        ..Ad9361Config::default()
    };
    let phy = Ad9361::new(MockBus::ready(), config)?;

    // The requested rate binds the TX side; CLKRF doubles, so the RX chain
    // samples at twice the TX rate.
    let (rx, tx) = phy.plan_clock_chain(61_440_000, 0)?;
    assert_eq!(tx.sampl, 61_440_000);
    assert_eq!(rx.sampl, 2 * tx.sampl);
    assert_eq!(rx.adc, 491_520_000);
    assert_eq!(rx.clkrf, 122_880_000);
    assert_eq!(tx.clktf, 61_440_000);
    assert_eq!(rx.bbpll, 983_040_000);
    Ok(())
}

#[test]
fn governor_trades_oversampling() -> Result<()> {
    logging_init("planner");
    let phy = attach()?;

    let (fast, _) = phy.plan_clock_chain(4_000_000, 0)?;
    let (slow, _) = phy.plan_clock_chain(4_000_000, 3)?;
    // A higher governor level starts further down the divider table, so the
    // converter never runs faster than at level 0.
    assert!(slow.adc <= fast.adc);
    assert_eq!(fast.sampl, 4_000_000);
    assert_eq!(slow.sampl, 4_000_000);
    Ok(())
}

#[test]
fn committed_rates_match_plan() -> Result<()> {
    logging_init("planner");
    let mut phy = attach()?;

    let (rx, tx) = phy.plan_clock_chain(30_720_000, 0)?;
    phy.set_sample_rate(30_720_000)?;

    // The BBPLL quantizes to its modulus, so committed readings may sit a
    // few Hz off the plan; everything downstream divides that error away.
    assert!(phy.clk_get_rate(ClockId::Adc).abs_diff(rx.adc) <= 8);
    assert!(phy.clk_get_rate(ClockId::ClkRf).abs_diff(rx.clkrf) <= 8);
    assert!(phy.clk_get_rate(ClockId::Dac).abs_diff(tx.dac) <= 8);
    assert!(phy.sample_rate().abs_diff(30_720_000) <= 8);
    Ok(())
}

#[test]
fn fir_decimation_absorbed_by_divider_table() -> Result<()> {
    logging_init("planner");
    let mut phy = attach()?;

    // At the 61.44 MS/s ceiling the converters already run flat out, so a
    // 4x FIR factor quadruples CLKRF without moving the ADC.
    phy.set_sample_rate(61_440_000)?;
    assert!(phy.clk_get_rate(ClockId::Adc).abs_diff(491_520_000) <= 8);
    assert!(phy.clk_get_rate(ClockId::ClkRf).abs_diff(61_440_000) <= 8);

    phy.set_fir_factors(4, 4)?;
    phy.set_sample_rate(61_440_000)?;
    assert!(phy.sample_rate().abs_diff(61_440_000) <= 8);
    assert!(phy.clk_get_rate(ClockId::Adc).abs_diff(491_520_000) <= 8);
    assert!(phy.clk_get_rate(ClockId::ClkRf).abs_diff(245_760_000) <= 8);
    Ok(())
}
