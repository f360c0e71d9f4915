mod common;

use crate::common::*;

use ad9361::regs::*;
use ad9361::tables::{gain_table, GainBand};
use ad9361::{Ad9361, Ad9361Config, ClockId, Result};

fn attach() -> Result<Ad9361<MockBus>> {
    Ad9361::new(MockBus::ready(), Ad9361Config::default())
}

#[test]
fn bbpll_round_and_set_agree() -> Result<()> {
    logging_init("clock_chain");
    let mut phy = attach()?;

    for rate in [715_000_000u64, 737_280_000, 983_040_000, 1_430_000_000] {
        let rounded = phy.clk_round_rate(ClockId::BbPll, rate)?;
        phy.clk_set_rate(ClockId::BbPll, rate)?;
        assert_eq!(phy.clk_get_rate(ClockId::BbPll), rounded, "at {rate}");
        // Quantization to the fractional modulus stays within one ref LSB.
        assert!(rounded.abs_diff(rate) <= 40_000_000 / 2_088_960 + 1);
    }
    Ok(())
}

#[test]
fn bbpll_clamps_to_vco_range() -> Result<()> {
    logging_init("clock_chain");
    let mut phy = attach()?;

    phy.clk_set_rate(ClockId::BbPll, 100_000_000)?;
    assert_eq!(phy.clk_get_rate(ClockId::BbPll), 715_000_000);
    phy.clk_set_rate(ClockId::BbPll, 2_000_000_000)?;
    assert_eq!(phy.clk_get_rate(ClockId::BbPll), 1_430_000_000);
    Ok(())
}

#[test]
fn scaler_round_and_set_agree() -> Result<()> {
    logging_init("clock_chain");
    let mut phy = attach()?;
    phy.clk_set_rate(ClockId::BbPll, 983_040_000)?;

    let adc = phy.clk_round_rate(ClockId::Adc, 245_760_000)?;
    phy.clk_set_rate(ClockId::Adc, 245_760_000)?;
    assert_eq!(phy.clk_get_rate(ClockId::Adc), adc);

    let r2 = phy.clk_round_rate(ClockId::R2, adc / 3)?;
    phy.clk_set_rate(ClockId::R2, adc / 3)?;
    assert_eq!(phy.clk_get_rate(ClockId::R2), r2);
    Ok(())
}

#[test]
fn scaler_rejects_illegal_dividers() -> Result<()> {
    logging_init("clock_chain");
    let mut phy = attach()?;
    phy.clk_set_rate(ClockId::BbPll, 983_040_000)?;

    // ADC divider must be a power of two between 2 and 64.
    assert!(phy.clk_set_rate(ClockId::Adc, 983_040_000 / 3).is_err());
    assert!(phy.clk_set_rate(ClockId::Adc, 983_040_000).is_err());
    Ok(())
}

#[test]
fn committed_chain_survives_reattach() -> Result<()> {
    logging_init("clock_chain");
    let mut phy = attach()?;
    phy.set_sample_rate(30_720_000)?;
    let committed: Vec<u64> = ClockId::ALL
        .iter()
        .map(|&id| phy.clk_get_rate(id))
        .collect();

    // A fresh attach over the same register image must read back the same
    // rates; the cache holds nothing the hardware does not.
    let phy2 = Ad9361::new(phy.release(), Ad9361Config::default())?;
    for (&id, &rate) in ClockId::ALL.iter().zip(&committed) {
        assert!(
            phy2.clk_get_rate(id).abs_diff(rate) <= 8,
            "{id:?}: {} vs {rate}",
            phy2.clk_get_rate(id)
        );
    }
    Ok(())
}

#[test]
fn rfpll_set_and_recalc_round_trip() -> Result<()> {
    logging_init("clock_chain");
    let mut phy = attach()?;
    phy.set_sample_rate(30_720_000)?;

    for carrier in [70_000_000u64, 433_920_000, 2_412_000_000, 5_800_000_000] {
        phy.set_rx_lo_freq(carrier)?;
        let cached = phy.rx_lo_freq();

        // One fractional LSB at the VCO, scaled by the output divider.
        let (div_code, _) = (0..)
            .find_map(|c| {
                let vco = carrier << (c + 1);
                (vco > 6_000_000_000).then_some((c, vco))
            })
            .unwrap();
        let lsb = (40_000_000u64 / 8_388_593 + 1) * (1u64 << (div_code + 1));
        assert!(cached.abs_diff(carrier) <= lsb, "{carrier} -> {cached}");

        // Recalc through a re-attach agrees with the cache.
        let bus = phy.release();
        phy = Ad9361::new(bus, Ad9361Config::default())?;
        assert_eq!(phy.rx_lo_freq(), cached);
    }
    Ok(())
}

#[test]
fn rfpll_rejects_out_of_range_carrier() -> Result<()> {
    logging_init("clock_chain");
    let mut phy = attach()?;
    assert!(phy.set_rx_lo_freq(46_999_999).is_err());
    assert!(phy.set_rx_lo_freq(6_000_000_001).is_err());
    Ok(())
}

#[test]
fn rx_retune_reloads_gain_table_on_band_change() -> Result<()> {
    logging_init("clock_chain");
    let mut phy = attach()?;
    phy.set_sample_rate(30_720_000)?;

    // 915 -> 920 MHz stays in the low band (one load); 2.412 GHz crosses
    // into the mid band (a second load). One table-address write per row.
    phy.set_rx_lo_freq(915_000_000)?;
    phy.set_rx_lo_freq(920_000_000)?;
    phy.set_rx_lo_freq(2_412_000_000)?;

    let expected = gain_table(GainBand::Low).len() + gain_table(GainBand::Mid).len();
    let bus = phy.release();
    assert_eq!(bus.writes_to(REG_GAIN_TABLE_ADDRESS).len(), expected);
    Ok(())
}
