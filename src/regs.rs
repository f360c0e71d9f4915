//! AD9361 register map.
//!
//! Addresses and bit fields used by the control plane. Field constants are
//! masks; multi-bit fields are consumed through
//! [`RegisterIo::read_field`](crate::RegisterIo::read_field) /
//! [`write_field`](crate::RegisterIo::write_field), which shift by the
//! mask's trailing zeros.

#![allow(dead_code)]

// SPI / interface configuration
pub const REG_SPI_CONF: u16 = 0x000;
pub const SOFT_RESET: u8 = 1 << 7;

// TX/RX enable & filter control (0x002/0x003): HB chain enables + FIR config
pub const REG_TX_ENABLE_FILTER_CTRL: u16 = 0x002;
pub const REG_RX_ENABLE_FILTER_CTRL: u16 = 0x003;
pub const THB3_ENABLE_INTERP: u8 = 0x30; // 0=interp1, 1=interp2, 2=interp3
pub const THB2_EN: u8 = 1 << 3;
pub const THB1_EN: u8 = 1 << 2;
pub const TX_FIR_ENABLE_INTERPOLATION: u8 = 0x03;
pub const DEC3_ENABLE_DECIMATION: u8 = 0x30;
pub const RHB2_EN: u8 = 1 << 3;
pub const RHB1_EN: u8 = 1 << 2;
pub const RX_FIR_ENABLE_DECIMATION: u8 = 0x03;

pub const REG_RFPLL_DIVIDERS: u16 = 0x005;
pub const RX_VCO_DIVIDER: u8 = 0x0F;
pub const TX_VCO_DIVIDER: u8 = 0xF0;

pub const REG_CLOCK_ENABLE: u16 = 0x009;
pub const DIGITAL_POWER_UP: u8 = 1 << 2;
pub const CLOCK_ENABLE_DFLT: u8 = 1 << 1;
pub const BBPLL_ENABLE: u8 = 1 << 0;

// BBPLL output routing: ADC divider exponent + DAC-half select
pub const REG_BBPLL: u16 = 0x00A;
pub const CLKOUT_ENABLE: u8 = 1 << 4;
pub const DAC_CLK_DIV2: u8 = 1 << 3;
pub const BBPLL_DIVIDER: u8 = 0x07;

pub const REG_PARALLEL_PORT_CONF_2: u16 = 0x011;
pub const INVERT_RX2: u8 = 1 << 7;
pub const REG_PARALLEL_PORT_CONF_3: u16 = 0x012;
pub const LVDS_MODE: u8 = 1 << 4;

// ENSM
pub const REG_ENSM_MODE: u16 = 0x013;
pub const FDD_MODE: u8 = 1 << 0;

pub const REG_ENSM_CONFIG_1: u16 = 0x014;
pub const TO_ALERT: u8 = 1 << 0;
pub const FORCE_ALERT_STATE: u8 = 1 << 1;
pub const FORCE_RX_ON: u8 = 1 << 2;
pub const FORCE_TX_ON: u8 = 1 << 3;
pub const ENABLE_ENSM_PIN_CTRL: u8 = 1 << 4;
pub const LEVEL_MODE: u8 = 1 << 5;
pub const ENABLE_RX_DATA_PORT_FOR_CAL: u8 = 1 << 7;

pub const REG_ENSM_CONFIG_2: u16 = 0x015;
pub const DUAL_SYNTH_MODE: u8 = 1 << 0;
pub const TXNRX_SPI_CTRL: u8 = 1 << 1;
pub const SYNTH_ENABLE_PIN_CTRL_MODE: u8 = 1 << 2;
pub const POWER_DOWN_RX_SYNTH: u8 = 1 << 3;
pub const POWER_DOWN_TX_SYNTH: u8 = 1 << 4;
pub const RX_SYNTH_READY_MASK: u8 = 1 << 5;
pub const TX_SYNTH_READY_MASK: u8 = 1 << 6;
pub const FDD_EXTERNAL_CTRL_ENABLE: u8 = 1 << 7;

// One-shot calibration trigger bits live here; bits self-clear on done.
pub const REG_CALIBRATION_CTRL: u16 = 0x016;
pub const RX_BB_TUNE_CAL: u8 = 1 << 7;
pub const TX_BB_TUNE_CAL: u8 = 1 << 6;
pub const RX_QUAD_CAL: u8 = 1 << 5;
pub const TX_QUAD_CAL: u8 = 1 << 4;
pub const RX_GAIN_STEP_CAL: u8 = 1 << 3;
pub const TXMON_CAL: u8 = 1 << 2;
pub const RFDC_CAL: u8 = 1 << 1;
pub const BBDC_CAL: u8 = 1 << 0;

pub const REG_STATE: u16 = 0x017;
pub const ENSM_STATE: u8 = 0x0F;

// BBPLL synthesizer block
pub const REG_CLOCK_CTRL: u16 = 0x03A;
pub const REF_FREQ_SCALER: u8 = 0x03;
pub const REG_CP_CURRENT: u16 = 0x03B;
pub const REG_LOOP_FILTER_1: u16 = 0x03D;
pub const REG_LOOP_FILTER_2: u16 = 0x03E;
pub const REG_LOOP_FILTER_3: u16 = 0x03F;
pub const REG_VCO_CTRL: u16 = 0x040;
pub const FREQ_CAL_ENABLE: u8 = 1 << 7;
pub const FREQ_CAL_COUNT_LENGTH: u8 = 0x03;
pub const REG_FRACT_BB_FREQ_WORD_1: u16 = 0x041;
pub const REG_FRACT_BB_FREQ_WORD_2: u16 = 0x042;
pub const REG_FRACT_BB_FREQ_WORD_3: u16 = 0x043;
pub const REG_INTEGER_BB_FREQ_WORD: u16 = 0x044;
pub const REG_SDM_CTRL_1: u16 = 0x045;
pub const INIT_BB_FO_CAL: u8 = 1 << 2;
pub const BBPLL_RESET_BAR: u8 = 1 << 3;
pub const REG_SDM_CTRL: u16 = 0x046;
pub const REG_VCO_PROGRAM_1: u16 = 0x049;
pub const REG_VCO_PROGRAM_2: u16 = 0x04A;

pub const REG_CH_1_OVERFLOW: u16 = 0x05E;
pub const BBPLL_LOCK: u8 = 1 << 7;

// TX quadrature calibration block
pub const REG_QUAD_CAL_NCO_FREQ_PHASE_OFFSET: u16 = 0x0A0;
pub const RX_NCO_FREQ: u8 = 0xC0;
pub const RX_NCO_PHASE_OFFSET: u8 = 0x3F;
pub const REG_KEXP_1: u16 = 0x0A1;
pub const KEXP_TX: u8 = 0xC0;
pub const KEXP_TX_COMP: u8 = 0x30;
pub const KEXP_DC_I: u8 = 0x0C;
pub const KEXP_DC_Q: u8 = 0x03;
pub const REG_KEXP_2: u16 = 0x0A2;
pub const TX_NCO_FREQ: u8 = 0xC0;
pub const REG_QUAD_CAL_CTRL: u16 = 0x0A3;
pub const SETTLE_MAIN_ENABLE: u8 = 1 << 6;
pub const DC_OFFSET_ENABLE: u8 = 1 << 5;
pub const QUAD_CAL_SOFT_RESET: u8 = 1 << 4;
pub const GAIN_ENABLE: u8 = 1 << 3;
pub const PHASE_ENABLE: u8 = 1 << 2;
pub const M_DECIM: u8 = 0x03;
pub const REG_QUAD_CAL_COUNT: u16 = 0x0A4;
pub const REG_QUAD_SETTLE_COUNT: u16 = 0x0A5;
pub const REG_MAG_FTEST_THRESH: u16 = 0x0A6;
pub const REG_MAG_FTEST_THRESH_2: u16 = 0x0A7;
pub const REG_TX_QUAD_FULL_LMT_GAIN: u16 = 0x0A8;
pub const REG_TX_QUAD_LPF_GAIN: u16 = 0x0A9;
pub const REG_QUAD_CAL_STATUS_TX1: u16 = 0x0AC;
pub const TX1_LO_CONV: u8 = 1 << 1;
pub const TX1_SSB_CONV: u8 = 1 << 2;

// TX baseband filter tune: 0x22 arms the tune circuit, 0x26 powers it down
pub const REG_TX_TUNE_CTRL: u16 = 0x0CA;
pub const TUNER_RESAMPLE: u8 = 1 << 5;
pub const TUNE_CTRL: u8 = 0x06;
pub const PD_TUNE: u8 = 1 << 2;

// TX secondary low-pass filter
pub const REG_CONFIG0: u16 = 0x0D0;
pub const POLE_3_MSB: u8 = 0x0C;
pub const REG_RESISTOR: u16 = 0x0D1;
pub const REG_CAPACITOR: u16 = 0x0D2;
pub const CAPACITOR_MASK: u8 = 0x3F;

pub const REG_TX_BBF_TUNE_DIVIDER: u16 = 0x0D6;
pub const REG_TX_BBF_TUNE_MODE: u16 = 0x0D7;
pub const TX_BBF_TUNE_DIVIDER_HI: u8 = 0x01;

pub const REG_AGC_CONFIG_1: u16 = 0x0FA;
pub const MAN_GAIN_CTRL_RX1: u8 = 1 << 0;
pub const MAN_GAIN_CTRL_RX2: u8 = 1 << 1;
pub const REG_AGC_CONFIG_2: u16 = 0x0FB;
pub const AGC_USE_FULL_GAIN_TABLE: u8 = 1 << 3;

pub const REG_SMALL_LMT_OVERLOAD_THRESH: u16 = 0x108;
pub const SMALL_LMT_OVERLOAD_THRESH_MASK: u8 = 0x3F;
pub const FORCE_PD_RESET_RX2: u8 = 1 << 6;
pub const FORCE_PD_RESET_RX1: u8 = 1 << 7;

// Gain table loader
pub const REG_GAIN_TABLE_ADDRESS: u16 = 0x130;
pub const REG_GAIN_TABLE_WRITE_DATA1: u16 = 0x131;
pub const REG_GAIN_TABLE_WRITE_DATA2: u16 = 0x132;
pub const REG_GAIN_TABLE_WRITE_DATA3: u16 = 0x133;
pub const REG_GAIN_TABLE_READ_DATA1: u16 = 0x134;
pub const REG_GAIN_TABLE_CONFIG: u16 = 0x137;
pub const START_GAIN_TABLE_CLOCK: u8 = 1 << 4;
pub const WRITE_GAIN_TABLE: u8 = 1 << 3;
pub const RECEIVER_SELECT: u8 = 0x03;

pub const REG_CALIBRATION_CONFIG_1: u16 = 0x169;
pub const ENABLE_PHASE_CORR: u8 = 1 << 0;
pub const ENABLE_GAIN_CORR: u8 = 1 << 1;
pub const ENABLE_CORR_WORD_DECIMATION: u8 = 1 << 2;
pub const FREE_RUN_MODE: u8 = 1 << 3;
pub const ENABLE_TRACKING_MODE_CH1: u8 = 1 << 4;
pub const ENABLE_TRACKING_MODE_CH2: u8 = 1 << 5;
pub const REG_CALIBRATION_CONFIG_2: u16 = 0x16A;
pub const CALIBRATION_CONFIG2_DFLT: u8 = 0x80;
pub const K_EXP_PHASE: u8 = 0x7F;
pub const REG_CALIBRATION_CONFIG_3: u16 = 0x16B;
pub const PREVENT_POS_LOOP_GAIN: u8 = 1 << 7;
pub const K_EXP_AMPLITUDE: u8 = 0x7F;
pub const REG_RX_QUAD_GAIN2: u16 = 0x16C;
pub const CORRECTION_WORD_DECIMATION_M: u8 = 0x07;

// DC offset calibration block
pub const REG_WAIT_COUNT: u16 = 0x185;
pub const REG_RF_DC_OFFSET_COUNT: u16 = 0x186;
pub const REG_RF_DC_OFFSET_CONFIG_1: u16 = 0x187;
pub const RF_DC_CALIBRATION_COUNT: u8 = 0x1F;
pub const DAC_FS: u8 = 0xC0;
pub const REG_RF_DC_OFFSET_ATTEN: u16 = 0x188;
pub const RF_DC_OFFSET_ATTEN: u8 = 0x3F;
pub const REG_INVERT_BITS: u16 = 0x189;
pub const INVERT_RX1_RF_DC_CGOUT_WORD: u8 = 1 << 7;
pub const INVERT_RX2_RF_DC_CGOUT_WORD: u8 = 1 << 0;
pub const REG_BB_DC_OFFSET_COUNT: u16 = 0x18A;
pub const REG_BB_DC_OFFSET_SHIFT: u16 = 0x18B;
pub const BB_DC_M_SHIFT: u8 = 0x1F;
pub const REG_BB_DC_OFFSET_ATTEN: u16 = 0x18C;
pub const BB_DC_OFFSET_ATTEN: u8 = 0x03;
pub const REG_DC_OFFSET_CONFIG2: u16 = 0x18D;
pub const USE_WAIT_COUNTER_FOR_RF_DC_INIT_CAL: u8 = 1 << 6;
pub const DC_OFFSET_UPDATE: u8 = 0x38;
pub const ENABLE_RF_OFFSET_TRACKING: u8 = 1 << 1;
pub const ENABLE_BB_DC_OFFSET_TRACKING: u8 = 1 << 0;

// RX TIA
pub const REG_RX_TIA_CONFIG: u16 = 0x1DB;
pub const TIA_RESET: u8 = 1 << 3;
pub const REG_TIA1_C_LSB: u16 = 0x1DC;
pub const REG_TIA1_C_MSB: u16 = 0x1DD;
pub const REG_TIA2_C_LSB: u16 = 0x1DE;
pub const REG_TIA2_C_MSB: u16 = 0x1DF;

pub const REG_RX1_TUNE_CTRL: u16 = 0x1E2;
pub const RX1_TUNE_RESAMPLE: u8 = 1 << 1;
pub const RX1_PD_TUNE: u8 = 1 << 0;
pub const REG_RX2_TUNE_CTRL: u16 = 0x1E3;
pub const RX2_TUNE_RESAMPLE: u8 = 1 << 1;
pub const RX2_PD_TUNE: u8 = 1 << 0;
pub const REG_RX_BBF_R2346: u16 = 0x1E6;
pub const RX_BBF_R2346: u8 = 0x07;
pub const REG_RX_BBF_C3_MSB: u16 = 0x1EB;
pub const REG_RX_BBF_C3_LSB: u16 = 0x1EC;

pub const REG_RX_BBF_TUNE_DIVIDE: u16 = 0x1F8;
pub const REG_RX_BBF_TUNE_CONFIG: u16 = 0x1F9;
pub const BBF_TUNE_DIVIDE_HI: u8 = 0x01;
pub const REG_RX_BBBW_MHZ: u16 = 0x1FB;
pub const REG_RX_BBBW_KHZ: u16 = 0x1FC;
pub const REG_RX_MIX_LO_CM: u16 = 0x1FD;
pub const RX_MIX_LO_CM: u8 = 0x3F;
pub const REG_RX_MIX_GM_CONFIG: u16 = 0x1FE;
pub const RX_MIX_GM_PLOAD: u8 = 0x07;

// RF synthesizer frequency words (RX block; TX block at +0x40)
pub const REG_RX_INTEGER_BYTE_0: u16 = 0x231;
pub const REG_RX_INTEGER_BYTE_1: u16 = 0x232;
pub const REG_RX_FRACT_BYTE_0: u16 = 0x233;
pub const REG_RX_FRACT_BYTE_1: u16 = 0x234;
pub const REG_RX_FRACT_BYTE_2: u16 = 0x235;
pub const FRACT_BYTE_2_MASK: u8 = 0x7F;
pub const INTEGER_BYTE_1_MASK: u8 = 0x07;

// RF synthesizer VCO block (RX; TX at +0x40)
pub const REG_RFPLL_VCO_OUTPUT: u16 = 0x238;
pub const PORB_VCO_LOGIC: u8 = 1 << 6;
pub const VCO_OUTPUT_LEVEL: u8 = 0x0F;
pub const REG_RFPLL_ALC_VARACTOR: u16 = 0x239;
pub const VCO_VARACTOR: u8 = 0x0F;
pub const INIT_ALC_VALUE: u8 = 0xF0;
pub const REG_RFPLL_VCO_BIAS_1: u16 = 0x23B;
pub const VCO_BIAS_REF: u8 = 0x07;
pub const VCO_BIAS_TCF: u8 = 0x18;
pub const REG_RFPLL_FORCE_VCO_TUNE_0: u16 = 0x23C;
pub const REG_RFPLL_FORCE_VCO_TUNE_1: u16 = 0x23D;
pub const VCO_TUNE_FORCE: u8 = 1 << 7;
pub const VCO_CAL_OFFSET: u8 = 0x70;
pub const REG_RFPLL_FORCE_ALC: u16 = 0x23E;
pub const FORCE_ALC_ENABLE: u8 = 1 << 7;
pub const FORCE_ALC_WORD: u8 = 0x7F;
pub const REG_RFPLL_VARACTOR_CTRL_0: u16 = 0x23F;
pub const VCO_VARACTOR_REFERENCE_TCF: u8 = 0xE0;
pub const VCO_VARACTOR_OFFSET: u8 = 0x0F;
pub const REG_RFPLL_VARACTOR_CTRL_1: u16 = 0x240;
pub const VCO_VARACTOR_REFERENCE: u8 = 0x0F;
pub const REG_RFPLL_VCO_CAL_REF: u16 = 0x241;
pub const VCO_CAL_REF_TCF: u8 = 0xE0;
pub const REG_RFPLL_PD_OVERRIDES: u16 = 0x242;
pub const REG_RFPLL_CP_CURRENT: u16 = 0x243;
pub const CHARGE_PUMP_CURRENT: u8 = 0x3F;
pub const REG_RFPLL_CP_CONFIG: u16 = 0x244;
pub const HALF_VCO_CAL_CLK: u8 = 1 << 7;
pub const CP_CAL_ENABLE: u8 = 1 << 6;
pub const REG_RFPLL_LOOP_FILTER_1: u16 = 0x245;
pub const LOOP_FILTER_C2: u8 = 0xF0;
pub const LOOP_FILTER_C1: u8 = 0x0F;
pub const REG_RFPLL_LOOP_FILTER_2: u16 = 0x246;
pub const LOOP_FILTER_R1: u8 = 0xF0;
pub const LOOP_FILTER_C3: u8 = 0x0F;
pub const REG_RFPLL_LOOP_FILTER_3: u16 = 0x247;
pub const LOOP_FILTER_R3: u8 = 0x0F;
pub const REG_RFPLL_CP_OVERRANGE_VCO_LOCK: u16 = 0x248;
pub const VCO_LOCK: u8 = 1 << 1;
pub const REG_RFPLL_CP_LEVEL_DETECT: u16 = 0x249;
pub const REG_RFPLL_VCO_CAL: u16 = 0x24A;
pub const VCO_CAL_EN: u8 = 1 << 7;
pub const VCO_CAL_COUNT: u8 = 0x0C;
pub const FB_CLOCK_ADV: u8 = 0x03;
pub const REG_RFPLL_DSM_SETUP_1: u16 = 0x24B;
pub const REG_RFPLL_LO_GEN_POWER_MODE: u16 = 0x24D;
pub const REG_RFPLL_VCO_LDO: u16 = 0x24E;
pub const REG_RFPLL_CAL_STATUS: u16 = 0x24F;
pub const CP_CAL_VALID: u8 = 1 << 7;

// Fastlock profile interface (RX; TX at +0x40)
pub const REG_RX_FAST_LOCK_SETUP: u16 = 0x250;
pub const RX_FAST_LOCK_PROFILE: u8 = 0xE0;
pub const RX_FAST_LOCK_PROFILE_PIN_SELECT: u8 = 1 << 1;
pub const RX_FAST_LOCK_MODE_ENABLE: u8 = 1 << 0;
pub const REG_RX_FAST_LOCK_SETUP_INIT_DELAY: u16 = 0x251;
pub const REG_RX_FAST_LOCK_PROGRAM_ADDR: u16 = 0x253;
pub const RX_FAST_LOCK_PROFILE_ADDR: u8 = 0xF0;
pub const RX_FAST_LOCK_PROFILE_WORD: u8 = 0x0F;
pub const REG_RX_FAST_LOCK_PROGRAM_DATA: u16 = 0x254;
pub const REG_RX_FAST_LOCK_PROGRAM_CTRL: u16 = 0x255;
pub const RX_FAST_LOCK_PROGRAM_WRITE: u8 = 1 << 1;
pub const RX_FAST_LOCK_PROGRAM_CLOCK_ENABLE: u8 = 1 << 0;
pub const REG_RX_FAST_LOCK_PROGRAM_READ: u16 = 0x256;

// PFD / lock-detect config
pub const REG_RX_PFD_CONFIG: u16 = 0x25B;
pub const REG_TX_PFD_CONFIG: u16 = 0x29B;
pub const BYPASS_LD_SYNTH: u8 = 1 << 0;

pub const REG_REF_DIVIDE_CONFIG_1: u16 = 0x2AB;
pub const RX_REF_RESET_BAR: u8 = 1 << 7;
pub const RX_REF_DIVIDER_MSB: u8 = 1 << 0;
pub const REG_REF_DIVIDE_CONFIG_2: u16 = 0x2AC;
pub const RX_REF_DIVIDER_LSB: u8 = 1 << 7;
pub const TX_REF_DIVIDER: u8 = 0x60;
pub const TX_REF_RESET_BAR: u8 = 1 << 4;
pub const TX_REF_DOUBLER_FB_DELAY: u8 = 0x03;

/// Register offset from the RX synthesizer block to the TX block. The two
/// synthesizers expose identical register layouts 0x40 apart.
pub const TX_SYNTH_OFFSET: u16 = 0x40;
