//! A pure-Rust control-plane driver for the Analog Devices AD9361 RF
//! transceiver.
//!
//! The AD9361 derives every internal clock from a single reference input,
//! runs a multi-stage analog/RF calibration procedure, and gates its analog
//! blocks through an enable-state machine (ENSM). This crate implements that
//! control plane:
//!
//! - the clock node graph (reference scalers, fractional-N baseband PLL,
//!   cascaded decimation/interpolation dividers, two fractional-N RF
//!   synthesizers), see [`ClockId`],
//! - the frequency planner that turns a requested baseband sample rate into
//!   a consistent RX/TX rate assignment for the whole chain,
//! - the calibration orchestrator with its "pause tracking loops, force
//!   ALERT, calibrate, restore" guard bracket,
//! - the ENSM controller with duplex-mode dependent transition checks and
//!   the force/restore escape hatch used internally by calibrations.
//!
//! ## Usage overview
//!
//! The physical byte transport is not part of this crate. Implement
//! [`RegisterIo`] for whatever carries your SPI traffic (memory-mapped
//! controller, FTDI bridge, simulation model) and hand it to
//! [`Ad9361::new`] together with an [`Ad9361Config`]. All driver state
//! lives in the returned device value; there are no globals and no internal
//! locking. If several threads share one device, serialize access with a
//! mutex at a higher layer.
//!
//! All "wait for hardware" operations are bounded busy/sleep polls, so every
//! call has a deterministic worst-case latency. Polling intervals can be
//! intercepted through [`RegisterIo::delay_us`], which tests here use to
//! run timeout paths without sleeping.

pub mod bus;
pub mod calib;
pub mod clocks;
pub mod device;
pub mod ensm;
pub mod planner;
pub mod regs;
pub mod rfpll;
pub mod tables;

pub use bus::RegisterIo;
pub use calib::OneShotCal;
pub use clocks::ClockId;
pub use device::{Ad9361, Ad9361Config, DuplexMode, RxGainMode};
pub use ensm::EnsmState;
pub use planner::{RxChainRates, TxChainRates};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid argument provided (out-of-range rate, unknown node, zero
    /// calibration mask, ...).
    #[error("{0}")]
    Argument(&'static str),
    /// A polled status bit never reached its expected value within the
    /// iteration budget.
    #[error("timeout polling reg {reg:#05x} mask {mask:#04x}")]
    Timeout { reg: u16, mask: u8 },
    /// ENSM transition not permitted in the current duplex mode/state.
    #[error("illegal ENSM transition to {requested:?} from {from:?} (fdd={fdd})")]
    IllegalTransition {
        from: EnsmState,
        requested: EnsmState,
        fdd: bool,
    },
    /// The frequency planner exhausted every rate-governor level without
    /// finding a legal divider combination.
    #[error("no solution: {0}")]
    NoSolution(&'static str),
    /// The register transport failed.
    #[error("bus: {0}")]
    Bus(&'static str),
}

/// Result type for operations that may return an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
