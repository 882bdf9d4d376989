//! Link UART configuration
//!
//! The link runs 8N1 on one RP2040 UART, with TX and RX on separate wires
//! crossed between the halves. Both roles bring the pins up the same way.
//!
//! A single shared wire is not supported: the UART drives its TX pad
//! push-pull and RP2040 pads have no open-drain mode, so two halves tied
//! to one wire would fight whenever either sends a zero bit.

use embassy_rp::uart::Config;
use splitlink_hal::{Duplex, SerialConfig};

/// Link settings the RP2040 UART cannot carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringUpError {
    /// One shared wire needs an open-drain TX pad
    HalfDuplexUnsupported,
}

/// Check that a line configuration can be driven by the RP2040 UART
pub fn check_line(serial: &SerialConfig) -> Result<(), BringUpError> {
    match serial.duplex {
        Duplex::Full => Ok(()),
        Duplex::Half => Err(BringUpError::HalfDuplexUnsupported),
    }
}

/// Peripheral configuration for the link line
///
/// Only the speed is configurable.
pub fn uart_config(serial: &SerialConfig) -> Result<Config, BringUpError> {
    check_line(serial)?;

    let mut config = Config::default();
    config.baudrate = serial.speed.baudrate();
    Ok(config)
}
