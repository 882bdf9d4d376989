//! RP2040-specific HAL for the split keyboard link
//!
//! This crate provides RP2040 implementations of the split link traits:
//! - [`serial::IoSerial`] - async `SerialPort` over the interrupt-buffered UART
//! - [`clock::UptimeClock`] - `Clock` over the embassy time driver
//! - [`uart`] - line checks and UART configuration for the link

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod serial;
pub mod uart;

pub use clock::UptimeClock;
pub use serial::IoSerial;
pub use uart::{check_line, uart_config, BringUpError};
