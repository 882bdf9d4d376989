//! Configuration loading and parsing
//!
//! Link settings come from split.toml, embedded at compile time and
//! parsed by a custom no_std parser.

pub mod toml;

pub use toml::{parse_config, FirmwareConfig};
