//! Simple TOML parser for the link configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! split.toml. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - [section] headers
//! - Comments (# ...)

use splitlink_core::config::{ConfigError, LinkConfig};
use splitlink_hal::{Duplex, Speed};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Unknown key in a known section
    UnknownKey,
    /// Invalid value type
    InvalidValue,
    /// Baud rate is not one of the supported speeds
    UnsupportedSpeed(u32),
    /// Single-wire link, which the RP2040 UART cannot drive
    UnsupportedDuplex,
    /// Values parse but cannot run the link
    Invalid(ConfigError),
}

/// Everything split.toml configures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareConfig {
    pub link: LinkConfig,
    /// Strap pin level that selects the initiator role
    pub initiator_level: bool,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default().with_duplex(Duplex::Full),
            initiator_level: true,
        }
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Link,
    Role,
}

/// Parse split.toml into a [`FirmwareConfig`]
///
/// Keys that are absent keep their defaults. When the timeout is given
/// without a check interval, the interval follows at five timeouts.
pub fn parse_config(input: &str) -> Result<FirmwareConfig, ParseError> {
    let mut config = FirmwareConfig::default();
    let mut section = Section::Root;
    let mut check_interval = None;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidValue)?;
        match section {
            Section::Link => match key {
                "speed" => {
                    let baud: u32 = parse_int(value)?;
                    config.link.serial.speed =
                        Speed::from_baudrate(baud).ok_or(ParseError::UnsupportedSpeed(baud))?;
                }
                "duplex" => config.link.serial.duplex = parse_duplex(value)?,
                "timeout_ms" => config.link = config.link.with_timeout(parse_int(value)?),
                "connection_check_timeout_ms" => check_interval = Some(parse_int(value)?),
                "idle_timeout_ms" => config.link.idle_timeout_ms = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            },
            Section::Role => match key {
                "initiator_level" => config.initiator_level = parse_level(value)?,
                _ => return Err(ParseError::UnknownKey),
            },
            Section::Root => return Err(ParseError::UnknownKey),
        }
    }

    if let Some(interval) = check_interval {
        config.link.connection_check_timeout_ms = interval;
    }

    config.link.validate().map_err(ParseError::Invalid)?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "link" => Ok(Section::Link),
        "role" => Ok(Section::Role),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse key = value line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = match value.find('#') {
        // Make sure # is not inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn parse_string(value: &str) -> &str {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    // TOML allows digit separators
    let mut digits = [0u8; 16];
    let mut len = 0;
    for byte in value.bytes().filter(|b| *b != b'_') {
        *digits.get_mut(len).ok_or(ParseError::InvalidValue)? = byte;
        len += 1;
    }

    core::str::from_utf8(&digits[..len])
        .map_err(|_| ParseError::InvalidValue)?
        .parse()
        .map_err(|_| ParseError::InvalidValue)
}

fn parse_duplex(value: &str) -> Result<Duplex, ParseError> {
    match parse_string(value) {
        "half" => Err(ParseError::UnsupportedDuplex),
        "full" => Ok(Duplex::Full),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Pin level as `true`/`false` or `"high"`/`"low"`
fn parse_level(value: &str) -> Result<bool, ParseError> {
    match parse_string(value) {
        "true" | "high" => Ok(true),
        "false" | "low" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config(""), Ok(FirmwareConfig::default()));
        assert_eq!(parse_config("# nothing\n\n"), Ok(FirmwareConfig::default()));
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
[link]
speed = 115_200
duplex = "full"   # two wires
timeout_ms = 20
connection_check_timeout_ms = 500
idle_timeout_ms = 2000

[role]
initiator_level = "low"
"#,
        )
        .unwrap();

        assert_eq!(config.link.serial.speed, Speed::Baud115200);
        assert_eq!(config.link.duplex(), Duplex::Full);
        assert_eq!(config.link.timeout_ms, 20);
        assert_eq!(config.link.connection_check_timeout_ms, 500);
        assert_eq!(config.link.idle_timeout_ms, 2000);
        assert!(!config.initiator_level);
    }

    #[test]
    fn test_default_link_is_full_duplex() {
        let config = parse_config("[link]\nspeed = 230400\n").unwrap();
        assert_eq!(config.link.duplex(), Duplex::Full);
        assert!(splitlink_hal_rp2040::check_line(&config.link.serial).is_ok());
    }

    #[test]
    fn test_rejects_single_wire_link() {
        assert_eq!(
            parse_config("[link]\nduplex = \"half\"\n"),
            Err(ParseError::UnsupportedDuplex)
        );
    }

    #[test]
    fn test_check_interval_follows_timeout() {
        let config = parse_config("[link]\ntimeout_ms = 30\n").unwrap();
        assert_eq!(config.link.connection_check_timeout_ms, 150);
    }

    #[test]
    fn test_check_interval_order_independent() {
        let config =
            parse_config("[link]\nconnection_check_timeout_ms = 40\ntimeout_ms = 30\n").unwrap();
        assert_eq!(config.link.connection_check_timeout_ms, 40);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(parse_config("[keymap]\n"), Err(ParseError::InvalidSection));
        assert_eq!(parse_config("speed = 1\n"), Err(ParseError::UnknownKey));
        assert_eq!(parse_config("[link]\nparity = 1\n"), Err(ParseError::UnknownKey));
        assert_eq!(
            parse_config("[link]\nduplex = \"simplex\"\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[link]\nspeed = 9600\n"),
            Err(ParseError::UnsupportedSpeed(9600))
        );
        assert_eq!(
            parse_config("[link]\ntimeout_ms = 0\n"),
            Err(ParseError::Invalid(ConfigError::ZeroTimeout))
        );
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("a = 1 # c"), Some(("a", "1")));
        assert_eq!(parse_key_value("a = \"x # y\""), Some(("a", "\"x # y\"")));
        assert_eq!(parse_key_value("a ="), None);
    }
}
