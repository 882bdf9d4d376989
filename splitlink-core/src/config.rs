//! Link configuration
//!
//! Timeouts apply to every send and receive individually, never to a
//! transaction as a whole. A transaction with both payload phases can
//! therefore keep its caller waiting for up to four timeouts.

use splitlink_hal::{Duplex, SerialConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-call I/O timeout
pub const DEFAULT_TIMEOUT_MS: u32 = 50;

/// Minimum spacing of handshake attempts while disconnected
pub const DEFAULT_CONNECTION_CHECK_TIMEOUT_MS: u32 = DEFAULT_TIMEOUT_MS * 5;

/// How long the target waits for an ID before reporting idle
pub const DEFAULT_IDLE_TIMEOUT_MS: u32 = 1000;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The per-call timeout must be non-zero
    ZeroTimeout,
    /// The target idle wait must be non-zero
    ZeroIdleTimeout,
}

/// Split link configuration
///
/// Both halves should use the same serial settings; the timeouts may
/// differ per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Line speed and wiring
    pub serial: SerialConfig,
    /// Timeout for each individual send/receive (ms)
    pub timeout_ms: u32,
    /// Throttle interval for handshake attempts while disconnected (ms)
    pub connection_check_timeout_ms: u32,
    /// Target-side wait for the next transaction ID (ms)
    pub idle_timeout_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            connection_check_timeout_ms: DEFAULT_CONNECTION_CHECK_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

impl LinkConfig {
    /// Same configuration with a different line wiring
    pub fn with_duplex(mut self, duplex: Duplex) -> Self {
        self.serial.duplex = duplex;
        self
    }

    /// Same configuration with a different per-call timeout
    ///
    /// The connection check interval follows at five timeouts.
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self.connection_check_timeout_ms = timeout_ms.saturating_mul(5);
        self
    }

    /// Line wiring
    pub fn duplex(&self) -> Duplex {
        self.serial.duplex
    }

    /// Check the configuration for values the engines cannot run with
    ///
    /// A zero connection check interval is allowed and disables throttling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        Ok(())
    }
}
