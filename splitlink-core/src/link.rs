//! Link driver
//!
//! Turns the short-count results of a [`SerialPort`] into all-or-nothing
//! transfers, and hides the half-duplex echo from the engines.

use splitlink_hal::{Duplex, SerialPort};

use crate::config::LinkConfig;

/// Link transfer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Fewer bytes than requested were transferred before the timeout
    Incomplete { expected: usize, transferred: usize },
    /// The echo of a half-duplex transmission did not come back in full
    EchoLost { expected: usize, discarded: usize },
    /// The peripheral reported a fault
    Port,
}

/// Serial link to the other half
pub struct Link<P> {
    port: P,
    duplex: Duplex,
    timeout_ms: u32,
}

impl<P: SerialPort> Link<P> {
    /// Wrap an initialized port
    pub fn new(port: P, config: &LinkConfig) -> Self {
        Self {
            port,
            duplex: config.duplex(),
            timeout_ms: config.timeout_ms,
        }
    }

    /// Line wiring
    pub fn duplex(&self) -> Duplex {
        self.duplex
    }

    /// Per-call timeout (ms)
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Send all of `data` within the timeout
    ///
    /// On a half-duplex line the transmitted bytes are read back and
    /// dropped before returning.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), LinkError> {
        let written = self
            .port
            .write_timeout(data, self.timeout_ms)
            .await
            .map_err(|_| LinkError::Port)?;

        if written != data.len() {
            return Err(LinkError::Incomplete {
                expected: data.len(),
                transferred: written,
            });
        }

        if self.duplex == Duplex::Half && !data.is_empty() {
            let discarded = self
                .port
                .skip_timeout(data.len(), self.timeout_ms)
                .await
                .map_err(|_| LinkError::Port)?;

            if discarded != data.len() {
                return Err(LinkError::EchoLost {
                    expected: data.len(),
                    discarded,
                });
            }
        }

        Ok(())
    }

    /// Fill all of `buf` within the timeout
    pub async fn receive(&mut self, buf: &mut [u8]) -> Result<(), LinkError> {
        let read = self
            .port
            .read_timeout(buf, self.timeout_ms)
            .await
            .map_err(|_| LinkError::Port)?;

        if read != buf.len() {
            return Err(LinkError::Incomplete {
                expected: buf.len(),
                transferred: read,
            });
        }

        Ok(())
    }

    /// Wait up to `timeout_ms` for a single byte
    ///
    /// Returns `Ok(None)` if nothing arrived.
    pub async fn receive_token(&mut self, timeout_ms: u32) -> Result<Option<u8>, LinkError> {
        let mut token = [0u8; 1];
        let read = self
            .port
            .read_timeout(&mut token, timeout_ms)
            .await
            .map_err(|_| LinkError::Port)?;

        Ok((read == 1).then_some(token[0]))
    }

    /// Drop all buffered input
    ///
    /// Called after a failed exchange so its leftovers cannot be read as
    /// part of the next one.
    pub async fn reset(&mut self) {
        self.port.clear_input().await;
    }

    /// Underlying port
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Underlying port, mutably
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
