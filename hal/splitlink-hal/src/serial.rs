//! Serial line abstractions
//!
//! The split link needs nothing from its UART beyond timeout-bounded byte
//! transfers. Every call returns within its timeout, short counts included,
//! so a missing peer can never hang the caller.

use core::future::Future;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scratch size used by the default [`SerialPort::skip_timeout`]
const SKIP_CHUNK: usize = 16;

/// Serial port with timeout-bounded transfers
///
/// Implementations own both directions of one peripheral. On a half-duplex
/// line TX and RX share a wire, so everything written is also received.
/// Waiting is done by awaiting the peripheral, never by spinning, so the
/// engines can share an executor with other tasks.
pub trait SerialPort {
    /// Error type for peripheral faults (framing, overrun, ...)
    type Error;

    /// Write data to the port
    ///
    /// Waits at most `timeout_ms` for the peripheral to accept the bytes and
    /// returns how many were accepted. A short count means timeout.
    fn write_timeout(
        &mut self,
        data: &[u8],
        timeout_ms: u32,
    ) -> impl Future<Output = Result<usize, Self::Error>>;

    /// Read data from the port
    ///
    /// Waits at most `timeout_ms` for `buf` to fill and returns how many
    /// bytes arrived. A short count means timeout.
    fn read_timeout(
        &mut self,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> impl Future<Output = Result<usize, Self::Error>>;

    /// Drop `n` incoming bytes within `timeout_ms`
    ///
    /// Used to throw away the echo of our own transmission on a half-duplex
    /// line. The default reads into a scratch chunk and splits the timeout
    /// across the chunks, so the whole skip is bounded by one timeout. Ports
    /// that own their input queue should override it with a read-pointer
    /// adjustment.
    fn skip_timeout(
        &mut self,
        n: usize,
        timeout_ms: u32,
    ) -> impl Future<Output = Result<usize, Self::Error>> {
        async move {
            let mut scratch = [0u8; SKIP_CHUNK];
            let mut skipped = 0;
            let mut budget_ms = timeout_ms;

            while skipped < n {
                let left = n - skipped;
                let chunk = left.min(SKIP_CHUNK);
                let share_ms = chunk_share(budget_ms, chunk, left);
                budget_ms -= share_ms;

                let got = self.read_timeout(&mut scratch[..chunk], share_ms).await?;
                skipped += got;
                if got < chunk {
                    break;
                }
            }

            Ok(skipped)
        }
    }

    /// Drop everything buffered on the receive side
    ///
    /// Must not race the receive interrupt: a concurrent producer sees
    /// either the old queue or the empty one.
    fn clear_input(&mut self) -> impl Future<Output = ()>;
}

/// Part of `budget_ms` owed to `chunk` of the `left` bytes still to skip
///
/// `chunk <= left`, so shares never add up to more than the budget and the
/// last chunk gets whatever is left.
fn chunk_share(budget_ms: u32, chunk: usize, left: usize) -> u32 {
    (u64::from(budget_ms) * chunk as u64 / left as u64) as u32
}

/// Line wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Duplex {
    /// Single shared wire; every transmitted byte is echoed back
    #[default]
    Half,
    /// Separate TX and RX wires
    Full,
}

/// Supported line speeds
///
/// Index order matches the `speed` select value used in configuration,
/// fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Speed {
    Baud460800,
    #[default]
    Baud230400,
    Baud115200,
    Baud57600,
    Baud38400,
    Baud19200,
}

impl Speed {
    /// Map a select index (0 = fastest) to a speed
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Speed::Baud460800),
            1 => Some(Speed::Baud230400),
            2 => Some(Speed::Baud115200),
            3 => Some(Speed::Baud57600),
            4 => Some(Speed::Baud38400),
            5 => Some(Speed::Baud19200),
            _ => None,
        }
    }

    /// Look up a speed by its exact baud rate
    pub fn from_baudrate(baudrate: u32) -> Option<Self> {
        (0..6)
            .filter_map(Self::from_index)
            .find(|speed| speed.baudrate() == baudrate)
    }

    /// Baud rate in bits per second
    pub fn baudrate(self) -> u32 {
        match self {
            Speed::Baud460800 => 460_800,
            Speed::Baud230400 => 230_400,
            Speed::Baud115200 => 115_200,
            Speed::Baud57600 => 57_600,
            Speed::Baud38400 => 38_400,
            Speed::Baud19200 => 19_200,
        }
    }
}

/// Serial line configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerialConfig {
    /// Line speed (8N1 framing is implied)
    pub speed: Speed,
    /// Wiring of the link
    pub duplex: Duplex,
}
