//! Deterministic test doubles
//!
//! [`ScriptedPort`] serves pre-queued bytes, records what was written and
//! counts every call, so tests can assert that an operation did no I/O.
//! Reads never wait: an empty queue is an instant timeout, so every future
//! it returns is ready on first poll.

use core::cell::Cell;
use std::collections::VecDeque;
use std::vec::Vec;

use splitlink_hal::{Clock, SerialPort};

/// Call-counting fake serial port
#[derive(Debug, Default)]
pub struct ScriptedPort {
    rx: VecDeque<u8>,
    written: Vec<u8>,
    echo: bool,
    write_capacity: Option<usize>,
    fault: bool,
    pub writes: usize,
    pub reads: usize,
    pub skips: usize,
    pub clears: usize,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loop transmitted bytes back like a shared half-duplex wire
    ///
    /// The echo is placed ahead of anything queued, so queued bytes act as
    /// the peer's answer to what we send.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Accept only `bytes` more bytes in total, then short-write
    pub fn with_write_capacity(mut self, bytes: usize) -> Self {
        self.write_capacity = Some(bytes);
        self
    }

    /// Fail every transfer with a port error
    pub fn with_fault(mut self) -> Self {
        self.fault = true;
        self
    }

    /// Make bytes available to the next reads
    pub fn queue(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Everything written so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Bytes still waiting to be read
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Total number of port calls of any kind
    pub fn io_calls(&self) -> usize {
        self.writes + self.reads + self.skips + self.clears
    }
}

impl SerialPort for ScriptedPort {
    type Error = ();

    async fn write_timeout(&mut self, data: &[u8], _timeout_ms: u32) -> Result<usize, ()> {
        self.writes += 1;
        if self.fault {
            return Err(());
        }

        let n = match self.write_capacity.as_mut() {
            Some(capacity) => {
                let n = data.len().min(*capacity);
                *capacity -= n;
                n
            }
            None => data.len(),
        };

        self.written.extend_from_slice(&data[..n]);
        if self.echo {
            for &byte in data[..n].iter().rev() {
                self.rx.push_front(byte);
            }
        }
        Ok(n)
    }

    async fn read_timeout(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, ()> {
        self.reads += 1;
        if self.fault {
            return Err(());
        }

        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    async fn skip_timeout(&mut self, n: usize, _timeout_ms: u32) -> Result<usize, ()> {
        self.skips += 1;
        if self.fault {
            return Err(());
        }

        let n = n.min(self.rx.len());
        self.rx.drain(..n);
        Ok(n)
    }

    async fn clear_input(&mut self) {
        self.clears += 1;
        self.rx.clear();
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock(Cell<u32>);

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self(Cell::new(start_ms))
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}
