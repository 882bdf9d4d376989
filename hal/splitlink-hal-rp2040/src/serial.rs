//! Timeout-bounded serial over a buffered UART
//!
//! The buffered UART moves bytes between the FIFOs and its ring buffers
//! from the UART interrupt and wakes whoever awaits them. [`IoSerial`]
//! awaits those wakeups under a deadline, so a waiting engine leaves the
//! core to the executor (or asleep in `wfe`) instead of polling.

use embassy_time::{with_deadline, Duration, Instant};
use embedded_io_async::{Read, ReadReady, Write};
use splitlink_hal::SerialPort;

/// Scratch size for draining input
const DRAIN_CHUNK: usize = 16;

/// [`SerialPort`] over any async `embedded-io` byte stream
///
/// Intended for `embassy_rp::uart::BufferedUart`, whose RX ring is filled
/// by interrupt while the engines wait.
pub struct IoSerial<T> {
    inner: T,
}

impl<T> IoSerial<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

fn deadline(timeout_ms: u32) -> Instant {
    Instant::now() + Duration::from_millis(u64::from(timeout_ms))
}

impl<T> SerialPort for IoSerial<T>
where
    T: Read + ReadReady + Write,
{
    type Error = T::Error;

    async fn write_timeout(&mut self, data: &[u8], timeout_ms: u32) -> Result<usize, T::Error> {
        let deadline = deadline(timeout_ms);
        let mut written = 0;

        // A write returns once part of the data fits the TX ring
        while written < data.len() {
            match with_deadline(deadline, self.inner.write(&data[written..])).await {
                Ok(n) => written += n?,
                Err(_) => break,
            }
        }

        Ok(written)
    }

    async fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, T::Error> {
        let deadline = deadline(timeout_ms);
        let mut read = 0;

        while read < buf.len() {
            match with_deadline(deadline, self.inner.read(&mut buf[read..])).await {
                Ok(n) => match n? {
                    0 => break,
                    n => read += n,
                },
                Err(_) => break,
            }
        }

        Ok(read)
    }

    async fn skip_timeout(&mut self, n: usize, timeout_ms: u32) -> Result<usize, T::Error> {
        // One deadline for the whole echo, however many chunks it takes
        let deadline = deadline(timeout_ms);
        let mut scratch = [0u8; DRAIN_CHUNK];
        let mut skipped = 0;

        while skipped < n {
            let chunk = (n - skipped).min(DRAIN_CHUNK);
            match with_deadline(deadline, self.inner.read(&mut scratch[..chunk])).await {
                Ok(got) => match got? {
                    0 => break,
                    got => skipped += got,
                },
                Err(_) => break,
            }
        }

        Ok(skipped)
    }

    async fn clear_input(&mut self) {
        let mut scratch = [0u8; DRAIN_CHUNK];
        // A faulting port has nothing left worth keeping either
        while let Ok(true) = self.inner.read_ready() {
            if self.inner.read(&mut scratch).await.is_err() {
                break;
            }
        }
    }
}
