//! Uptime clock

use embassy_time::Instant;
use splitlink_hal::Clock;

/// Milliseconds since boot, from the embassy time driver
///
/// The 64-bit uptime is truncated, so readings wrap after ~49 days like
/// the counter the engines expect.
#[derive(Debug, Clone, Copy, Default)]
pub struct UptimeClock;

impl Clock for UptimeClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
