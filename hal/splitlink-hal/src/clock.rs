//! Millisecond time source

/// Monotonic millisecond clock
///
/// The counter is 32 bits wide and wraps after ~49 days; elapsed time is
/// computed modulo 2^32, so intervals stay correct across the wrap.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch (usually boot)
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since an earlier [`Clock::now_ms`] reading
    fn elapsed_ms(&self, since: u32) -> u32 {
        self.now_ms().wrapping_sub(since)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
