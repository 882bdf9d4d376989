//! Forced sync throttle
//!
//! Values mirrored to the other half are pushed when they change, and
//! again every `interval_ms` so a target that rebooted or missed an update
//! catches up.

/// Default forced sync interval (ms)
pub const DEFAULT_SYNC_INTERVAL_MS: u32 = 100;

/// Change-or-interval sync gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncThrottle {
    interval_ms: u32,
    changed: bool,
    last_sync_ms: Option<u32>,
}

impl Default for SyncThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_INTERVAL_MS)
    }
}

impl SyncThrottle {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            changed: false,
            last_sync_ms: None,
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Record that the mirrored value changed
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Check if a sync is due at `now_ms`
    pub fn should_sync(&self, now_ms: u32) -> bool {
        match self.last_sync_ms {
            None => true,
            Some(last) => self.changed || now_ms.wrapping_sub(last) > self.interval_ms,
        }
    }

    /// Record a successful sync at `now_ms`
    ///
    /// Not called on failure, so a change stays pending until it is
    /// delivered.
    pub fn synced(&mut self, now_ms: u32) {
        self.changed = false;
        self.last_sync_ms = Some(now_ms);
    }
}
