//! Typing speed estimate
//!
//! Presses are counted in half-second buckets over a five second window,
//! and a word is five presses, so a steady five presses per second reads
//! as 60 WPM. Idle buckets roll out of the window as time passes.

const BUCKET_MS: u32 = 500;
const BUCKETS: usize = 10;
const WINDOW_MS: u32 = BUCKET_MS * BUCKETS as u32;
const PRESSES_PER_WORD: u64 = 5;

/// Rolling words-per-minute counter with a session maximum
#[derive(Debug, Clone)]
pub struct WpmCounter {
    buckets: [u16; BUCKETS],
    /// Bucket that `head_start_ms` belongs to
    head: usize,
    head_start_ms: Option<u32>,
    max: u8,
}

impl Default for WpmCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl WpmCounter {
    pub const fn new() -> Self {
        Self {
            buckets: [0; BUCKETS],
            head: 0,
            head_start_ms: None,
            max: 0,
        }
    }

    /// Count one key press
    pub fn press(&mut self, now_ms: u32) {
        self.advance(now_ms);
        self.buckets[self.head] = self.buckets[self.head].saturating_add(1);
        self.max = self.max.max(self.estimate());
    }

    /// Current estimate
    pub fn wpm(&mut self, now_ms: u32) -> u8 {
        self.advance(now_ms);
        self.estimate()
    }

    /// Highest estimate reached at any press
    pub fn max_wpm(&self) -> u8 {
        self.max
    }

    fn estimate(&self) -> u8 {
        let presses: u64 = self.buckets.iter().map(|&b| u64::from(b)).sum();
        let wpm = presses * 60_000 / (PRESSES_PER_WORD * u64::from(WINDOW_MS));
        wpm.min(u64::from(u8::MAX)) as u8
    }

    fn advance(&mut self, now_ms: u32) {
        let Some(start) = self.head_start_ms else {
            self.head_start_ms = Some(now_ms);
            return;
        };

        let elapsed = now_ms.wrapping_sub(start);
        if elapsed >= WINDOW_MS {
            self.buckets = [0; BUCKETS];
            self.head_start_ms = Some(now_ms);
            return;
        }

        let steps = elapsed / BUCKET_MS;
        for _ in 0..steps {
            self.head = (self.head + 1) % BUCKETS;
            self.buckets[self.head] = 0;
        }
        self.head_start_ms = Some(start.wrapping_add(steps * BUCKET_MS));
    }
}
