//! Direct-wired key scanning
//!
//! The initiator half reads a few switches wired straight to GPIOs, active
//! low with internal pull-ups. Every press feeds the typing speed estimate.
//! The layer, shift and caps keys also change the state mirrored on the
//! other half.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};
use splitlink_hal::Clock;
use splitlink_hal_rp2040::UptimeClock;

use crate::state::{self, SharedState, LED_CAPS_LOCK, MOD_LSHIFT};
use crate::wpm::WpmCounter;

/// Scan period; switch bounce settles within it
const SCAN_INTERVAL_MS: u64 = 5;

pub const NUM_KEYS: usize = 7;

// Positions in the key array; the rest are plain keys
const LAYER_KEY: usize = 0;
const SHIFT_KEY: usize = 1;
const CAPS_KEY: usize = 2;

#[embassy_executor::task]
pub async fn keys_task(mut keys: [Input<'static>; NUM_KEYS]) {
    info!("Key scan task started");

    let mut ticker = Ticker::every(Duration::from_millis(SCAN_INTERVAL_MS));
    let mut wpm = WpmCounter::new();
    let mut pressed = [false; NUM_KEYS];
    let mut shared = SharedState::new();

    loop {
        ticker.next().await;
        let now = UptimeClock.now_ms();

        for (i, key) in keys.iter_mut().enumerate() {
            let down = key.is_low();
            if down == pressed[i] {
                continue;
            }
            pressed[i] = down;

            if down {
                trace!("Key {} pressed", i);
                wpm.press(now);
                if i == CAPS_KEY {
                    shared.leds ^= LED_CAPS_LOCK;
                }
            }
        }

        shared.layer = u8::from(pressed[LAYER_KEY]);
        shared.mods = if pressed[SHIFT_KEY] { MOD_LSHIFT } else { 0 };

        state::set_local(shared);
        state::set_local_max_wpm(wpm.max_wpm());
    }
}
