//! Keyboard state mirrored across the link
//!
//! On the initiator the key scan task publishes local values here for the
//! housekeeping task to push; on the target the transaction handlers store
//! what arrived, and the indicator follows it.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicU8, Ordering};
use serde::{Deserialize, Serialize};

/// Left shift bit of the HID modifier byte
pub const MOD_LSHIFT: u8 = 0x02;
/// Caps lock bit of the HID LED byte
pub const LED_CAPS_LOCK: u8 = 0x02;

/// Layer and indicator state shown on both halves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, defmt::Format)]
pub struct SharedState {
    /// Highest active layer
    pub layer: u8,
    /// Host LED bits (num, caps, scroll, ...)
    pub leds: u8,
    /// Active modifier bits
    pub mods: u8,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            layer: 0,
            leds: 0,
            mods: 0,
        }
    }

    /// Check if the indicator LED should be lit
    pub fn indicator(&self) -> bool {
        self.layer != 0 || self.leds & LED_CAPS_LOCK != 0
    }
}

static LOCAL_STATE: Mutex<CriticalSectionRawMutex, Cell<SharedState>> =
    Mutex::new(Cell::new(SharedState::new()));
static PEER_STATE: Mutex<CriticalSectionRawMutex, Cell<SharedState>> =
    Mutex::new(Cell::new(SharedState::new()));

static LOCAL_MAX_WPM: AtomicU8 = AtomicU8::new(0);
static PEER_MAX_WPM: AtomicU8 = AtomicU8::new(0);

/// State this half publishes
pub fn local() -> SharedState {
    LOCAL_STATE.lock(|state| state.get())
}

pub fn set_local(state: SharedState) {
    LOCAL_STATE.lock(|cell| cell.set(state));
}

/// Max WPM this half publishes
pub fn local_max_wpm() -> u8 {
    LOCAL_MAX_WPM.load(Ordering::Relaxed)
}

pub fn set_local_max_wpm(wpm: u8) {
    LOCAL_MAX_WPM.store(wpm, Ordering::Relaxed);
}

/// Last state received from the other half
pub fn peer() -> SharedState {
    PEER_STATE.lock(|state| state.get())
}

pub fn set_peer(state: SharedState) {
    PEER_STATE.lock(|cell| cell.set(state));
}

/// Last max WPM received from the other half
pub fn peer_max_wpm() -> u8 {
    PEER_MAX_WPM.load(Ordering::Relaxed)
}

pub fn set_peer_max_wpm(wpm: u8) {
    PEER_MAX_WPM.store(wpm, Ordering::Relaxed);
}
