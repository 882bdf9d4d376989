//! Inter-task communication channels
//!
//! Defines the static signals used between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use splitlink_core::LinkStats;

/// Link health as seen by the initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct LinkStatus {
    pub connected: bool,
    /// Last heartbeat counter reported by the target
    pub peer_heartbeat: Option<u32>,
    pub stats: LinkStats,
}

/// Link status signal (updated by housekeeping on connect/disconnect)
pub static LINK_STATUS: Signal<CriticalSectionRawMutex, LinkStatus> = Signal::new();
