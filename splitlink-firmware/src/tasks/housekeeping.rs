//! Initiator housekeeping task
//!
//! Runs every 10 ms on the initiator. While the link is down it only
//! pings, which the connection throttle spaces out on its own. Once
//! connected it pushes max WPM and the shared state published by the key
//! scan task through their sync throttles and reads the target heartbeat.
//! Link waits are awaited, so the key scan keeps running meanwhile.

use defmt::*;
use embassy_rp::uart::BufferedUart;
use embassy_time::{Duration, Ticker};
use splitlink_core::{Initiator, SyncThrottle};
use splitlink_hal::Clock;
use splitlink_hal_rp2040::{IoSerial, UptimeClock};

use crate::channels::{LinkStatus, LINK_STATUS};
use crate::state;
use crate::transactions::{LinkRegistry, MAX_WPM, PING, SHARED_STATE, TARGET_STATE};

/// Housekeeping period
const HOUSEKEEPING_INTERVAL_MS: u64 = 10;

/// Heartbeat read period
const HEARTBEAT_INTERVAL_MS: u32 = 500;

pub type LinkInitiator = Initiator<IoSerial<BufferedUart>, UptimeClock>;

#[embassy_executor::task]
pub async fn housekeeping_task(mut initiator: LinkInitiator, registry: &'static mut LinkRegistry) {
    info!("Housekeeping task started");

    let mut ticker = Ticker::every(Duration::from_millis(HOUSEKEEPING_INTERVAL_MS));
    let mut wpm_sync = SyncThrottle::default();
    let mut state_sync = SyncThrottle::default();
    let mut heartbeat_sync = SyncThrottle::new(HEARTBEAT_INTERVAL_MS);

    let mut sent_wpm = None;
    let mut sent_state = None;
    let mut status = LinkStatus {
        connected: false,
        peer_heartbeat: None,
        stats: initiator.stats(),
    };

    loop {
        ticker.next().await;
        let now = UptimeClock.now_ms();

        if !initiator.is_connected() {
            let _ = initiator.transaction(registry, PING).await;
        } else {
            let wpm = state::local_max_wpm();
            if sent_wpm != Some(wpm) {
                wpm_sync.mark_changed();
            }
            if wpm_sync.should_sync(now)
                && initiator.rpc_send(registry, MAX_WPM, &[wpm]).await.is_ok()
            {
                wpm_sync.synced(now);
                sent_wpm = Some(wpm);
            }

            let shared = state::local();
            if sent_state != Some(shared) {
                state_sync.mark_changed();
            }
            if state_sync.should_sync(now)
                && initiator
                    .rpc_send_value(registry, SHARED_STATE, &shared)
                    .await
                    .is_ok()
            {
                state_sync.synced(now);
                sent_state = Some(shared);
            }

            if heartbeat_sync.should_sync(now) {
                let mut beat = [0u8; 4];
                if let Ok(4) = initiator
                    .rpc_exec(registry, TARGET_STATE, &[], &mut beat)
                    .await
                {
                    heartbeat_sync.synced(now);
                    status.peer_heartbeat = Some(u32::from_le_bytes(beat));
                }
            }
        }

        if initiator.is_connected() != status.connected {
            status.connected = initiator.is_connected();
            status.stats = initiator.stats();
            if !status.connected {
                // Force a full resync once the target is back
                sent_wpm = None;
                sent_state = None;
            }
            LINK_STATUS.signal(status);
        }
    }
}
