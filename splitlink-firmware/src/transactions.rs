//! Transaction table shared by both halves
//!
//! Both halves register exactly this table, in this order. Handlers only
//! ever run on the target; registering them on the initiator is harmless.

use embassy_time::Instant;
use splitlink_core::registry::{Registry, RegistryError};
use splitlink_core::rpc::decode_value;
use splitlink_protocol::TransactionId;

use crate::state::{self, SharedState};

/// Liveness probe, no payload
pub const PING: TransactionId = 0;
/// Initiator's max WPM, 1 byte
pub const MAX_WPM: TransactionId = 1;
/// Postcard-encoded [`SharedState`]
pub const SHARED_STATE: TransactionId = 2;
/// Target heartbeat counter, little-endian u32
pub const TARGET_STATE: TransactionId = 3;

pub const NUM_TRANSACTIONS: usize = 4;

/// Encoded [`SharedState`] capacity
pub const SHARED_STATE_SIZE: usize = 8;

pub const ARENA_SIZE: usize = 1 + SHARED_STATE_SIZE + 4;

/// Heartbeat period (ms)
const HEARTBEAT_MS: u64 = 100;

pub type LinkRegistry = Registry<'static, NUM_TRANSACTIONS, ARENA_SIZE>;

/// Build the transaction table
pub fn registry() -> Result<LinkRegistry, RegistryError> {
    let mut registry = LinkRegistry::new();
    registry.register(PING, 0, 0)?;
    registry.register_with_handler(MAX_WPM, 1, 0, &handle_max_wpm)?;
    registry.register_with_handler(SHARED_STATE, SHARED_STATE_SIZE, 0, &handle_shared_state)?;
    registry.register_with_handler(TARGET_STATE, 0, 4, &handle_target_state)?;
    Ok(registry)
}

fn handle_max_wpm(input: &[u8], _output: &mut [u8]) {
    if let Some(&wpm) = input.first() {
        state::set_peer_max_wpm(wpm);
    }
}

fn handle_shared_state(input: &[u8], _output: &mut [u8]) {
    match decode_value::<SharedState>(input) {
        Ok(shared) => state::set_peer(shared),
        Err(_) => defmt::warn!("Undecodable shared state"),
    }
}

fn handle_target_state(_input: &[u8], output: &mut [u8]) {
    let beat = (Instant::now().as_millis() / HEARTBEAT_MS) as u32;
    if let Some(out) = output.get_mut(..4) {
        out.copy_from_slice(&beat.to_le_bytes());
    }
}
