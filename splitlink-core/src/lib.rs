//! Board-agnostic split link logic
//!
//! This crate contains everything about the split link that does not
//! depend on a specific UART:
//!
//! - Transaction registry (fixed table, arena-backed buffers)
//! - Link driver (all-or-nothing transfers, half-duplex echo removal)
//! - Initiator and target engines
//! - RPC helpers and the forced sync throttle
//! - Role detection and link configuration
//!
//! With the `std` feature, [`sim`] provides an in-memory wire pair for
//! running both engines on the host.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod config;
pub mod initiator;
pub mod link;
pub mod registry;
pub mod role;
pub mod rpc;
pub mod sync;
pub mod target;

#[cfg(any(test, feature = "std"))]
pub mod sim;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, LinkConfig};
pub use initiator::{Initiator, LinkStats, Phase, TransactionError};
pub use link::{Link, LinkError};
pub use registry::{Registry, RegistryError, TransactionDescriptor, TransactionHandler};
pub use role::Role;
pub use sync::SyncThrottle;
pub use target::{Target, TargetError, TargetEvent};
