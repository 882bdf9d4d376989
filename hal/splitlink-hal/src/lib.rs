//! Splitlink Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the split link runs on, so the
//! transaction engines can be driven by a real UART on the keyboard or by
//! a simulated wire on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  splitlink-core (registry, engines)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  splitlink-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ splitlink-hal-│       │ host sim wire │
//! │    rp2040     │       │ (core, std)   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`serial::SerialPort`] - Timeout-bounded serial byte I/O
//! - [`clock::Clock`] - Millisecond uptime

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod queue;
pub mod serial;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use queue::InputQueue;
pub use serial::{Duplex, SerialConfig, SerialPort, Speed};
