//! Split Link Transaction Protocol
//!
//! This crate defines what crosses the serial line between the two halves
//! of a split keyboard. One half (the initiator) starts every exchange;
//! the other (the target) only ever answers.
//!
//! # Protocol Overview
//!
//! A transaction is four phases, with no framing, lengths, or checksums:
//! ```text
//!   initiator                                target
//!       │ ── ID (1B) ─────────────────────────▶ │
//!       │ ◀──────────────── ID ^ MAGIC (1B) ── │
//!       │ ── initiator→target payload (N1 B) ─▶ │   only if N1 > 0
//!       │ ◀──── target→initiator payload (N2 B) │   only if N2 > 0
//! ```
//!
//! Both halves compile the same transaction table, so payload sizes are
//! implied by the ID. A table mismatch between halves is a desync that
//! cannot be detected on the wire.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod handshake;
pub mod status;

pub use handshake::{handshake_token, is_handshake_reply, TransactionId, HANDSHAKE_MAGIC};
pub use status::{TransactionCode, TransactionStatus};
