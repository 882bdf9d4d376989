//! Transaction outcome codes
//!
//! [`TransactionCode`] is what an initiator-side caller sees for one
//! attempt. [`TransactionStatus`] is the target-side status cell of a
//! registered transaction, written once per attempt that got far enough
//! to touch it.

/// Outcome of one transaction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransactionCode {
    /// All phases completed
    End = 0x00,
    /// Timeout or handshake mismatch; the peer is absent or busy
    NoResponse = 0x01,
    /// Target-side failure mid-transaction (status cell only)
    DataError = 0x02,
    /// Invalid or unregistered ID; a configuration bug, never transient
    TypeError = 0x04,
}

impl TransactionCode {
    /// Parse a code from its wire/telemetry value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(TransactionCode::End),
            0x01 => Some(TransactionCode::NoResponse),
            0x02 => Some(TransactionCode::DataError),
            0x04 => Some(TransactionCode::TypeError),
            _ => None,
        }
    }

    /// Check if retrying on the next scheduled attempt can succeed
    pub fn is_transient(self) -> bool {
        matches!(self, TransactionCode::NoResponse)
    }
}

/// Target-side status cell of a registered transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransactionStatus {
    /// Never written since registration
    #[default]
    Idle = 0xFF,
    /// The last attempt that reached the target failed mid-way
    DataError = TransactionCode::DataError as u8,
    /// The last attempt that reached the target completed
    Accepted = 0x08,
}

impl TransactionStatus {
    /// Parse a status from its telemetry value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0xFF => Some(TransactionStatus::Idle),
            0x02 => Some(TransactionStatus::DataError),
            0x08 => Some(TransactionStatus::Accepted),
            _ => None,
        }
    }
}
