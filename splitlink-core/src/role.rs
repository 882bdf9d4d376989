//! Role detection
//!
//! Each half reads a strap pin once at boot to decide whether it starts
//! transactions or answers them.

use embedded_hal::digital::InputPin;

/// Side of the link this half plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Starts transactions (usually the half with USB)
    Initiator,
    /// Serves transactions
    Target,
}

impl Role {
    /// Read the role from a strap pin
    ///
    /// The half is the initiator when the pin reads `initiator_level`
    /// (`true` = high). A pin that cannot be read yields `Target`, so a
    /// faulty half never drives the link.
    pub fn from_pin<P: InputPin>(pin: &mut P, initiator_level: bool) -> Self {
        match pin.is_high() {
            Ok(level) if level == initiator_level => Role::Initiator,
            Ok(_) => Role::Target,
            Err(_) => {
                warn!("Role pin unreadable, assuming target");
                Role::Target
            }
        }
    }

    pub fn is_initiator(&self) -> bool {
        matches!(self, Role::Initiator)
    }
}
