//! Handshake token
//!
//! The transaction ID doubles as the handshake token. The target answers
//! with the ID XORed with [`HANDSHAKE_MAGIC`], which tells the initiator
//! that a peer is listening and agrees on which transaction is running.
//! It is a cheap integrity check, not an authentication mechanism.

/// Wire representation of a transaction ID
pub type TransactionId = u8;

/// XOR mask applied to the ID in the handshake reply
pub const HANDSHAKE_MAGIC: u8 = 7;

/// Byte the target sends back for transaction `id`
pub const fn handshake_token(id: TransactionId) -> u8 {
    id ^ HANDSHAKE_MAGIC
}

/// Check a received handshake byte against the expected reply
pub const fn is_handshake_reply(id: TransactionId, byte: u8) -> bool {
    byte == handshake_token(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_token_values() {
        assert_eq!(handshake_token(0), 7);
        assert_eq!(handshake_token(7), 0);
        assert_eq!(handshake_token(0xFF), 0xF8);
    }

    #[test]
    fn test_reply_is_never_the_id_itself() {
        // A half-duplex echo of the ID must never pass as a reply
        for id in 0..=u8::MAX {
            assert!(!is_handshake_reply(id, id));
        }
    }

    proptest! {
        #[test]
        fn prop_only_the_token_is_accepted(id in any::<u8>(), byte in any::<u8>()) {
            prop_assert_eq!(is_handshake_reply(id, byte), byte == id ^ HANDSHAKE_MAGIC);
        }

        #[test]
        fn prop_token_is_involutive(id in any::<u8>()) {
            prop_assert_eq!(handshake_token(handshake_token(id)), id);
        }
    }
}
