//! RPC-style helpers
//!
//! Keymap code rarely wants to fill registry buffers by hand. These helpers
//! copy caller data into the initiator→target buffer, run the transaction
//! and copy the reply back out.

use splitlink_hal::{Clock, SerialPort};
use splitlink_protocol::TransactionId;

use crate::initiator::{Initiator, TransactionError};
use crate::registry::Registry;

impl<P: SerialPort, C: Clock> Initiator<P, C> {
    /// Send `data` as the payload of transaction `id`
    ///
    /// `data` may be shorter than the registered size; the rest of the
    /// buffer is zeroed.
    pub async fn rpc_send<const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
        id: TransactionId,
        data: &[u8],
    ) -> Result<(), TransactionError> {
        // Unknown IDs are reported by the engine itself
        let Some(buffer) = registry.initiator_buffer_mut(id) else {
            return self.transaction(registry, id).await;
        };

        if data.len() > buffer.len() {
            return Err(TransactionError::PayloadTooLarge {
                len: data.len(),
                capacity: buffer.len(),
            });
        }

        let (head, tail) = buffer.split_at_mut(data.len());
        head.copy_from_slice(data);
        tail.fill(0);

        self.transaction(registry, id).await
    }

    /// Send `data_in` and copy the reply into `data_out`
    ///
    /// Returns the number of reply bytes copied, at most `data_out.len()`.
    pub async fn rpc_exec<const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
        id: TransactionId,
        data_in: &[u8],
        data_out: &mut [u8],
    ) -> Result<usize, TransactionError> {
        self.rpc_send(registry, id, data_in).await?;

        let reply = registry
            .target_buffer(id)
            .ok_or(TransactionError::NotRegistered(id))?;
        let n = reply.len().min(data_out.len());
        data_out[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }

    /// Encode `value` with postcard and send it as transaction `id`
    #[cfg(feature = "serde")]
    pub async fn rpc_send_value<T, const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
        id: TransactionId,
        value: &T,
    ) -> Result<(), TransactionError>
    where
        T: serde::Serialize,
    {
        let Some(buffer) = registry.initiator_buffer_mut(id) else {
            return self.transaction(registry, id).await;
        };

        buffer.fill(0);
        encode_value(value, buffer)?;
        self.transaction(registry, id).await
    }
}

/// Encode `value` into the front of `buf`, returning the encoded length
#[cfg(feature = "serde")]
pub fn encode_value<T: serde::Serialize>(
    value: &T,
    buf: &mut [u8],
) -> Result<usize, TransactionError> {
    let capacity = buf.len();
    postcard::to_slice(value, buf)
        .map(|used| used.len())
        .map_err(|e| match e {
            postcard::Error::SerializeBufferFull => TransactionError::PayloadTooLarge {
                len: capacity + 1,
                capacity,
            },
            _ => TransactionError::Encoding,
        })
}

/// Decode a postcard value from a transaction buffer
///
/// Trailing padding after the encoded value is ignored.
#[cfg(feature = "serde")]
pub fn decode_value<'de, T: serde::Deserialize<'de>>(
    buf: &'de [u8],
) -> Result<T, TransactionError> {
    postcard::from_bytes(buf).map_err(|_| TransactionError::Encoding)
}
