//! Target engine
//!
//! Runs on the responding half, on a core or thread of its own. Each
//! [`Target::poll`] awaits one transaction ID, answers the handshake,
//! receives the initiator's payload, runs the registered handler and sends
//! the reply payload, in that order. The status cell of the transaction is
//! written once: `Accepted` at the end, or `DataError` at the first failure.
//!
//! After any failure the receive buffer is dropped before the next wait, so
//! the remains of an aborted exchange are never read as a new ID.

use splitlink_hal::SerialPort;
use splitlink_protocol::{handshake_token, TransactionId, TransactionStatus};

use crate::config::LinkConfig;
use crate::link::Link;
use crate::registry::{Registry, RegistryError};

/// Result of one successful poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetEvent {
    /// No ID arrived within the idle timeout
    Idle,
    /// Transaction completed and marked `Accepted`
    Served(TransactionId),
}

/// Target-side failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetError {
    /// Received byte is not a valid transaction ID; nothing was sent
    Desync(u8),
    /// ID is in range but not registered on this half; nothing was sent
    Unregistered(TransactionId),
    /// Handshake reply could not be sent
    Handshake(TransactionId),
    /// Initiator payload did not arrive in full
    Receive(TransactionId),
    /// Reply payload could not be sent
    Send(TransactionId),
    /// The peripheral reported a fault while waiting for an ID
    Port,
}

/// Transaction target bound to one link
pub struct Target<P> {
    link: Link<P>,
    idle_timeout_ms: u32,
}

impl<P: SerialPort> Target<P> {
    /// Create a target on an initialized port
    pub fn new(port: P, config: &LinkConfig) -> Self {
        Self {
            link: Link::new(port, config),
            idle_timeout_ms: config.idle_timeout_ms,
        }
    }

    pub fn link(&self) -> &Link<P> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<P> {
        &mut self.link
    }

    /// Serve transactions forever
    pub async fn run<const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
    ) -> ! {
        info!("Split link target running");

        loop {
            match self.poll(registry).await {
                Ok(TargetEvent::Served(id)) => trace!("Served transaction {}", id),
                Ok(TargetEvent::Idle) => {}
                Err(e) => warn!("Transaction aborted: {:?}", e),
            }
        }
    }

    /// Wait for and serve at most one transaction
    pub async fn poll<const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
    ) -> Result<TargetEvent, TargetError> {
        let result = self.react(registry).await;
        if result.is_err() {
            self.link.reset().await;
        }
        result
    }

    async fn react<const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
    ) -> Result<TargetEvent, TargetError> {
        let id = match self.link.receive_token(self.idle_timeout_ms).await {
            Ok(Some(id)) => id,
            Ok(None) => return Ok(TargetEvent::Idle),
            Err(_) => return Err(TargetError::Port),
        };

        // Without a descriptor the payload sizes are unknown; stay silent
        // and let the initiator time out
        let desc = registry.resolve(id).map_err(|e| match e {
            RegistryError::InvalidId(_) => TargetError::Desync(id),
            _ => TargetError::Unregistered(id),
        })?;

        if self.link.send(&[handshake_token(id)]).await.is_err() {
            registry.set_status(id, TransactionStatus::DataError);
            return Err(TargetError::Handshake(id));
        }

        if desc.initiator_to_target_size() > 0
            && self
                .link
                .receive(registry.initiator_slice_mut(&desc))
                .await
                .is_err()
        {
            registry.set_status(id, TransactionStatus::DataError);
            return Err(TargetError::Receive(id));
        }

        if let Some(handler) = desc.handler() {
            let (input, output) = registry.buffers_mut(&desc);
            handler.handle(input, output);
        }

        if desc.target_to_initiator_size() > 0
            && self
                .link
                .send(registry.target_slice(&desc))
                .await
                .is_err()
        {
            registry.set_status(id, TransactionStatus::DataError);
            return Err(TargetError::Send(id));
        }

        registry.set_status(id, TransactionStatus::Accepted);
        Ok(TargetEvent::Served(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initiator::Initiator;
    use crate::registry::TransactionHandler;
    use crate::testing::{ManualClock, ScriptedPort};
    use core::sync::atomic::{AtomicUsize, Ordering};
    use embassy_futures::block_on;
    use proptest::prelude::*;
    use splitlink_hal::Duplex;
    use std::sync::Mutex;
    use std::vec::Vec;

    const PING: u8 = 0;
    const ECHO: u8 = 1;
    const UNUSED: u8 = 2;

    /// Records its input and answers with the input inverted
    #[derive(Default)]
    struct Invert {
        seen: Mutex<Vec<u8>>,
        calls: AtomicUsize,
    }

    impl TransactionHandler for Invert {
        fn handle(&self, input: &[u8], output: &mut [u8]) {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.seen.lock().unwrap().extend_from_slice(input);
            for (out, byte) in output.iter_mut().zip(input) {
                *out = !byte;
            }
        }
    }

    fn target(port: ScriptedPort) -> Target<ScriptedPort> {
        Target::new(port, &LinkConfig::default().with_duplex(Duplex::Full))
    }

    fn registry(handler: &Invert) -> Registry<'_, 3, 8> {
        let mut registry = Registry::new();
        registry.register(PING, 0, 0).unwrap();
        registry.register_with_handler(ECHO, 2, 2, handler).unwrap();
        registry
    }

    #[test]
    fn test_idle_without_input() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut target = target(ScriptedPort::new());

        assert_eq!(block_on(target.poll(&mut registry)), Ok(TargetEvent::Idle));
        assert!(target.link().port().written().is_empty());
    }

    #[test]
    fn test_ping_is_answered() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new();
        port.queue(&[PING]);
        let mut target = target(port);

        assert_eq!(block_on(target.poll(&mut registry)), Ok(TargetEvent::Served(PING)));
        assert_eq!(target.link().port().written(), &[handshake_token(PING)]);
        assert_eq!(registry.status(PING), Some(TransactionStatus::Accepted));
    }

    #[test]
    fn test_handler_sees_input_and_writes_reply() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new();
        port.queue(&[ECHO, 0x0F, 0xF0]);
        let mut target = target(port);

        assert_eq!(block_on(target.poll(&mut registry)), Ok(TargetEvent::Served(ECHO)));
        assert_eq!(*handler.seen.lock().unwrap(), [0x0F, 0xF0]);
        assert_eq!(
            target.link().port().written(),
            &[handshake_token(ECHO), 0xF0, 0x0F]
        );
        assert_eq!(registry.status(ECHO), Some(TransactionStatus::Accepted));
    }

    #[test]
    fn test_out_of_range_id_is_desync() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new();
        port.queue(&[3, 0xAA, 0xBB]);
        let mut target = target(port);

        assert_eq!(block_on(target.poll(&mut registry)), Err(TargetError::Desync(3)));
        assert!(target.link().port().written().is_empty());
        // The rest of the garbage went with the reset
        assert_eq!(target.link().port().pending(), 0);
        assert_eq!(target.link().port().clears, 1);
    }

    #[test]
    fn test_unregistered_id_is_not_answered() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new();
        port.queue(&[UNUSED]);
        let mut target = target(port);

        assert_eq!(
            block_on(target.poll(&mut registry)),
            Err(TargetError::Unregistered(UNUSED))
        );
        assert!(target.link().port().written().is_empty());
    }

    #[test]
    fn test_short_payload_is_data_error() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new();
        port.queue(&[ECHO, 0x01]);
        let mut target = target(port);

        assert_eq!(block_on(target.poll(&mut registry)), Err(TargetError::Receive(ECHO)));
        assert_eq!(registry.status(ECHO), Some(TransactionStatus::DataError));
        assert_eq!(handler.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_handshake_send_failure_is_data_error() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new().with_write_capacity(0);
        port.queue(&[PING]);
        let mut target = target(port);

        assert_eq!(block_on(target.poll(&mut registry)), Err(TargetError::Handshake(PING)));
        assert_eq!(registry.status(PING), Some(TransactionStatus::DataError));
    }

    #[test]
    fn test_reply_send_failure_is_data_error() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new().with_write_capacity(2);
        port.queue(&[ECHO, 1, 2]);
        let mut target = target(port);

        assert_eq!(block_on(target.poll(&mut registry)), Err(TargetError::Send(ECHO)));
        assert_eq!(registry.status(ECHO), Some(TransactionStatus::DataError));
        // The handler ran before the failed send
        assert_eq!(handler.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_recovers_after_failure() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new();
        port.queue(&[0xFF, PING]);
        let mut target = target(port);

        // The stray PING is part of the aborted exchange and is dropped
        assert_eq!(block_on(target.poll(&mut registry)), Err(TargetError::Desync(0xFF)));
        assert_eq!(block_on(target.poll(&mut registry)), Ok(TargetEvent::Idle));

        target.link_mut().port_mut().queue(&[PING]);
        assert_eq!(block_on(target.poll(&mut registry)), Ok(TargetEvent::Served(PING)));
    }

    #[test]
    fn test_half_duplex_reply() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut port = ScriptedPort::new().with_echo();
        port.queue(&[ECHO, 0x00, 0xFF]);
        let mut target = Target::new(port, &LinkConfig::default());

        // The ID is read before anything is written, so echoes only ever
        // precede bytes still to come from the initiator
        assert_eq!(block_on(target.poll(&mut registry)), Ok(TargetEvent::Served(ECHO)));
        assert_eq!(
            target.link().port().written(),
            &[handshake_token(ECHO), 0xFF, 0x00]
        );
    }

    #[test]
    fn test_port_fault_while_idle() {
        let handler = Invert::default();
        let mut registry = registry(&handler);
        let mut target = target(ScriptedPort::new().with_fault());

        assert_eq!(block_on(target.poll(&mut registry)), Err(TargetError::Port));
    }

    /// Answers with a function of its input, remembering what it saw
    #[derive(Default)]
    struct Scramble {
        seen: Mutex<Vec<u8>>,
    }

    impl TransactionHandler for Scramble {
        fn handle(&self, input: &[u8], output: &mut [u8]) {
            self.seen.lock().unwrap().extend_from_slice(input);
            for (i, out) in output.iter_mut().enumerate() {
                *out = scrambled(input, i);
            }
        }
    }

    fn scrambled(input: &[u8], i: usize) -> u8 {
        input.get(i).copied().unwrap_or(0xA5) ^ i as u8
    }

    fn port(duplex: Duplex) -> ScriptedPort {
        match duplex {
            Duplex::Half => ScriptedPort::new().with_echo(),
            Duplex::Full => ScriptedPort::new(),
        }
    }

    proptest! {
        /// What the target writes is fed to an initiator, so both engines
        /// see the same bytes a real wire would carry
        #[test]
        fn prop_payloads_cross_both_engines(
            payload in proptest::collection::vec(any::<u8>(), 0..=8),
            reply_len in 0usize..=8,
            half in any::<bool>(),
        ) {
            let duplex = if half { Duplex::Half } else { Duplex::Full };
            let config = LinkConfig::default().with_duplex(duplex);

            let handler = Scramble::default();
            let mut far = Registry::<1, 16>::new();
            far.register_with_handler(0, payload.len(), reply_len, &handler).unwrap();
            let mut near = Registry::<1, 16>::new();
            near.register(0, payload.len(), reply_len).unwrap();
            near.initiator_buffer_mut(0).unwrap().copy_from_slice(&payload);

            let mut request = vec![0u8];
            request.extend_from_slice(&payload);

            let mut far_port = port(duplex);
            far_port.queue(&request);
            let mut target = Target::new(far_port, &config);
            prop_assert_eq!(block_on(target.poll(&mut far)), Ok(TargetEvent::Served(0)));
            prop_assert_eq!(&*handler.seen.lock().unwrap(), &payload);

            let clock = ManualClock::new(0);
            let mut near_port = port(duplex);
            near_port.queue(target.link().port().written());
            let mut init = Initiator::new(near_port, &clock, &config);
            prop_assert_eq!(block_on(init.transaction(&mut near, 0)), Ok(()));
            prop_assert_eq!(init.link().port().written(), &request[..]);

            let reply: Vec<u8> = (0..reply_len).map(|i| scrambled(&payload, i)).collect();
            prop_assert_eq!(near.target_buffer(0), Some(&reply[..]));
            prop_assert_eq!(far.status(0), Some(TransactionStatus::Accepted));
        }
    }
}
