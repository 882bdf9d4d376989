//! Initiator engine
//!
//! Runs on the half that starts transactions, in the caller's task. One
//! call to [`Initiator::transaction`] walks
//!
//! ```text
//! Idle → SendingId → AwaitingHandshake → [SendingPayload] → [ReceivingPayload] → Done
//! ```
//!
//! and collapses to `Failed` from any phase. Every phase is bounded by the
//! link timeout, so a call is pending for at most four timeouts.
//!
//! While no peer has answered, handshake attempts are spaced at least one
//! connection check interval apart; attempts in between fail immediately
//! without touching the wire. A disconnected or still-booting other half
//! then costs almost nothing per scan.

use splitlink_hal::{Clock, Duplex, SerialPort};
use splitlink_protocol::{is_handshake_reply, TransactionCode, TransactionId};

use crate::config::LinkConfig;
use crate::link::Link;
use crate::registry::{Registry, RegistryError, TransactionDescriptor};

/// Initiator transaction phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No transaction attempted yet
    Idle,
    /// Writing the ID byte
    SendingId,
    /// Waiting for `ID ^ HANDSHAKE_MAGIC`
    AwaitingHandshake,
    /// Writing the initiator→target payload
    SendingPayload,
    /// Reading the target→initiator payload
    ReceivingPayload,
    /// Last transaction completed
    Done,
    /// Last transaction failed
    Failed,
}

/// Initiator-side transaction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionError {
    /// ID is outside the transaction table
    InvalidId(TransactionId),
    /// ID is valid but was never registered
    NotRegistered(TransactionId),
    /// The ID byte could not be written on a full-duplex line
    LinkFault,
    /// Skipped: disconnected and the connection check interval has not elapsed
    Throttled,
    /// The peer did not answer correctly during the given phase
    NoResponse(Phase),
    /// RPC data does not fit the registered buffer
    PayloadTooLarge { len: usize, capacity: usize },
    /// A typed payload could not be encoded or decoded
    Encoding,
}

impl TransactionError {
    /// Outcome code reported to callers
    pub fn code(&self) -> TransactionCode {
        match self {
            TransactionError::Throttled | TransactionError::NoResponse(_) => {
                TransactionCode::NoResponse
            }
            TransactionError::InvalidId(_)
            | TransactionError::NotRegistered(_)
            | TransactionError::LinkFault
            | TransactionError::PayloadTooLarge { .. }
            | TransactionError::Encoding => TransactionCode::TypeError,
        }
    }

    /// Check if the next scheduled attempt may succeed without changes
    pub fn is_transient(&self) -> bool {
        self.code().is_transient()
    }

    /// Check if the failed attempt put bytes on the wire
    fn touched_wire(&self) -> bool {
        matches!(
            self,
            TransactionError::LinkFault | TransactionError::NoResponse(_)
        )
    }
}

/// Attempt counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Transactions that reached `Done`
    pub completed: u32,
    /// Transactions that failed (throttled attempts excluded)
    pub failed: u32,
    /// Attempts skipped by the connection throttle
    pub throttled: u32,
}

/// Transaction initiator bound to one link
pub struct Initiator<P, C> {
    link: Link<P>,
    clock: C,
    connection_check_timeout_ms: u32,
    connected: bool,
    last_probe_ms: Option<u32>,
    phase: Phase,
    stats: LinkStats,
}

impl<P: SerialPort, C: Clock> Initiator<P, C> {
    /// Create an initiator on an initialized port
    pub fn new(port: P, clock: C, config: &LinkConfig) -> Self {
        Self {
            link: Link::new(port, config),
            clock,
            connection_check_timeout_ms: config.connection_check_timeout_ms,
            connected: false,
            last_probe_ms: None,
            phase: Phase::Idle,
            stats: LinkStats::default(),
        }
    }

    /// Check if the last handshake succeeded
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Phase reached by the last transaction
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn link(&self) -> &Link<P> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<P> {
        &mut self.link
    }

    /// Run transaction `id` against the target
    ///
    /// The initiator→target buffer is sent as it is in `registry`; on
    /// success the target→initiator buffer holds the reply. After any
    /// failure that reached the wire, buffered input is dropped so the next
    /// attempt starts clean.
    pub async fn transaction<const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
        id: TransactionId,
    ) -> Result<(), TransactionError> {
        let result = self.initiate(registry, id).await;

        match &result {
            Ok(()) => {
                self.enter(Phase::Done);
                self.stats.completed = self.stats.completed.wrapping_add(1);
            }
            Err(e) => {
                self.enter(Phase::Failed);
                if *e == TransactionError::Throttled {
                    self.stats.throttled = self.stats.throttled.wrapping_add(1);
                } else {
                    self.stats.failed = self.stats.failed.wrapping_add(1);
                }
                if e.touched_wire() {
                    self.link.reset().await;
                }
            }
        }

        result
    }

    async fn initiate<const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
        id: TransactionId,
    ) -> Result<(), TransactionError> {
        let desc = match registry.resolve(id) {
            Ok(desc) => desc,
            Err(RegistryError::InvalidId(_)) => {
                warn!("Illegal transaction id {}", id);
                return Err(TransactionError::InvalidId(id));
            }
            Err(_) => {
                warn!("Transaction {} not registered", id);
                return Err(TransactionError::NotRegistered(id));
            }
        };

        if !self.connected {
            if let Some(last) = self.last_probe_ms {
                if self.clock.elapsed_ms(last) < self.connection_check_timeout_ms {
                    return Err(TransactionError::Throttled);
                }
            }
        }
        self.last_probe_ms = Some(self.clock.now_ms());

        self.handshake(id).await?;
        self.exchange(registry, &desc).await
    }

    async fn handshake(&mut self, id: TransactionId) -> Result<(), TransactionError> {
        self.enter(Phase::SendingId);
        if let Err(e) = self.link.send(&[id]).await {
            debug!("Send handshake failed: {:?}", e);
            self.disconnected();
            // On a shared wire a failed write is indistinguishable from a
            // missing peer
            return Err(match self.link.duplex() {
                Duplex::Full => TransactionError::LinkFault,
                Duplex::Half => TransactionError::NoResponse(Phase::SendingId),
            });
        }

        self.enter(Phase::AwaitingHandshake);
        let mut shake = [0xFFu8; 1];
        let answered = self.link.receive(&mut shake).await.is_ok();
        if !answered || !is_handshake_reply(id, shake[0]) {
            debug!("Handshake failed for transaction {}", id);
            self.disconnected();
            return Err(TransactionError::NoResponse(Phase::AwaitingHandshake));
        }

        if !self.connected {
            info!("Split link connected");
            self.connected = true;
        }
        Ok(())
    }

    async fn exchange<const N: usize, const ARENA: usize>(
        &mut self,
        registry: &mut Registry<'_, N, ARENA>,
        desc: &TransactionDescriptor<'_>,
    ) -> Result<(), TransactionError> {
        if desc.initiator_to_target_size() > 0 {
            self.enter(Phase::SendingPayload);
            if let Err(e) = self.link.send(registry.initiator_slice(desc)).await {
                debug!("Send failed for transaction {}: {:?}", desc.id(), e);
                return Err(TransactionError::NoResponse(Phase::SendingPayload));
            }
        }

        if desc.target_to_initiator_size() > 0 {
            self.enter(Phase::ReceivingPayload);
            if let Err(e) = self.link.receive(registry.target_slice_mut(desc)).await {
                debug!("Receive failed for transaction {}: {:?}", desc.id(), e);
                return Err(TransactionError::NoResponse(Phase::ReceivingPayload));
            }
        }

        Ok(())
    }

    fn enter(&mut self, phase: Phase) {
        trace!("Initiator phase {:?}", phase);
        self.phase = phase;
    }

    fn disconnected(&mut self) {
        if self.connected {
            warn!("Split link lost");
            self.connected = false;
        }
    }
}
