//! Transaction registry
//!
//! A fixed table of transaction kinds, indexed by ID. Both halves build the
//! same table at start-up; sizes are never transmitted, so the table is the
//! only agreement the halves have about payload layout.
//!
//! All payload bytes live in one arena owned by the registry. Each entry is
//! bump-allocated its initiator→target bytes followed by its
//! target→initiator bytes, so buffers never move and nothing is allocated
//! once the table is built.
//!
//! IDs are valid iff `id < N`.

use core::fmt;

use splitlink_protocol::{TransactionId, TransactionStatus};

/// Target-side processing for one transaction kind
///
/// Runs on the target after the initiator's payload has been received and
/// before the reply payload is sent. `input` holds what the initiator sent;
/// whatever is left in `output` is sent back. Both are empty slices for
/// transactions without that phase.
///
/// Handlers run on the core or thread driving the target loop, hence `Sync`.
pub trait TransactionHandler: Sync {
    fn handle(&self, input: &[u8], output: &mut [u8]);
}

impl<F> TransactionHandler for F
where
    F: Fn(&[u8], &mut [u8]) + Sync,
{
    fn handle(&self, input: &[u8], output: &mut [u8]) {
        self(input, output)
    }
}

/// Registration and lookup errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// ID is outside the table
    InvalidId(TransactionId),
    /// ID is inside the table but nothing was registered for it
    NotRegistered(TransactionId),
    /// ID was already registered
    AlreadyRegistered(TransactionId),
    /// Not enough arena space left for the buffers
    ArenaExhausted { requested: usize, available: usize },
}

/// One registered transaction kind
#[derive(Clone, Copy)]
pub struct TransactionDescriptor<'a> {
    id: TransactionId,
    /// Arena offset of the initiator→target buffer
    offset: usize,
    initiator_to_target_size: usize,
    target_to_initiator_size: usize,
    status: TransactionStatus,
    handler: Option<&'a dyn TransactionHandler>,
}

impl<'a> TransactionDescriptor<'a> {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn initiator_to_target_size(&self) -> usize {
        self.initiator_to_target_size
    }

    pub fn target_to_initiator_size(&self) -> usize {
        self.target_to_initiator_size
    }

    /// Last status written by the target engine
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn handler(&self) -> Option<&'a dyn TransactionHandler> {
        self.handler
    }

    fn initiator_range(&self) -> core::ops::Range<usize> {
        self.offset..self.offset + self.initiator_to_target_size
    }

    fn target_range(&self) -> core::ops::Range<usize> {
        let start = self.offset + self.initiator_to_target_size;
        start..start + self.target_to_initiator_size
    }
}

impl fmt::Debug for TransactionDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionDescriptor")
            .field("id", &self.id)
            .field("initiator_to_target_size", &self.initiator_to_target_size)
            .field("target_to_initiator_size", &self.target_to_initiator_size)
            .field("status", &self.status)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Table of `N` transaction kinds sharing an `ARENA`-byte payload arena
pub struct Registry<'a, const N: usize, const ARENA: usize> {
    slots: [Option<TransactionDescriptor<'a>>; N],
    arena: [u8; ARENA],
    used: usize,
}

impl<'a, const N: usize, const ARENA: usize> Default for Registry<'a, N, ARENA> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize, const ARENA: usize> Registry<'a, N, ARENA> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: [None; N],
            arena: [0; ARENA],
            used: 0,
        }
    }

    /// Register a transaction kind without a target-side handler
    pub fn register(
        &mut self,
        id: TransactionId,
        initiator_to_target_size: usize,
        target_to_initiator_size: usize,
    ) -> Result<(), RegistryError> {
        self.insert(id, initiator_to_target_size, target_to_initiator_size, None)
    }

    /// Register a transaction kind with a target-side handler
    pub fn register_with_handler(
        &mut self,
        id: TransactionId,
        initiator_to_target_size: usize,
        target_to_initiator_size: usize,
        handler: &'a dyn TransactionHandler,
    ) -> Result<(), RegistryError> {
        self.insert(
            id,
            initiator_to_target_size,
            target_to_initiator_size,
            Some(handler),
        )
    }

    /// Attach or replace the handler of an already registered transaction
    pub fn set_handler(
        &mut self,
        id: TransactionId,
        handler: &'a dyn TransactionHandler,
    ) -> Result<(), RegistryError> {
        let index = Self::index(id)?;
        let slot = self.slots[index]
            .as_mut()
            .ok_or(RegistryError::NotRegistered(id))?;
        slot.handler = Some(handler);
        Ok(())
    }

    fn insert(
        &mut self,
        id: TransactionId,
        initiator_to_target_size: usize,
        target_to_initiator_size: usize,
        handler: Option<&'a dyn TransactionHandler>,
    ) -> Result<(), RegistryError> {
        let index = Self::index(id)?;
        if self.slots[index].is_some() {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        let requested = initiator_to_target_size.saturating_add(target_to_initiator_size);
        let available = ARENA - self.used;
        if requested > available {
            return Err(RegistryError::ArenaExhausted {
                requested,
                available,
            });
        }

        self.slots[index] = Some(TransactionDescriptor {
            id,
            offset: self.used,
            initiator_to_target_size,
            target_to_initiator_size,
            status: TransactionStatus::Idle,
            handler,
        });
        self.used += requested;
        Ok(())
    }

    fn index(id: TransactionId) -> Result<usize, RegistryError> {
        let index = id as usize;
        if index >= N {
            return Err(RegistryError::InvalidId(id));
        }
        Ok(index)
    }

    /// Resolve an ID to its descriptor
    ///
    /// Distinguishes IDs outside the table from unregistered ones.
    pub fn resolve(&self, id: TransactionId) -> Result<TransactionDescriptor<'a>, RegistryError> {
        let index = Self::index(id)?;
        self.slots[index].ok_or(RegistryError::NotRegistered(id))
    }

    /// Descriptor of a registered transaction
    pub fn descriptor(&self, id: TransactionId) -> Option<&TransactionDescriptor<'a>> {
        self.slots.get(id as usize)?.as_ref()
    }

    /// Check if an ID is registered
    pub fn is_registered(&self, id: TransactionId) -> bool {
        self.descriptor(id).is_some()
    }

    /// Last target-side status of a registered transaction
    pub fn status(&self, id: TransactionId) -> Option<TransactionStatus> {
        self.descriptor(id).map(|d| d.status)
    }

    pub(crate) fn set_status(&mut self, id: TransactionId, status: TransactionStatus) {
        if let Some(Some(slot)) = self.slots.get_mut(id as usize) {
            slot.status = status;
        }
    }

    /// Initiator→target buffer of a registered transaction
    pub fn initiator_buffer(&self, id: TransactionId) -> Option<&[u8]> {
        let range = self.descriptor(id)?.initiator_range();
        Some(&self.arena[range])
    }

    /// Initiator→target buffer, for the initiator to fill before sending
    pub fn initiator_buffer_mut(&mut self, id: TransactionId) -> Option<&mut [u8]> {
        let range = self.descriptor(id)?.initiator_range();
        Some(&mut self.arena[range])
    }

    /// Target→initiator buffer of a registered transaction
    pub fn target_buffer(&self, id: TransactionId) -> Option<&[u8]> {
        let range = self.descriptor(id)?.target_range();
        Some(&self.arena[range])
    }

    /// Target→initiator buffer, for the target to fill before replying
    pub fn target_buffer_mut(&mut self, id: TransactionId) -> Option<&mut [u8]> {
        let range = self.descriptor(id)?.target_range();
        Some(&mut self.arena[range])
    }

    pub(crate) fn initiator_slice(&self, desc: &TransactionDescriptor<'_>) -> &[u8] {
        &self.arena[desc.initiator_range()]
    }

    pub(crate) fn initiator_slice_mut(&mut self, desc: &TransactionDescriptor<'_>) -> &mut [u8] {
        &mut self.arena[desc.initiator_range()]
    }

    pub(crate) fn target_slice(&self, desc: &TransactionDescriptor<'_>) -> &[u8] {
        &self.arena[desc.target_range()]
    }

    pub(crate) fn target_slice_mut(&mut self, desc: &TransactionDescriptor<'_>) -> &mut [u8] {
        &mut self.arena[desc.target_range()]
    }

    /// Both buffers of one transaction, split for the handler call
    pub(crate) fn buffers_mut(&mut self, desc: &TransactionDescriptor<'_>) -> (&[u8], &mut [u8]) {
        let start = desc.offset;
        let end = start + desc.initiator_to_target_size + desc.target_to_initiator_size;
        let (input, output) = self.arena[start..end].split_at_mut(desc.initiator_to_target_size);
        (input, output)
    }

    /// Arena bytes handed out so far
    pub fn arena_used(&self) -> usize {
        self.used
    }
}
