use super::{NmeaError, SentenceDescriptor, SentenceKind, REGISTRY_SLOTS};
use crate::gps::ByteSource;

/// Fixed table of the sentence kinds the user asked for, in the order they
/// were enabled, plus the receive session they keep alive.
#[derive(Debug, Clone)]
pub struct Registry<const N: usize = REGISTRY_SLOTS> {
    slots: [Option<SentenceDescriptor>; N],
    enabled: usize,
    receiving: bool,
}

impl<const N: usize> Registry<N> {
    pub fn new() -> Self {
        Self {
            slots: [None; N],
            enabled: 0,
            receiving: false,
        }
    }

    /// Stores `kind` in the first free slot. The first kind enabled starts the
    /// receive session; if the source refuses, the slot stays filled and the
    /// session stays marked as receiving, but the call reports
    /// [`NmeaError::SourceStartFailed`].
    pub fn enable<S: ByteSource>(
        &mut self,
        kind: SentenceKind,
        source: &mut S,
    ) -> Result<(), NmeaError> {
        if self.position(kind).is_some() {
            return Err(NmeaError::AlreadyEnabled);
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(NmeaError::CapacityExceeded)?;

        *slot = Some(kind.descriptor());
        self.enabled += 1;
        info!("enabled {}, {} kinds expected", kind.name(), self.enabled);

        if !self.receiving {
            self.receiving = true;
            debug!("starting receive session");
            source
                .request_next_byte()
                .map_err(|_| NmeaError::SourceStartFailed)?;
        }
        Ok(())
    }

    /// Clears the slot holding `kind`. Removing the last kind ends the
    /// receive session.
    pub fn disable<S: ByteSource>(
        &mut self,
        kind: SentenceKind,
        source: &mut S,
    ) -> Result<(), NmeaError> {
        let index = self.position(kind).ok_or(NmeaError::NotFound)?;
        self.slots[index] = None;
        self.enabled -= 1;
        info!("disabled {}, {} kinds expected", kind.name(), self.enabled);

        if self.enabled == 0 && self.receiving {
            self.receiving = false;
            debug!("stopping receive session");
            source.stop_receiving();
        }
        Ok(())
    }

    /// First slot whose prefix starts `line`. Stops after looking at as many
    /// filled slots as are enabled.
    pub fn find(&self, line: &[u8]) -> Option<(usize, SentenceDescriptor)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|desc| (i, desc)))
            .take(self.enabled)
            .find(|(_, desc)| desc.matches(line))
    }

    pub fn position(&self, kind: SentenceKind) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_some_and(|desc| desc.kind == kind))
    }

    pub fn is_enabled(&self, kind: SentenceKind) -> bool {
        self.position(kind).is_some()
    }

    pub fn slot(&self, index: usize) -> Option<&SentenceDescriptor> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    pub fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}
