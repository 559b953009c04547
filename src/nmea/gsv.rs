//! Reassembly of multi-line GSV groups.
//!
//! Satellites-in-view data spans several lines. Each fragment is kept raw
//! until the group is complete, then every fragment is parsed on its own.

use tinyvec::ArrayVec;

use super::{field::int_at, NmeaError, GSV_BUFSIZE};

/// Byte offset of the "total fragments" digit in `$GPGSV,t,n,...`
const TOTAL_OFFSET: usize = 7;

/// When a complete group gets handed over for parsing.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GsvFlush {
    /// On the fragment that brings the count up to the declared total.
    #[default]
    OnCompletion,
    /// When the next GSV line shows up after the group filled. That line is
    /// dropped, not counted towards the next group.
    OnNextFragment,
}

/// What to do with a fragment whose declared total disagrees with the group
/// being accumulated.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GsvTotalChange {
    /// Throw the partial group away and start over with this fragment.
    #[default]
    Restart,
    /// Drop this fragment and keep waiting for the rest of the group.
    Reject,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GsvStep {
    /// Stored, group still incomplete.
    Buffered,
    /// Group is ready; parse [`GsvAssembler::fragments`] then [`GsvAssembler::reset`].
    Complete,
    /// Fragment not stored.
    Rejected(NmeaError),
}

#[derive(Debug, Clone)]
pub struct GsvAssembler<const N: usize = GSV_BUFSIZE> {
    buf: ArrayVec<[u8; N]>,
    count: u8,
    total: u8,
    flush: GsvFlush,
    total_change: GsvTotalChange,
}

impl<const N: usize> GsvAssembler<N> {
    pub fn new(flush: GsvFlush, total_change: GsvTotalChange) -> Self {
        Self {
            buf: ArrayVec::new(),
            count: 0,
            total: 0,
            flush,
            total_change,
        }
    }

    /// Takes one raw GSV line, terminator included.
    pub fn push(&mut self, line: &[u8]) -> GsvStep {
        let total = int_at(line, TOTAL_OFFSET);

        if self.count > 0 && self.count < self.total && total != self.total {
            let err = NmeaError::GroupTotalChanged {
                expect: self.total,
                saw: total,
            };
            match self.total_change {
                GsvTotalChange::Restart => {
                    warn!("GSV group restarted: {}", err);
                    self.reset();
                }
                GsvTotalChange::Reject => return GsvStep::Rejected(err),
            }
        }

        match self.flush {
            GsvFlush::OnCompletion => {
                if let Err(e) = self.append(line, total) {
                    return GsvStep::Rejected(e);
                }
                if self.count >= total {
                    GsvStep::Complete
                } else {
                    GsvStep::Buffered
                }
            }
            GsvFlush::OnNextFragment => {
                if self.count < total {
                    match self.append(line, total) {
                        Ok(()) => GsvStep::Buffered,
                        Err(e) => GsvStep::Rejected(e),
                    }
                } else {
                    GsvStep::Complete
                }
            }
        }
    }

    fn append(&mut self, line: &[u8], total: u8) -> Result<(), NmeaError> {
        if self.buf.len() + line.len() > N {
            self.reset();
            return Err(NmeaError::GroupOverflow);
        }
        self.buf.extend_from_slice(line);
        self.count += 1;
        self.total = total;
        Ok(())
    }

    /// The stored lines, one per fragment, without their `\n`.
    pub fn fragments(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.buf
            .as_slice()
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.count = 0;
        self.total = 0;
    }

    /// Fragments stored so far.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Total declared by the group being accumulated, zero when idle.
    pub fn total(&self) -> u8 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<const N: usize> Default for GsvAssembler<N> {
    fn default() -> Self {
        Self::new(GsvFlush::default(), GsvTotalChange::default())
    }
}
