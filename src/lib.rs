#![cfg_attr(not(test), no_std)]

use core::fmt::{self, Write};
use tinyvec::ArrayVec; // memory layout

#[macro_use]
mod logging;

pub mod gps;
pub mod nmea;

pub use gps::{ByteSource, Config, Gps, Stats};
pub use nmea::{NmeaError, Sentence, SentenceKind, SentenceSink};

pub struct FmtBuf<const N: usize = 256>(pub ArrayVec<[u8; N]>);

impl<const N: usize> Write for FmtBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            // Report truncation so `write!` callers can tell a sentence didn't fit
            if self.0.try_push(b).is_some() {
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}

impl<const N: usize> FmtBuf<N> {
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.0.as_slice()).ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn new() -> Self {
        Self(Default::default())
    }
}

impl<const N: usize> Default for FmtBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

// This isn't in core for some reason, so do this to avoid pulling in a dependency
pub trait Abs {
    fn abs(self) -> Self;
}

impl Abs for f32 {
    fn abs(self) -> Self {
        f32::from_bits(self.to_bits() & 0x7fff_ffff)
    }
}

impl Abs for f64 {
    fn abs(self) -> Self {
        f64::from_bits(self.to_bits() & 0x7fff_ffff_ffff_ffff)
    }
}

/// Decimal degrees, south and west negative.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position {
    pub lat: f32,
    pub lon: f32,
}
