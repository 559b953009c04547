pub mod field;
pub mod framer;
pub mod generator;
pub mod gsv;
pub mod handler;
pub mod packets;
pub mod registry;

pub use field::Field;
pub use framer::LineFramer;
pub use gsv::{GsvAssembler, GsvFlush, GsvStep, GsvTotalChange};
pub use handler::Outcome;
pub use packets::{Gga, Gll, Gsa, Gsv, Record, Rmc, SvInfo, Vtg};
pub use registry::Registry;

/// Length of the `$GPxxx` sentence formatter every line starts with.
pub const PREFIX_LEN: usize = 6;
/// Longest line the framer holds before declaring an overflow.
pub const LINE_BUFSIZE: usize = 100;
/// Room for one whole GSV group of raw fragments.
pub const GSV_BUFSIZE: usize = 300;
pub const REGISTRY_SLOTS: usize = 12;

pub type Prefix = [u8; PREFIX_LEN];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SentenceKind {
    Gll,
    Gga,
    Gsa,
    Gsv,
    Rmc,
    Vtg,
}

impl SentenceKind {
    pub const ALL: [SentenceKind; 6] = [
        SentenceKind::Gll,
        SentenceKind::Gga,
        SentenceKind::Gsa,
        SentenceKind::Gsv,
        SentenceKind::Rmc,
        SentenceKind::Vtg,
    ];

    pub fn descriptor(self) -> SentenceDescriptor {
        CATALOG[self as usize]
    }

    pub fn prefix(self) -> &'static Prefix {
        &CATALOG[self as usize].prefix
    }

    pub fn name(self) -> &'static str {
        match self {
            SentenceKind::Gll => "GLL",
            SentenceKind::Gga => "GGA",
            SentenceKind::Gsa => "GSA",
            SentenceKind::Gsv => "GSV",
            SentenceKind::Rmc => "RMC",
            SentenceKind::Vtg => "VTG",
        }
    }
}

/// Catalog entry copied into a registry slot when a kind is enabled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SentenceDescriptor {
    pub kind: SentenceKind,
    pub prefix: Prefix,
}

impl SentenceDescriptor {
    /// Byte-exact comparison of the first six bytes. Shorter lines never match.
    pub fn matches(&self, line: &[u8]) -> bool {
        line.get(..PREFIX_LEN) == Some(&self.prefix[..])
    }
}

// Indexed by `SentenceKind as usize`
static CATALOG: [SentenceDescriptor; 6] = [
    SentenceDescriptor {
        kind: SentenceKind::Gll,
        prefix: *b"$GPGLL",
    },
    SentenceDescriptor {
        kind: SentenceKind::Gga,
        prefix: *b"$GPGGA",
    },
    SentenceDescriptor {
        kind: SentenceKind::Gsa,
        prefix: *b"$GPGSA",
    },
    SentenceDescriptor {
        kind: SentenceKind::Gsv,
        prefix: *b"$GPGSV",
    },
    SentenceDescriptor {
        kind: SentenceKind::Rmc,
        prefix: *b"$GPRMC",
    },
    SentenceDescriptor {
        kind: SentenceKind::Vtg,
        prefix: *b"$GPVTG",
    },
];

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmeaError {
    #[error("no free registry slot")]
    CapacityExceeded,
    #[error("sentence kind is not enabled")]
    NotFound,
    #[error("sentence kind is already enabled")]
    AlreadyEnabled,
    #[error("byte source refused to start receiving")]
    SourceStartFailed,
    #[error("byte source refused to re-arm")]
    SourceRearmFailed,
    #[error("no `*` checksum token in line")]
    MalformedChecksumToken,
    #[error("checksum mismatch: expected {expect:#04x}, saw {saw:#04x}")]
    BadChecksum { expect: u8, saw: u16 },
    #[error("line exceeded the receive buffer")]
    LineOverflow,
    #[error("GSV group exceeded the accumulation buffer")]
    GroupOverflow,
    #[error("GSV fragment declares {saw} fragments, group expects {expect}")]
    GroupTotalChanged { expect: u8, saw: u8 },
}

/// One decoded record, handed to the [`SentenceSink`].
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sentence {
    Gll(Gll),
    Gga(Gga),
    Gsa(Gsa),
    Gsv(Gsv),
    Rmc(Rmc),
    Vtg(Vtg),
}

impl Sentence {
    pub fn kind(&self) -> SentenceKind {
        match self {
            Sentence::Gll(_) => SentenceKind::Gll,
            Sentence::Gga(_) => SentenceKind::Gga,
            Sentence::Gsa(_) => SentenceKind::Gsa,
            Sentence::Gsv(_) => SentenceKind::Gsv,
            Sentence::Rmc(_) => SentenceKind::Rmc,
            Sentence::Vtg(_) => SentenceKind::Vtg,
        }
    }

    pub fn checksum(&self) -> u16 {
        match self {
            Sentence::Gll(r) => r.cs,
            Sentence::Gga(r) => r.cs,
            Sentence::Gsa(r) => r.cs,
            Sentence::Gsv(r) => r.cs,
            Sentence::Rmc(r) => r.cs,
            Sentence::Vtg(r) => r.cs,
        }
    }
}

/// Receives every decoded record. Called from the byte-received context, so
/// implementations must not block.
pub trait SentenceSink {
    fn handle(&mut self, sentence: &Sentence);
}

impl<F> SentenceSink for F
where
    F: FnMut(&Sentence),
{
    fn handle(&mut self, sentence: &Sentence) {
        self(sentence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_indexed_by_kind() {
        for kind in SentenceKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
            assert_eq!(&kind.prefix()[3..], kind.name().as_bytes());
        }
    }

    #[test]
    fn prefix_match_is_exact_and_bounded() {
        let gga = SentenceKind::Gga.descriptor();
        assert!(gga.matches(b"$GPGGA,123519"));
        assert!(gga.matches(b"$GPGGA"));
        assert!(!gga.matches(b"$GPGG"));
        assert!(!gga.matches(b"$gpgga,1"));
        assert!(!gga.matches(b"$GNGGA,1"));
        assert!(!gga.matches(b""));
    }
}
