use crate::nmea::{
    handler, GsvAssembler, GsvFlush, GsvTotalChange, LineFramer, NmeaError, Outcome, Registry,
    SentenceKind, SentenceSink, GSV_BUFSIZE, LINE_BUFSIZE, REGISTRY_SLOTS,
};

/// The receiver side of the serial link: something that delivers one byte at
/// a time and has to be asked for each next one.
pub trait ByteSource {
    type Error;

    /// Arms reception of exactly one more byte.
    fn request_next_byte(&mut self) -> Result<(), Self::Error>;

    /// Called once when the last sentence kind is disabled.
    fn stop_receiving(&mut self) {}
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Discard lines whose `*hh` token disagrees with the XOR of the body.
    pub verify_checksum: bool,
    pub gsv_flush: GsvFlush,
    pub gsv_total_change: GsvTotalChange,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    pub bytes: usize,
    pub lines: usize,
    /// Lines that matched an enabled kind
    pub dispatched: usize,
    pub unmatched: usize,
    /// Matched lines or GSV fragments that failed to parse or verify
    pub discarded: usize,
    pub overflows: usize,
    /// Records handed to the sink
    pub records: usize,
}

// Counters run for the lifetime of the device and wrap instead of trapping
fn bump(counter: &mut usize, n: usize) {
    *counter = counter.wrapping_add(n);
}

/// One GNSS receiver: registry, line framing, GSV reassembly and the sink the
/// decoded records go to.
pub struct Gps<
    S,
    K,
    const SLOTS: usize = REGISTRY_SLOTS,
    const LINE: usize = LINE_BUFSIZE,
    const GROUP: usize = GSV_BUFSIZE,
> {
    source: S,
    sink: K,
    config: Config,
    registry: Registry<SLOTS>,
    framer: LineFramer<LINE>,
    gsv: GsvAssembler<GROUP>,
    stats: Stats,
}

impl<S, K, const SLOTS: usize, const LINE: usize, const GROUP: usize> Gps<S, K, SLOTS, LINE, GROUP>
where
    S: ByteSource,
    K: SentenceSink,
{
    pub fn new(source: S, sink: K) -> Self {
        Self::with_config(source, sink, Config::default())
    }

    pub fn with_config(source: S, sink: K, config: Config) -> Self {
        Self {
            source,
            sink,
            config,
            registry: Registry::new(),
            framer: LineFramer::new(),
            gsv: GsvAssembler::new(config.gsv_flush, config.gsv_total_change),
            stats: Stats::default(),
        }
    }

    /// Starts expecting `kind`. Enabling the first kind starts the receive
    /// session on the byte source.
    pub fn enable(&mut self, kind: SentenceKind) -> Result<(), NmeaError> {
        self.registry.enable(kind, &mut self.source)
    }

    /// Stops expecting `kind`. Disabling the last kind ends the session.
    pub fn disable(&mut self, kind: SentenceKind) -> Result<(), NmeaError> {
        let result = self.registry.disable(kind, &mut self.source);
        if kind == SentenceKind::Gsv && result.is_ok() && !self.gsv.is_empty() {
            debug!("dropping partial GSV group");
            self.gsv.reset();
        }
        result
    }

    /// Entry point for the transport, once per received byte.
    ///
    /// The byte is always fully processed. The only error is
    /// [`NmeaError::SourceRearmFailed`], reported after the fact.
    pub fn on_byte_received(&mut self, b: u8) -> Result<(), NmeaError> {
        bump(&mut self.stats.bytes, 1);

        let Self {
            sink,
            config,
            registry,
            framer,
            gsv,
            stats,
            ..
        } = self;

        let fed = framer.feed(b, |line| {
            registry.find(line).map(|(slot, desc)| {
                handler::handle(desc.kind, slot, line, config.verify_checksum, gsv, sink)
            })
        });
        match fed {
            None => (),
            Some(Ok(outcome)) => {
                bump(&mut stats.lines, 1);
                match outcome {
                    None => {
                        trace!("unmatched line");
                        bump(&mut stats.unmatched, 1);
                    }
                    Some(outcome) => {
                        bump(&mut stats.dispatched, 1);
                        match outcome {
                            Outcome::Emitted(n) => bump(&mut stats.records, n),
                            Outcome::Flushed { emitted, discarded } => {
                                bump(&mut stats.records, emitted);
                                bump(&mut stats.discarded, discarded);
                            }
                            Outcome::Buffered => (),
                            Outcome::Discarded(_) => bump(&mut stats.discarded, 1),
                        }
                    }
                }
            }
            Some(Err(e)) => {
                warn!("line dropped: {}", e);
                bump(&mut stats.lines, 1);
                bump(&mut stats.overflows, 1);
            }
        }

        self.rearm()
    }

    /// Asks the source for the next byte, as long as some kind is enabled.
    pub fn rearm(&mut self) -> Result<(), NmeaError> {
        if !self.registry.is_receiving() {
            return Ok(());
        }
        self.source.request_next_byte().map_err(|_| {
            warn!("byte source did not re-arm");
            NmeaError::SourceRearmFailed
        })
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), NmeaError> {
        bytes
            .iter()
            .fold(Ok(()), |acc, &b| acc.and(self.on_byte_received(b)))
    }

    pub fn registry(&self) -> &Registry<SLOTS> {
        &self.registry
    }

    pub fn framer(&self) -> &LineFramer<LINE> {
        &self.framer
    }

    pub fn gsv(&self) -> &GsvAssembler<GROUP> {
        &self.gsv
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sentence;

    struct Idle;

    impl ByteSource for Idle {
        type Error = ();

        fn request_next_byte(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn counters_wrap_instead_of_overflowing() {
        let mut gps: Gps<_, _> = Gps::new(Idle, |_: &Sentence| ());
        gps.enable(SentenceKind::Gga).unwrap();
        gps.stats.bytes = usize::MAX;
        gps.stats.lines = usize::MAX;
        gps.stats.unmatched = usize::MAX;

        gps.feed(b"$GPVTG,,*00\r\n").unwrap();
        assert_eq!(gps.stats().bytes, 12);
        assert_eq!(gps.stats().lines, 0);
        assert_eq!(gps.stats().unmatched, 0);
    }
}
