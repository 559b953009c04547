use super::{
    field::verify_checksum,
    gsv::{GsvAssembler, GsvStep},
    packets::{self, Gga, Gll, Gsa, Gsv, Record, Rmc, Vtg},
    NmeaError, SentenceKind, SentenceSink,
};

/// What became of a line that matched a registry slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// This many records went to the sink.
    Emitted(usize),
    /// A completed GSV group went out, minus the fragments that failed to parse.
    Flushed { emitted: usize, discarded: usize },
    /// Held back as part of an unfinished GSV group.
    Buffered,
    Discarded(NmeaError),
}

/// Runs the handler for `kind` on a matched line.
pub fn handle<K, const G: usize>(
    kind: SentenceKind,
    slot: usize,
    line: &[u8],
    verify: bool,
    gsv: &mut GsvAssembler<G>,
    sink: &mut K,
) -> Outcome
where
    K: SentenceSink,
{
    trace!("slot {} matched {}", slot, kind.name());
    match kind {
        SentenceKind::Gll => emit::<Gll, K>(line, verify, sink),
        SentenceKind::Gga => emit::<Gga, K>(line, verify, sink),
        SentenceKind::Gsa => emit::<Gsa, K>(line, verify, sink),
        SentenceKind::Gsv => handle_gsv(line, verify, gsv, sink),
        SentenceKind::Rmc => emit::<Rmc, K>(line, verify, sink),
        SentenceKind::Vtg => emit::<Vtg, K>(line, verify, sink),
    }
}

fn decode<R: Record>(line: &[u8], verify: bool) -> Result<R, NmeaError> {
    if verify {
        verify_checksum(line)?;
    }
    packets::parse(line)
}

fn emit<R: Record, K: SentenceSink>(line: &[u8], verify: bool, sink: &mut K) -> Outcome {
    match decode::<R>(line, verify) {
        Ok(record) => {
            sink.handle(&record.into());
            Outcome::Emitted(1)
        }
        Err(e) => {
            warn!("{} discarded: {}", R::KIND.name(), e);
            Outcome::Discarded(e)
        }
    }
}

fn handle_gsv<K: SentenceSink, const G: usize>(
    line: &[u8],
    verify: bool,
    gsv: &mut GsvAssembler<G>,
    sink: &mut K,
) -> Outcome {
    // Corrupt fragments must not steer the grouping
    if verify {
        if let Err(e) = verify_checksum(line) {
            warn!("GSV fragment discarded: {}", e);
            return Outcome::Discarded(e);
        }
    }

    match gsv.push(line) {
        GsvStep::Buffered => {
            debug!("GSV fragment {} of {} buffered", gsv.count(), gsv.total());
            Outcome::Buffered
        }
        GsvStep::Rejected(e) => {
            warn!("GSV fragment discarded: {}", e);
            Outcome::Discarded(e)
        }
        GsvStep::Complete => {
            let (mut emitted, mut discarded) = (0, 0);
            for fragment in gsv.fragments() {
                match packets::parse::<Gsv>(fragment) {
                    Ok(record) => {
                        sink.handle(&record.into());
                        emitted += 1;
                    }
                    Err(e) => {
                        warn!("GSV fragment discarded: {}", e);
                        discarded += 1;
                    }
                }
            }
            debug!("GSV group of {} flushed", gsv.count());
            gsv.reset();
            Outcome::Flushed { emitted, discarded }
        }
    }
}
