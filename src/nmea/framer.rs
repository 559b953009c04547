use tinyvec::ArrayVec;

use super::{NmeaError, LINE_BUFSIZE};

/// Accumulates bytes until `\n`, then hands the whole line (terminator
/// included, `\r` left in place) to a callback and starts over.
#[derive(Debug, Clone)]
pub struct LineFramer<const N: usize = LINE_BUFSIZE> {
    buf: ArrayVec<[u8; N]>,
    // Set once a byte didn't fit; the rest of the line is dropped
    overflowed: bool,
}

impl<const N: usize> LineFramer<N> {
    pub fn new() -> Self {
        Self {
            buf: ArrayVec::new(),
            overflowed: false,
        }
    }

    /// Feeds one byte. Returns `None` mid-line, otherwise the outcome of the
    /// completed line. The buffer is empty again by the time this returns
    /// `Some`, whatever `on_line` did.
    pub fn feed<R>(
        &mut self,
        b: u8,
        on_line: impl FnOnce(&[u8]) -> R,
    ) -> Option<Result<R, NmeaError>> {
        if !self.overflowed && self.buf.try_push(b).is_some() {
            self.overflowed = true;
        }

        if b != b'\n' {
            return None;
        }

        let result = if self.overflowed {
            Err(NmeaError::LineOverflow)
        } else {
            Ok(on_line(self.buf.as_slice()))
        };
        self.clear();
        Some(result)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for LineFramer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all<const N: usize>(
        framer: &mut LineFramer<N>,
        bytes: &[u8],
    ) -> Vec<Result<Vec<u8>, NmeaError>> {
        bytes
            .iter()
            .filter_map(|&b| framer.feed(b, |line| line.to_vec()))
            .collect()
    }

    #[test]
    fn lines_end_at_newline_and_keep_carriage_return() {
        let mut framer = LineFramer::<100>::new();
        let out = feed_all(&mut framer, b"$GPGGA,1*00\r\n$GPVTG,2*00\r\n$GPG");
        assert_eq!(
            out,
            vec![
                Ok(b"$GPGGA,1*00\r\n".to_vec()),
                Ok(b"$GPVTG,2*00\r\n".to_vec()),
            ]
        );
        assert_eq!(framer.len(), 4);
    }

    #[test]
    fn buffer_is_empty_after_every_line() {
        let mut framer = LineFramer::<100>::new();
        for &b in b"garbage that matches nothing\n" {
            framer.feed(b, |_| ());
        }
        assert!(framer.is_empty());
    }

    #[test]
    fn overflowing_line_is_dropped_and_framing_recovers() {
        let mut framer = LineFramer::<8>::new();
        let out = feed_all(&mut framer, b"0123456789abcdef\nshort\n");
        assert_eq!(out, vec![Err(NmeaError::LineOverflow), Ok(b"short\n".to_vec())]);
        assert!(framer.is_empty());
    }

    #[test]
    fn terminator_that_does_not_fit_is_an_overflow() {
        let mut framer = LineFramer::<4>::new();
        let out = feed_all(&mut framer, b"abcd\nabc\n");
        assert_eq!(out, vec![Err(NmeaError::LineOverflow), Ok(b"abc\n".to_vec())]);
    }
}
