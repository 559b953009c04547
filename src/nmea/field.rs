//! Comma-separated field extraction.
//!
//! A record describes its layout as a list of [`Field`]s, each pairing the
//! token type with the slot it lands in, so the tag list and the output slots
//! can never disagree in count or type.

use core::{
    fmt::{self, Write},
    str::FromStr,
};

use super::NmeaError;

pub enum Field<'a> {
    F32(&'a mut f32),
    F64(&'a mut f64),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    /// The single byte right after the comma, whatever it is.
    Char(&'a mut u8),
    /// Zeroes its slot without consuming a token.
    Zeroed(&'a mut u8),
}

impl Field<'_> {
    /// `after` starts right after this field's comma and runs to the end of the line.
    fn parse(&mut self, after: &[u8]) {
        let token = token(after);
        match self {
            Field::F32(slot) => **slot = float_prefix(token),
            Field::F64(slot) => **slot = float_prefix(token),
            Field::U8(slot) => **slot = int_prefix(token) as u8,
            Field::U16(slot) => **slot = int_prefix(token) as u16,
            Field::U32(slot) => **slot = int_prefix(token) as u32,
            Field::Char(slot) => **slot = after.first().copied().unwrap_or(0),
            Field::Zeroed(slot) => **slot = 0,
        }
    }

    fn clear(&mut self) {
        match self {
            Field::F32(slot) => **slot = 0.0,
            Field::F64(slot) => **slot = 0.0,
            Field::U8(slot) | Field::Char(slot) | Field::Zeroed(slot) => **slot = 0,
            Field::U16(slot) => **slot = 0,
            Field::U32(slot) => **slot = 0,
        }
    }

    fn consumes_token(&self) -> bool {
        !matches!(self, Field::Zeroed(_))
    }

    fn write_token<W: Write>(&self, w: &mut W) -> fmt::Result {
        match self {
            Field::F32(v) => write!(w, "{}", **v),
            Field::F64(v) => write!(w, "{}", **v),
            Field::U8(v) => write!(w, "{}", **v),
            Field::U16(v) => write!(w, "{}", **v),
            Field::U32(v) => write!(w, "{}", **v),
            Field::Char(c) => match **c {
                // An empty field parses as its own delimiter
                0 | b',' | b'*' | b'\r' | b'\n' => Ok(()),
                c => w.write_char(c as char),
            },
            Field::Zeroed(_) => Ok(()),
        }
    }
}

/// Fills `fields` in order from the comma-separated tokens of `line`, then
/// returns the `*hh` checksum token.
///
/// Empty tokens, and fields past the last comma, come out as zero. A line
/// without a `*` is rejected once the fields are filled.
pub fn parse_fields(line: &[u8], fields: &mut [Field<'_>]) -> Result<u16, NmeaError> {
    let mut rest = line;
    for field in fields.iter_mut() {
        if !field.consumes_token() {
            field.clear();
            continue;
        }
        match rest.iter().position(|&b| b == b',') {
            Some(comma) => {
                rest = &rest[comma + 1..];
                field.parse(rest);
            }
            None => field.clear(),
        }
    }

    checksum_token(line)
}

/// Writes `,tok,tok,...` for every token-consuming field.
pub fn write_fields<W: Write>(w: &mut W, fields: &[Field<'_>]) -> fmt::Result {
    for field in fields.iter().filter(|f| f.consumes_token()) {
        w.write_char(',')?;
        field.write_token(w)?;
    }
    Ok(())
}

/// The hex digits after `*`, at most two of them. No digits parses as zero.
pub fn checksum_token(line: &[u8]) -> Result<u16, NmeaError> {
    let star = line
        .iter()
        .position(|&b| b == b'*')
        .ok_or(NmeaError::MalformedChecksumToken)?;

    Ok(line[star + 1..]
        .iter()
        .take(2)
        .map_while(|&b| (b as char).to_digit(16))
        .fold(0, |acc, d| acc << 4 | d as u16))
}

/// XOR of every byte between the leading `$` and the `*`.
pub fn compute_checksum(line: &[u8]) -> Result<u8, NmeaError> {
    let star = line
        .iter()
        .position(|&b| b == b'*')
        .ok_or(NmeaError::MalformedChecksumToken)?;
    let body = match line.first() {
        Some(b'$') => &line[1..star],
        _ => &line[..star],
    };
    Ok(body.iter().fold(0, |acc, b| acc ^ b))
}

/// Compares the checksum token against the computed one.
pub fn verify_checksum(line: &[u8]) -> Result<u16, NmeaError> {
    let saw = checksum_token(line)?;
    let expect = compute_checksum(line)?;
    if saw == expect as u16 {
        Ok(saw)
    } else {
        Err(NmeaError::BadChecksum { expect, saw })
    }
}

/// Reads a small integer straight out of the raw line at a byte offset.
pub fn int_at(line: &[u8], offset: usize) -> u8 {
    line.get(offset..).map(int_prefix).unwrap_or(0) as u8
}

fn token(after: &[u8]) -> &[u8] {
    let end = after
        .iter()
        .position(|b| matches!(b, b',' | b'*' | b'\r' | b'\n'))
        .unwrap_or(after.len());
    &after[..end]
}

// Leading decimal digits with an optional sign, wrapping like `strtol` into a narrower slot
fn int_prefix(token: &[u8]) -> i64 {
    let (negative, digits) = match token.first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let value = digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0_i64, |acc, b| {
            acc.wrapping_mul(10).wrapping_add((b - b'0') as i64)
        });
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

// Longest prefix that parses as a number, zero if none does
fn float_prefix<T: FromStr + Default>(token: &[u8]) -> T {
    let len = token
        .iter()
        .take_while(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E'))
        .count();
    (1..=len)
        .rev()
        .find_map(|n| core::str::from_utf8(&token[..n]).ok()?.parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FmtBuf;

    #[test]
    fn typed_fields_fill_in_order() {
        let line = b"$GPVTG,77.52,T,,M,0.004,N,0.008,K,A*06\r\n";
        let (mut cogt, mut t, mut cogm, mut m) = (0.0_f32, 0, 0, 0);
        let (mut sog, mut n, mut kph, mut k, mut mode) = (0.0_f32, 0, 0.0_f32, 0, 0);
        let cs = parse_fields(
            line,
            &mut [
                Field::F32(&mut cogt),
                Field::Char(&mut t),
                Field::U8(&mut cogm),
                Field::Char(&mut m),
                Field::F32(&mut sog),
                Field::Char(&mut n),
                Field::F32(&mut kph),
                Field::Char(&mut k),
                Field::Char(&mut mode),
            ],
        )
        .unwrap();

        assert_eq!(cogt, 77.52);
        assert_eq!(t, b'T');
        assert_eq!(cogm, 0);
        assert_eq!(m, b'M');
        assert_eq!(sog, 0.004);
        assert_eq!(n, b'N');
        assert_eq!(kph, 0.008);
        assert_eq!(k, b'K');
        assert_eq!(mode, b'A');
        assert_eq!(cs, 0x06);
    }

    #[test]
    fn integers_stop_at_the_first_non_digit() {
        let mut time = 0_u32;
        let mut sats = 0_u8;
        parse_fields(
            b"$GPGGA,123519.00,08*47",
            &mut [Field::U32(&mut time), Field::U8(&mut sats)],
        )
        .unwrap();
        assert_eq!(time, 123519);
        assert_eq!(sats, 8);
    }

    #[test]
    fn integers_wrap_into_narrow_slots() {
        let mut az = 0_u8;
        parse_fields(b"$GPGSV,359*00", &mut [Field::U8(&mut az)]).unwrap();
        assert_eq!(az, (359_u32 & 0xff) as u8);
    }

    #[test]
    fn empty_and_missing_tokens_are_zero() {
        let mut hdop = 9.0_f32;
        let mut age = 9_u8;
        let mut station = 9_u16;
        parse_fields(
            b"$GPGGA,,*5A",
            &mut [Field::F32(&mut hdop), Field::U8(&mut age), Field::U16(&mut station)],
        )
        .unwrap();
        assert_eq!(hdop, 0.0);
        assert_eq!(age, 0);
        assert_eq!(station, 0);
    }

    #[test]
    fn empty_char_field_takes_the_next_delimiter() {
        let mut c = 0;
        parse_fields(b"$GPGLL,,A*00", &mut [Field::Char(&mut c)]).unwrap();
        assert_eq!(c, b',');
    }

    #[test]
    fn zeroed_field_consumes_no_token() {
        let mut pad = 7;
        let mut n = 0_u8;
        parse_fields(
            b"$GPXXX,5*00",
            &mut [Field::Zeroed(&mut pad), Field::U8(&mut n)],
        )
        .unwrap();
        assert_eq!(pad, 0);
        assert_eq!(n, 5);
    }

    #[test]
    fn checksum_token_is_two_hex_digits() {
        assert_eq!(checksum_token(b"$GPGGA,1*4F\r\n"), Ok(0x4f));
        assert_eq!(checksum_token(b"$GPGGA,1*a"), Ok(0xa));
        assert_eq!(checksum_token(b"$GPGGA,1*"), Ok(0));
        assert_eq!(checksum_token(b"$GPGGA,1*4F4F"), Ok(0x4f));
    }

    #[test]
    fn missing_star_is_an_error_not_a_read_past_the_line() {
        let mut n = 0_u8;
        let line = b"$GPGGA,12\r\n";
        assert_eq!(
            parse_fields(line, &mut [Field::U8(&mut n)]),
            Err(NmeaError::MalformedChecksumToken)
        );
        assert_eq!(n, 12);
        assert_eq!(compute_checksum(line), Err(NmeaError::MalformedChecksumToken));
    }

    #[test]
    fn computed_checksum_matches_receiver_output() {
        let line = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
        assert_eq!(compute_checksum(line), Ok(0x47));
        assert_eq!(verify_checksum(line), Ok(0x47));

        let bad = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48\r\n";
        assert_eq!(
            verify_checksum(bad),
            Err(NmeaError::BadChecksum {
                expect: 0x47,
                saw: 0x48
            })
        );
    }

    #[test]
    fn int_at_reads_fixed_offsets() {
        assert_eq!(int_at(b"$GPGSV,3,1,11", 7), 3);
        assert_eq!(int_at(b"$GPGSV,", 7), 0);
        assert_eq!(int_at(b"$GP", 7), 0);
    }

    #[test]
    fn written_tokens_skip_empty_chars() {
        let (mut a, mut c, mut z) = (12.5_f32, b',', 0_u8);
        let mut out = FmtBuf::<32>::new();
        write_fields(
            &mut out,
            &[Field::F32(&mut a), Field::Char(&mut c), Field::Zeroed(&mut z)],
        )
        .unwrap();
        assert_eq!(out.as_str(), Some(",12.5,"));
    }
}
