use core::fmt::{self, Write};

use super::{field::write_fields, packets::Record, LINE_BUFSIZE};
use crate::FmtBuf;

/// Writes `record` as a complete `$GPxxx,...*hh\r\n` sentence with a freshly
/// computed checksum. Coordinates go back out in `dddmm.mmmm` form.
pub fn write_sentence<R: Record, W: Write>(w: &mut W, record: &R) -> fmt::Result {
    // Everything between `$` and `*`, which is what the checksum covers
    let mut body = FmtBuf::<LINE_BUFSIZE>::new();
    for &b in &R::KIND.prefix()[1..] {
        body.write_char(b as char)?;
    }

    let mut wire = *record;
    wire.restore_wire();
    wire.with_fields(|fields| write_fields(&mut body, fields))?;

    let cs = body.as_bytes().iter().fold(0_u8, |acc, b| acc ^ b);
    write!(w, "${}*{:02X}\r\n", body.as_str().ok_or(fmt::Error)?, cs)
}

/// [`write_sentence`] into a fresh buffer.
pub fn to_sentence<R: Record, const N: usize>(record: &R) -> Result<FmtBuf<N>, fmt::Error> {
    let mut out = FmtBuf::new();
    write_sentence(&mut out, record)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::{
        field::verify_checksum,
        packets::{parse, Gga, Gsv, Vtg},
    };

    #[test]
    fn vtg_round_trips_token_for_token() {
        let line = b"$GPVTG,77.52,T,0,M,0.004,N,0.008,K,A*36\r\n";
        let vtg: Vtg = parse(line).unwrap();
        let out = to_sentence::<_, 100>(&vtg).unwrap();
        assert_eq!(out.as_bytes(), &line[..]);
    }

    #[test]
    fn generated_sentences_carry_a_valid_checksum() {
        let gga: Gga =
            parse(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n")
                .unwrap();
        let out = to_sentence::<_, 100>(&gga).unwrap();
        assert!(out.as_bytes().starts_with(b"$GPGGA,123519,4807.038"));
        assert!(verify_checksum(out.as_bytes()).is_ok());

        let again: Gga = parse(out.as_bytes()).unwrap();
        assert!((again.lat - gga.lat).abs() < 1e-6);
        assert!((again.lon - gga.lon).abs() < 1e-6);
        assert_eq!(again.num_sv, gga.num_sv);
        assert_eq!(again.msl, gga.msl);
        assert_eq!(again.ew, b'E');
    }

    #[test]
    fn gsv_blocks_round_trip() {
        let line = b"$GPGSV,3,3,11,22,42,67,42,24,14,311,43,0,0,0,0,0,0,0,0*7B\r\n";
        let gsv: Gsv = parse(line).unwrap();
        let again: Gsv = parse(to_sentence::<_, 100>(&gsv).unwrap().as_bytes()).unwrap();
        assert_eq!(again.blocks, gsv.blocks);
        assert_eq!(again.num_sv, 11);
    }

    #[test]
    fn too_small_buffer_fails() {
        assert!(to_sentence::<_, 8>(&Vtg::default()).is_err());
    }
}
