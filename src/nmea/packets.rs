use bytemuck::Zeroable;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::{
    field::{parse_fields, Field},
    NmeaError, Sentence, SentenceKind,
};
use crate::{Abs, Position};

////////////////////////////////////////////////////////////////////////////////
// Record plumbing /////////////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

pub trait Record: Copy + Zeroable + Into<Sentence> {
    const KIND: SentenceKind;

    /// Hands `f` the record's wire layout, one [`Field`] per comma token.
    fn with_fields<T>(&mut self, f: impl FnOnce(&mut [Field<'_>]) -> T) -> T;

    fn set_checksum(&mut self, cs: u16);

    /// Runs once the fields are filled in.
    fn post_process(&mut self) {}

    /// Undoes [`Record::post_process`] so the fields read as they did on the wire.
    fn restore_wire(&mut self) {}
}

/// Parses one line into a fresh, zeroed record of type `R`.
pub fn parse<R: Record>(line: &[u8]) -> Result<R, NmeaError> {
    let mut record = R::zeroed();
    let cs = record.with_fields(|fields| parse_fields(line, fields))?;
    record.set_checksum(cs);
    record.post_process();
    Ok(record)
}

/// `dddmm.mmmm` plus hemisphere to signed decimal degrees.
pub fn to_decimal_degrees(value: f64, hemisphere: u8) -> f64 {
    // Truncation stands in for floor, the raw value is never negative
    let degrees = (value / 100.0) as i32 as f64;
    let decimal = degrees + (value - degrees * 100.0) / 60.0;
    if matches!(hemisphere, b'S' | b'W') {
        -decimal
    } else {
        decimal
    }
}

/// Signed decimal degrees back to unsigned `dddmm.mmmm`.
pub fn to_degree_minutes(decimal: f64) -> f64 {
    let value = Abs::abs(decimal);
    let degrees = value as i32 as f64;
    degrees * 100.0 + (value - degrees) * 60.0
}

fn hhmmss(time: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(time / 10000, time / 100 % 100, time % 100)
}

macro_rules! into_sentence {
    ($ty:ident, $kind:ident) => {
        impl From<$ty> for Sentence {
            fn from(r: $ty) -> Self {
                Sentence::$kind(r)
            }
        }
    };
}

////////////////////////////////////////////////////////////////////////////////
// GGA: fix data ///////////////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

#[derive(Zeroable, Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gga {
    /// UTC `hhmmss`
    pub time: u32,
    pub lat: f64,
    pub ns: u8,
    pub lon: f64,
    pub ew: u8,
    pub fix_status: u8,
    pub num_sv: u8,
    pub hdop: f32,
    /// Altitude above mean sea level
    pub msl: f32,
    pub msl_unit: u8,
    /// Geoid separation
    pub sep: f32,
    pub sep_unit: u8,
    pub diff_age: u8,
    pub diff_station: u8,
    pub cs: u16,
}

impl Record for Gga {
    const KIND: SentenceKind = SentenceKind::Gga;

    fn with_fields<T>(&mut self, f: impl FnOnce(&mut [Field<'_>]) -> T) -> T {
        f(&mut [
            Field::U32(&mut self.time),
            Field::F64(&mut self.lat),
            Field::Char(&mut self.ns),
            Field::F64(&mut self.lon),
            Field::Char(&mut self.ew),
            Field::U8(&mut self.fix_status),
            Field::U8(&mut self.num_sv),
            Field::F32(&mut self.hdop),
            Field::F32(&mut self.msl),
            Field::Char(&mut self.msl_unit),
            Field::F32(&mut self.sep),
            Field::Char(&mut self.sep_unit),
            Field::U8(&mut self.diff_age),
            Field::U8(&mut self.diff_station),
        ])
    }

    fn set_checksum(&mut self, cs: u16) {
        self.cs = cs;
    }

    fn post_process(&mut self) {
        self.lat = to_decimal_degrees(self.lat, self.ns);
        self.lon = to_decimal_degrees(self.lon, self.ew);
    }

    fn restore_wire(&mut self) {
        self.lat = to_degree_minutes(self.lat);
        self.lon = to_degree_minutes(self.lon);
    }
}
into_sentence!(Gga, Gga);

impl Gga {
    pub fn position(&self) -> Position {
        Position {
            lat: self.lat as f32,
            lon: self.lon as f32,
        }
    }

    pub fn time(&self) -> Option<NaiveTime> {
        hhmmss(self.time)
    }

    pub fn has_fix(&self) -> bool {
        self.fix_status != 0
    }
}

////////////////////////////////////////////////////////////////////////////////
// GLL: position and time //////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

#[derive(Zeroable, Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gll {
    pub lat: f64,
    pub ns: u8,
    pub lon: f64,
    pub ew: u8,
    pub time: u32,
    /// `A` valid, `V` invalid
    pub valid: u8,
    pub mode: u8,
    pub cs: u16,
}

impl Record for Gll {
    const KIND: SentenceKind = SentenceKind::Gll;

    fn with_fields<T>(&mut self, f: impl FnOnce(&mut [Field<'_>]) -> T) -> T {
        f(&mut [
            Field::F64(&mut self.lat),
            Field::Char(&mut self.ns),
            Field::F64(&mut self.lon),
            Field::Char(&mut self.ew),
            Field::U32(&mut self.time),
            Field::Char(&mut self.valid),
            Field::Char(&mut self.mode),
        ])
    }

    fn set_checksum(&mut self, cs: u16) {
        self.cs = cs;
    }

    fn post_process(&mut self) {
        self.lat = to_decimal_degrees(self.lat, self.ns);
        self.lon = to_decimal_degrees(self.lon, self.ew);
    }

    fn restore_wire(&mut self) {
        self.lat = to_degree_minutes(self.lat);
        self.lon = to_degree_minutes(self.lon);
    }
}
into_sentence!(Gll, Gll);

impl Gll {
    pub fn position(&self) -> Position {
        Position {
            lat: self.lat as f32,
            lon: self.lon as f32,
        }
    }

    pub fn time(&self) -> Option<NaiveTime> {
        hhmmss(self.time)
    }

    pub fn is_valid(&self) -> bool {
        self.valid == b'A'
    }
}

////////////////////////////////////////////////////////////////////////////////
// GSA: DOP and active satellites //////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

#[derive(Zeroable, Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gsa {
    /// `M` manual, `A` automatic 2D/3D switching
    pub mode: u8,
    /// 1 no fix, 2 2D, 3 3D
    pub fix_status: u8,
    pub sv: [u8; 12],
    pub pdop: f32,
    pub hdop: f32,
    pub vdop: f32,
    pub cs: u16,
}

impl Record for Gsa {
    const KIND: SentenceKind = SentenceKind::Gsa;

    fn with_fields<T>(&mut self, f: impl FnOnce(&mut [Field<'_>]) -> T) -> T {
        let [s0, s1, s2, s3, s4, s5, s6, s7, s8, s9, s10, s11] = &mut self.sv;
        f(&mut [
            Field::Char(&mut self.mode),
            Field::U8(&mut self.fix_status),
            Field::U8(s0),
            Field::U8(s1),
            Field::U8(s2),
            Field::U8(s3),
            Field::U8(s4),
            Field::U8(s5),
            Field::U8(s6),
            Field::U8(s7),
            Field::U8(s8),
            Field::U8(s9),
            Field::U8(s10),
            Field::U8(s11),
            Field::F32(&mut self.pdop),
            Field::F32(&mut self.hdop),
            Field::F32(&mut self.vdop),
        ])
    }

    fn set_checksum(&mut self, cs: u16) {
        self.cs = cs;
    }
}
into_sentence!(Gsa, Gsa);

impl Gsa {
    /// IDs of the satellites used in the solution.
    pub fn satellites(&self) -> impl Iterator<Item = u8> + '_ {
        self.sv.iter().copied().filter(|&sv| sv != 0)
    }
}

////////////////////////////////////////////////////////////////////////////////
// GSV: satellites in view /////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

#[derive(Zeroable, Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SvInfo {
    pub sv: u8,
    /// Degrees, 0..=90
    pub elv: u8,
    /// Degrees, 0..=359
    pub az: u16,
    /// dBHz, zero when not tracking
    pub cno: u8,
}

#[derive(Zeroable, Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gsv {
    /// Fragments in this group
    pub num_msg: u8,
    /// This fragment, counting from 1
    pub msg_no: u8,
    pub num_sv: u8,
    pub blocks: [SvInfo; 4],
    pub cs: u16,
}

impl Record for Gsv {
    const KIND: SentenceKind = SentenceKind::Gsv;

    fn with_fields<T>(&mut self, f: impl FnOnce(&mut [Field<'_>]) -> T) -> T {
        let [b0, b1, b2, b3] = &mut self.blocks;
        f(&mut [
            Field::U8(&mut self.num_msg),
            Field::U8(&mut self.msg_no),
            Field::U8(&mut self.num_sv),
            Field::U8(&mut b0.sv),
            Field::U8(&mut b0.elv),
            Field::U16(&mut b0.az),
            Field::U8(&mut b0.cno),
            Field::U8(&mut b1.sv),
            Field::U8(&mut b1.elv),
            Field::U16(&mut b1.az),
            Field::U8(&mut b1.cno),
            Field::U8(&mut b2.sv),
            Field::U8(&mut b2.elv),
            Field::U16(&mut b2.az),
            Field::U8(&mut b2.cno),
            Field::U8(&mut b3.sv),
            Field::U8(&mut b3.elv),
            Field::U16(&mut b3.az),
            Field::U8(&mut b3.cno),
        ])
    }

    fn set_checksum(&mut self, cs: u16) {
        self.cs = cs;
    }
}
into_sentence!(Gsv, Gsv);

impl Gsv {
    /// The satellite blocks this fragment actually carried.
    pub fn satellites(&self) -> impl Iterator<Item = &SvInfo> + '_ {
        self.blocks.iter().filter(|b| b.sv != 0)
    }
}

////////////////////////////////////////////////////////////////////////////////
// RMC: recommended minimum data ///////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

#[derive(Zeroable, Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rmc {
    pub time: u32,
    /// `A` valid, `V` receiver warning
    pub status: u8,
    pub lat: f64,
    pub ns: u8,
    pub lon: f64,
    pub ew: u8,
    /// Knots
    pub spd: f32,
    /// Course over ground, degrees true
    pub cog: f32,
    /// `ddmmyy`
    pub date: u32,
    /// Magnetic variation
    pub mv: f32,
    pub mv_ew: u8,
    pub mode: u8,
    pub cs: u16,
}

impl Record for Rmc {
    const KIND: SentenceKind = SentenceKind::Rmc;

    fn with_fields<T>(&mut self, f: impl FnOnce(&mut [Field<'_>]) -> T) -> T {
        f(&mut [
            Field::U32(&mut self.time),
            Field::Char(&mut self.status),
            Field::F64(&mut self.lat),
            Field::Char(&mut self.ns),
            Field::F64(&mut self.lon),
            Field::Char(&mut self.ew),
            Field::F32(&mut self.spd),
            Field::F32(&mut self.cog),
            Field::U32(&mut self.date),
            Field::F32(&mut self.mv),
            Field::Char(&mut self.mv_ew),
            Field::Char(&mut self.mode),
        ])
    }

    fn set_checksum(&mut self, cs: u16) {
        self.cs = cs;
    }

    fn post_process(&mut self) {
        self.lat = to_decimal_degrees(self.lat, self.ns);
        self.lon = to_decimal_degrees(self.lon, self.ew);
    }

    fn restore_wire(&mut self) {
        self.lat = to_degree_minutes(self.lat);
        self.lon = to_degree_minutes(self.lon);
    }
}
into_sentence!(Rmc, Rmc);

impl Rmc {
    pub fn position(&self) -> Position {
        Position {
            lat: self.lat as f32,
            lon: self.lon as f32,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == b'A'
    }

    pub fn time(&self) -> Option<NaiveTime> {
        hhmmss(self.time)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        let (day, month, year) = (self.date / 10000, self.date / 100 % 100, self.date % 100);
        NaiveDate::from_ymd_opt(2000 + year as i32, month, day)
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Some(DateTime::from_naive_utc_and_offset(
            NaiveDateTime::new(self.date()?, self.time()?),
            Utc,
        ))
    }
}

////////////////////////////////////////////////////////////////////////////////
// VTG: course and speed ///////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

#[derive(Zeroable, Default, Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vtg {
    /// Course over ground, degrees true
    pub cogt: f32,
    pub cogt_unit: u8,
    /// Course over ground, degrees magnetic (not output by the NEO-6)
    pub cogm: u8,
    pub cogm_unit: u8,
    /// Knots
    pub sog: f32,
    pub sog_unit: u8,
    pub kph: f32,
    pub kph_unit: u8,
    pub mode: u8,
    pub cs: u16,
}

impl Record for Vtg {
    const KIND: SentenceKind = SentenceKind::Vtg;

    fn with_fields<T>(&mut self, f: impl FnOnce(&mut [Field<'_>]) -> T) -> T {
        f(&mut [
            Field::F32(&mut self.cogt),
            Field::Char(&mut self.cogt_unit),
            Field::U8(&mut self.cogm),
            Field::Char(&mut self.cogm_unit),
            Field::F32(&mut self.sog),
            Field::Char(&mut self.sog_unit),
            Field::F32(&mut self.kph),
            Field::Char(&mut self.kph_unit),
            Field::Char(&mut self.mode),
        ])
    }

    fn set_checksum(&mut self, cs: u16) {
        self.cs = cs;
    }
}
into_sentence!(Vtg, Vtg);
