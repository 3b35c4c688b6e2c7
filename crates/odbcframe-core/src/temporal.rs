use crate::error::OdbcFrameError;
use bytes::{Buf, BufMut};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of `SQL_TIMESTAMP_STRUCT`.
pub const TIMESTAMP_STRUCT_LEN: usize = 16;
/// Width of `SQL_DATE_STRUCT`, the size a date column is described with.
/// Date values still travel as a timestamp struct.
pub const DATE_STRUCT_LEN: usize = 6;
/// Width of `SQL_TIME_STRUCT`. It has no fraction field, so time values
/// travel as a timestamp struct too.
pub const TIME_STRUCT_LEN: usize = 6;

/// Naive civil time. Absent date or time fields are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: i16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub fraction_nanos: u32,
}

impl Timestamp {
    pub const fn new(
        year: i16,
        month: u16,
        day: u16,
        hour: u16,
        minute: u16,
        second: u16,
        fraction_nanos: u32,
    ) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            fraction_nanos,
        }
    }

    pub const fn date(year: i16, month: u16, day: u16) -> Self {
        Self::new(year, month, day, 0, 0, 0, 0)
    }

    pub const fn time(hour: u16, minute: u16, second: u16, fraction_nanos: u32) -> Self {
        Self::new(0, 0, 0, hour, minute, second, fraction_nanos)
    }

    pub fn date_part(self) -> Self {
        Self::date(self.year, self.month, self.day)
    }

    pub fn time_part(self) -> Self {
        Self::time(self.hour, self.minute, self.second, self.fraction_nanos)
    }

    pub fn from_naive_datetime(value: NaiveDateTime) -> Option<Self> {
        let date = Self::from_naive_date(value.date())?;
        let time = Self::from_naive_time(value.time());
        Some(Self {
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            fraction_nanos: time.fraction_nanos,
            ..date
        })
    }

    pub fn from_naive_date(value: NaiveDate) -> Option<Self> {
        let year = i16::try_from(value.year()).ok()?;
        Some(Self::date(year, value.month() as u16, value.day() as u16))
    }

    pub fn from_naive_time(value: NaiveTime) -> Self {
        Self::time(
            value.hour() as u16,
            value.minute() as u16,
            value.second() as u16,
            value.nanosecond(),
        )
    }

    /// `None` when the fields do not form a valid calendar date and clock time.
    pub fn to_naive(self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))?;
        let time = NaiveTime::from_hms_nano_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
            self.fraction_nanos,
        )?;
        Some(NaiveDateTime::new(date, time))
    }

    fn with_fraction(self, fraction_nanos: u32) -> Self {
        Self {
            fraction_nanos,
            ..self
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.fraction_nanos > 0 {
            write!(f, ".{:09}", self.fraction_nanos)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum LayoutKind {
    DateTime,
    Date,
    Time,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    kind: LayoutKind,
    fraction_digits: u32,
}

const fn layout(kind: LayoutKind, fraction_digits: u32) -> Layout {
    Layout {
        kind,
        fraction_digits,
    }
}

/// Tried in order; the first layout that matches wins.
const LAYOUTS: [Layout; 21] = [
    layout(LayoutKind::DateTime, 9),
    layout(LayoutKind::DateTime, 8),
    layout(LayoutKind::DateTime, 7),
    layout(LayoutKind::DateTime, 6),
    layout(LayoutKind::DateTime, 5),
    layout(LayoutKind::DateTime, 4),
    layout(LayoutKind::DateTime, 3),
    layout(LayoutKind::DateTime, 2),
    layout(LayoutKind::DateTime, 1),
    layout(LayoutKind::DateTime, 0),
    layout(LayoutKind::Date, 0),
    layout(LayoutKind::Time, 9),
    layout(LayoutKind::Time, 8),
    layout(LayoutKind::Time, 7),
    layout(LayoutKind::Time, 6),
    layout(LayoutKind::Time, 5),
    layout(LayoutKind::Time, 4),
    layout(LayoutKind::Time, 3),
    layout(LayoutKind::Time, 2),
    layout(LayoutKind::Time, 1),
    layout(LayoutKind::Time, 0),
];

pub fn parse(text: &str) -> Result<Timestamp, OdbcFrameError> {
    let trimmed = text.trim();
    LAYOUTS
        .iter()
        .find_map(|layout| match_layout(trimmed, *layout))
        .ok_or_else(|| OdbcFrameError::TemporalParseError {
            input: text.to_string(),
        })
}

fn match_layout(text: &str, layout: Layout) -> Option<Timestamp> {
    let (base, fraction_nanos) = split_fraction(text, layout.fraction_digits)?;
    let ts = match layout.kind {
        LayoutKind::DateTime => {
            let value = NaiveDateTime::parse_from_str(base, "%Y-%m-%d %H:%M:%S").ok()?;
            Timestamp::from_naive_datetime(value)?
        }
        LayoutKind::Date => {
            let value = NaiveDate::parse_from_str(base, "%Y-%m-%d").ok()?;
            Timestamp::from_naive_date(value)?
        }
        LayoutKind::Time => {
            let value = NaiveTime::parse_from_str(base, "%H:%M:%S").ok()?;
            Timestamp::from_naive_time(value)
        }
    };
    Some(ts.with_fraction(fraction_nanos))
}

fn split_fraction(text: &str, digits: u32) -> Option<(&str, u32)> {
    if digits == 0 {
        return Some((text, 0));
    }
    let (base, fraction) = text.rsplit_once('.')?;
    if fraction.len() != digits as usize || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = fraction.parse().ok()?;
    Some((base, value * 10u32.pow(9 - digits)))
}

/// Encodes `SQL_TIMESTAMP_STRUCT` in native byte order.
pub fn encode(ts: Timestamp) -> [u8; TIMESTAMP_STRUCT_LEN] {
    let mut out = [0u8; TIMESTAMP_STRUCT_LEN];
    let mut buf = &mut out[..];
    buf.put_i16_ne(ts.year);
    buf.put_u16_ne(ts.month);
    buf.put_u16_ne(ts.day);
    buf.put_u16_ne(ts.hour);
    buf.put_u16_ne(ts.minute);
    buf.put_u16_ne(ts.second);
    buf.put_u32_ne(ts.fraction_nanos);
    out
}

pub fn decode(bytes: &[u8]) -> Option<Timestamp> {
    if bytes.len() < TIMESTAMP_STRUCT_LEN {
        return None;
    }
    let mut buf = bytes;
    Some(Timestamp {
        year: buf.get_i16_ne(),
        month: buf.get_u16_ne(),
        day: buf.get_u16_ne(),
        hour: buf.get_u16_ne(),
        minute: buf.get_u16_ne(),
        second: buf.get_u16_ne(),
        fraction_nanos: buf.get_u32_ne(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timestamp_with_micros() {
        let ts = parse("2018-03-03 15:04:05.123456").expect("parse");
        assert_eq!(ts, Timestamp::new(2018, 3, 3, 15, 4, 5, 123_456_000));
    }

    #[test]
    fn parses_bare_date() {
        let ts = parse("2006-01-02").expect("parse");
        assert_eq!(ts, Timestamp::new(2006, 1, 2, 0, 0, 0, 0));
    }

    #[test]
    fn parses_bare_time_with_fraction() {
        assert_eq!(parse("15:04:05.5").expect("parse"), Timestamp::time(15, 4, 5, 500_000_000));
        assert_eq!(parse("15:04:05").expect("parse"), Timestamp::time(15, 4, 5, 0));
        assert_eq!(
            parse("23:59:59.000000001").expect("parse"),
            Timestamp::time(23, 59, 59, 1)
        );
    }

    #[test]
    fn parses_full_nanosecond_timestamp() {
        let ts = parse(" 1999-12-31 23:59:59.987654321 ").expect("parse");
        assert_eq!(ts.fraction_nanos, 987_654_321);
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        for input in ["not-a-date", "2019-02-30", "2019-01-01 25:00:00", "12:00:00.1234567890", ""] {
            match parse(input) {
                Err(OdbcFrameError::TemporalParseError { input: got }) => assert_eq!(got, input),
                other => panic!("unexpected result for {input:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn timestamp_struct_layout_is_native_order() {
        let ts = Timestamp::new(2020, 2, 29, 13, 14, 15, 42);
        let bytes = encode(ts);
        assert_eq!(&bytes[0..2], &2020i16.to_ne_bytes());
        assert_eq!(&bytes[12..16], &42u32.to_ne_bytes());
        assert_eq!(decode(&bytes), Some(ts));
    }

    #[test]
    fn date_and_time_widen_into_timestamp_struct() {
        let date = parse("2020-02-29").expect("parse");
        assert_eq!(decode(&encode(date)), Some(Timestamp::date(2020, 2, 29)));
        let time = parse("13:14:15.5").expect("parse");
        let back = decode(&encode(time)).expect("decode");
        assert_eq!((back.year, back.month, back.day), (0, 0, 0));
        assert_eq!(back.fraction_nanos, 500_000_000);
        assert_eq!(decode(&[0u8; 4]), None);
    }

    #[test]
    fn naive_conversion_requires_calendar_date() {
        assert!(Timestamp::time(1, 2, 3, 0).to_naive().is_none());
        let ts = Timestamp::new(2001, 9, 9, 1, 46, 40, 0);
        let naive = ts.to_naive().expect("valid");
        assert_eq!(Timestamp::from_naive_datetime(naive), Some(ts));
    }
}
