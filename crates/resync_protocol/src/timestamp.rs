//! `lastmod` timestamp text.
//!
//! Timestamps are written as `YYYY-MM-DDThh:mm:ssZ`, or with a six digit
//! fraction when they carry sub-second precision. Reading accepts the W3C
//! datetime profile: `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, and a date followed by
//! `Thh:mm`, `Thh:mm:ss` or `Thh:mm:ss.f…` with a `Z` or `±hh:mm` zone.
//! A time without a zone is read as UTC.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Formats a timestamp for a `lastmod` element.
pub fn format_lastmod(ts: &DateTime<Utc>) -> String {
    if ts.timestamp_subsec_micros() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }
}

/// Parses `lastmod` text into a UTC timestamp.
pub fn parse_lastmod(value: &str) -> ProtocolResult<DateTime<Utc>> {
    let invalid = || ProtocolError::InvalidTimestamp {
        value: value.to_string(),
    };
    let text = value.trim();

    let (date_part, time_part) = match text.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (text, None),
    };
    let date = parse_date(date_part).ok_or_else(invalid)?;

    let Some(time_part) = time_part else {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    };

    let (clock, offset_secs) = split_zone(time_part).ok_or_else(invalid)?;
    let time = parse_clock(clock).ok_or_else(invalid)?;
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(invalid)?;

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

fn digits(text: &str, len: usize) -> Option<u32> {
    if text.len() != len || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.split('-');
    let year = digits(parts.next()?, 4)?;
    let month = match parts.next() {
        Some(m) => digits(m, 2)?,
        None => 1,
    };
    let day = match parts.next() {
        Some(d) => digits(d, 2)?,
        None => 1,
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

fn split_zone(time: &str) -> Option<(&str, i32)> {
    if let Some(clock) = time.strip_suffix('Z') {
        return Some((clock, 0));
    }
    let Some(idx) = time.rfind(|c: char| c == '+' || c == '-') else {
        return Some((time, 0));
    };

    let (clock, zone) = time.split_at(idx);
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let zone = &zone[1..];
    let (hours, minutes) = match zone.split_once(':') {
        Some(parts) => parts,
        None if zone.len() == 4 => zone.split_at(2),
        None => return None,
    };
    let secs = digits(hours, 2)? * 3600 + digits(minutes, 2)? * 60;
    Some((clock, sign * i32::try_from(secs).ok()?))
}

fn parse_clock(clock: &str) -> Option<NaiveTime> {
    let mut parts = clock.split(':');
    let hour = digits(parts.next()?, 2)?;
    let minute = digits(parts.next()?, 2)?;
    let (second, nanos) = match parts.next() {
        None => (0, 0),
        Some(sec) => match sec.split_once('.') {
            Some((whole, fraction)) => (digits(whole, 2)?, fraction_nanos(fraction)?),
            None => (digits(sec, 2)?, 0),
        },
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

fn fraction_nanos(fraction: &str) -> Option<u32> {
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut padded: String = fraction.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().ok()
}
