//! Parsers for single-token argument values.
//!
//! Each parser returns `None` on malformed input; the calling element turns
//! that into a positioned error naming the offending token.

use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use super::value::Color;

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Words accepted by the `bool` element.
pub const BOOLEAN_CHOICES: [(&str, bool); 12] = [
    ("true", true),
    ("t", true),
    ("y", true),
    ("yes", true),
    ("verymuchso", true),
    ("1", true),
    ("false", false),
    ("f", false),
    ("n", false),
    ("no", false),
    ("notatall", false),
    ("0", false),
];

const NAMED_COLORS: [(&str, u32); 16] = [
    ("black", 0x00_0000),
    ("white", 0xff_ffff),
    ("red", 0xff_0000),
    ("green", 0x00_8000),
    ("lime", 0x00_ff00),
    ("blue", 0x00_00ff),
    ("yellow", 0xff_ff00),
    ("cyan", 0x00_ffff),
    ("magenta", 0xff_00ff),
    ("gray", 0x80_8080),
    ("grey", 0x80_8080),
    ("orange", 0xff_a500),
    ("purple", 0x80_0080),
    ("pink", 0xff_c0cb),
    ("brown", 0xa5_2a2a),
    ("navy", 0x00_0080),
];

/// Splits a `0x`/`0b` radix prefix off a number.
fn split_radix(input: &str) -> (&str, u32) {
    if let Some(hex) = input.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = input.strip_prefix("0b") {
        (bin, 2)
    } else {
        (input, 10)
    }
}

pub fn parse_int(input: &str) -> Option<i32> {
    let (digits, radix) = split_radix(input);
    i32::from_str_radix(digits, radix).ok()
}

pub fn parse_long(input: &str) -> Option<i64> {
    let (digits, radix) = split_radix(input);
    i64::from_str_radix(digits, radix).ok()
}

pub fn parse_double(input: &str) -> Option<f64> {
    input.parse().ok()
}

pub fn parse_bool(input: &str) -> Option<bool> {
    BOOLEAN_CHOICES.iter().find(|(word, _)| *word == input).map(|&(_, value)| value)
}

/// Parses a duration, accepting ISO-8601 (`PT10S`, `P1DT2H`) as well as the
/// shorthand forms `5m`, `1h30m` and `2d`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let mut text = input.to_uppercase();
    if !text.contains('T') {
        if text.contains('D') {
            if text.contains('H') || text.contains('M') || text.contains('S') {
                text = text.replacen('D', "DT", 1);
            }
        } else if let Some(rest) = text.strip_prefix('P') {
            text = format!("PT{rest}");
        } else {
            text = format!("T{text}");
        }
    }
    if !text.starts_with('P') {
        text = format!("P{text}");
    }
    parse_iso_duration(&text)
}

fn parse_iso_duration(text: &str) -> Option<Duration> {
    let body = text.strip_prefix('P')?;
    let (date, time) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut total = Duration::ZERO;
    let mut any = false;

    if !date.is_empty() {
        let days: u64 = date.strip_suffix('D')?.parse().ok()?;
        total = total.checked_add(Duration::from_secs(days.checked_mul(SECONDS_PER_DAY)?))?;
        any = true;
    }

    if let Some(mut rest) = time {
        if rest.is_empty() {
            return None;
        }
        // units must appear in H, M, S order, each at most once
        let mut last_rank = 0;
        while !rest.is_empty() {
            let unit_at = rest.find(|c: char| c.is_ascii_alphabetic())?;
            let (number, tail) = rest.split_at(unit_at);
            let unit = tail.chars().next()?;
            rest = &tail[unit.len_utf8()..];
            if number.is_empty() {
                return None;
            }

            let (rank, scale) = match unit {
                'H' => (1, SECONDS_PER_HOUR),
                'M' => (2, SECONDS_PER_MINUTE),
                'S' => (3, 1),
                _ => return None,
            };
            if rank <= last_rank {
                return None;
            }
            last_rank = rank;

            let part = if unit == 'S' {
                if !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
                    return None;
                }
                Duration::try_from_secs_f64(number.parse().ok()?).ok()?
            } else {
                let count: u64 = number.parse().ok()?;
                Duration::from_secs(count.checked_mul(scale)?)
            };
            total = total.checked_add(part)?;
            any = true;
        }
    }

    any.then_some(total)
}

/// Parses `#rgb`, `#rrggbb`, `0xrrggbb`, `rgb(r, g, b)` or a color name.
pub fn parse_color(input: &str) -> Option<Color> {
    let lower = input.trim().to_lowercase();

    if let Some(hex) = lower.strip_prefix('#').or_else(|| lower.strip_prefix("0x")) {
        return parse_hex_color(hex);
    }

    if let Some(body) = lower.strip_prefix("rgb(").and_then(|rest| rest.strip_suffix(')')) {
        let parts: Vec<u8> = body.split(',').map(|part| part.trim().parse().ok()).collect::<Option<_>>()?;
        return match parts.as_slice() {
            &[r, g, b] => Some(Color::new(r, g, b)),
            _ => None,
        };
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|&(_, rgb)| Color::from_rgb(rgb))
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let rgb = u32::from_str_radix(hex, 16).ok()?;
            let expand = |nibble: u32| (nibble * 0x11) as u8;
            Some(Color::new(expand((rgb >> 8) & 0xf), expand((rgb >> 4) & 0xf), expand(rgb & 0xf)))
        }
        6 => u32::from_str_radix(hex, 16).ok().map(Color::from_rgb),
        _ => None,
    }
}

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// Parses a full date-time, a time (today's date) or a date (midnight).
pub fn parse_date_time(input: &str) -> Option<NaiveDateTime> {
    if let Some(parsed) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
    {
        return Some(parsed);
    }
    if let Some(time) = TIME_FORMATS.iter().find_map(|format| NaiveTime::parse_from_str(input, format).ok()) {
        return Some(now().date().and_time(time));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok().and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
