use std::time::Duration;

use crate::error::{Error, Result};

/// Unit name to seconds multiplier. Lookup is exact, so plural and short
/// forms are listed separately.
const UNITS: &[(&str, f64)] = &[
    ("ms", 0.001),
    ("msec", 0.001),
    ("millisecond", 0.001),
    ("milliseconds", 0.001),
    ("s", 1.0),
    ("sec", 1.0),
    ("secs", 1.0),
    ("second", 1.0),
    ("seconds", 1.0),
    ("m", 60.0),
    ("min", 60.0),
    ("mins", 60.0),
    ("minute", 60.0),
    ("minutes", 60.0),
    ("h", 3_600.0),
    ("hr", 3_600.0),
    ("hrs", 3_600.0),
    ("hour", 3_600.0),
    ("hours", 3_600.0),
    ("d", 86_400.0),
    ("day", 86_400.0),
    ("days", 86_400.0),
    ("w", 604_800.0),
    ("week", 604_800.0),
    ("weeks", 604_800.0),
];

/// Parse human duration expressions like "90", "2m", "1h30m", "1.5h" or
/// "1 hour 30 minutes".
///
/// A bare number is taken as seconds. Components are summed.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let input = s.trim();
    if input.is_empty() {
        return Err(Error::Duration("empty duration".to_string()));
    }

    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = 0.0_f64;
    let mut rest = input;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(Error::Duration(format!("expected a number in '{}'", input)));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| Error::Duration(format!("bad number in '{}'", input)))?;
        rest = rest[number_len..].trim_start();

        let unit_len = rest
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let multiplier = UNITS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(unit))
            .map(|(_, m)| *m)
            .ok_or_else(|| Error::Duration(format!("unknown unit '{}' in '{}'", unit, input)))?;

        total += value * multiplier;
        rest = rest[unit_len..].trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    }

    Duration::try_from_secs_f64(total)
        .map_err(|_| Error::Duration(format!("out of range: '{}'", input)))
}

/// Format an age in seconds for display ("12s", "4m 05s", "2h 10m", "3d 4h").
pub fn format_age(secs: i64) -> String {
    if secs < 0 {
        return "just now".to_string();
    }
    let secs = secs as u64;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3_600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {:02}m", secs / 3_600, (secs % 3_600) / 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3_600)
    }
}
