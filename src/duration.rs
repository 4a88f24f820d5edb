// Duration strings as reported by Presto ("1.50s", "500ms", "1h2m3s") <-> std::time::Duration

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;
const NANOS_PER_MIN: u64 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MIN;

/// Digits of a fraction kept before truncating (keeps the scaled value inside u128).
const MAX_FRACTION_DIGITS: usize = 19;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("negative duration {0:?}")]
    Negative(String),
    #[error("duration {0:?} out of range")]
    Overflow(String),
}

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(NANOS_PER_MIN),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Parses a sequence of `<decimal><unit>` terms, e.g. `"1.5s"`, `"2h45m"`, `"300ms"`.
/// The bare string `"0"` is accepted as zero.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError::Invalid(input.to_string());
    let overflow = || DurationError::Overflow(input.to_string());

    let (negative, mut rest) = if let Some(r) = input.strip_prefix('-') {
        (true, r)
    } else if let Some(r) = input.strip_prefix('+') {
        (false, r)
    } else {
        (false, input)
    };
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        if !rest.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
            return Err(invalid());
        }
        let (int_digits, tail) = split_digits(rest);
        let (frac_digits, tail) = match tail.strip_prefix('.') {
            Some(t) => split_digits(t),
            None => ("", tail),
        };
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(invalid());
        }

        let unit_len = tail
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let whole = parse_digits(int_digits).ok_or_else(overflow)?;
        let term = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(fraction_nanos(frac_digits, scale)))
            .ok_or_else(overflow)?;
        total = total.checked_add(term).ok_or_else(overflow)?;
        rest = tail;
    }

    if negative && total != 0 {
        return Err(DurationError::Negative(input.to_string()));
    }
    Ok(Duration::from_nanos(total))
}

fn split_digits(s: &str) -> (&str, &str) {
    let n = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(n)
}

fn parse_digits(digits: &str) -> Option<u64> {
    digits.bytes().try_fold(0u64, |acc, b| {
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    })
}

fn fraction_nanos(digits: &str, scale: u64) -> u64 {
    let mut value: u128 = 0;
    let mut denom: u128 = 1;
    for b in digits.bytes().take(MAX_FRACTION_DIGITS) {
        value = value * 10 + u128::from(b - b'0');
        denom *= 10;
    }
    // value < denom, so the result is < scale and fits in u64
    (value * u128::from(scale) / denom) as u64
}

/// Renders a duration in the canonical form accepted by [`parse_duration`]:
/// `"0s"`, `"750ns"`, `"1.5µs"`, `"500ms"`, `"1.5s"`, `"1m30s"`, `"1h0m0s"`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < u128::from(NANOS_PER_SEC) {
        let (unit, width, suffix) = if nanos < u128::from(NANOS_PER_MICRO) {
            (1, 0, "ns")
        } else if nanos < u128::from(NANOS_PER_MILLI) {
            (u128::from(NANOS_PER_MICRO), 3, "µs")
        } else {
            (u128::from(NANOS_PER_MILLI), 6, "ms")
        };
        return format!("{}{}", scaled(nanos, unit, width), suffix);
    }

    let secs_total = nanos / u128::from(NANOS_PER_SEC);
    let sub_nanos = nanos % u128::from(NANOS_PER_SEC);
    let hours = secs_total / 3600;
    let mins = (secs_total / 60) % 60;
    let secs = secs_total % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || mins > 0 {
        out.push_str(&format!("{mins}m"));
    }
    let sec_nanos = secs * u128::from(NANOS_PER_SEC) + sub_nanos;
    out.push_str(&scaled(sec_nanos, u128::from(NANOS_PER_SEC), 9));
    out.push('s');
    out
}

fn scaled(value: u128, unit: u128, width: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Elapsed time carried in Presto query stats. On the wire it is always a duration string;
/// any other JSON type is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Elapsed(Duration);

impl Elapsed {
    pub const ZERO: Elapsed = Elapsed(Duration::ZERO);

    pub const fn new(d: Duration) -> Self {
        Self(d)
    }

    pub const fn as_duration(self) -> Duration {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl From<Duration> for Elapsed {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<Elapsed> for Duration {
    fn from(e: Elapsed) -> Self {
        e.0
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

impl FromStr for Elapsed {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Self)
    }
}

impl Serialize for Elapsed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Elapsed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(ElapsedVisitor)
    }
}

struct ElapsedVisitor;

impl Visitor<'_> for ElapsedVisitor {
    type Value = Elapsed;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration string such as \"1.50s\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }
}
