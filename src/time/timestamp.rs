//! Microsecond-precision timestamp.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pattern::{fraction_run, translate};

/// Pattern used when formatting or parsing without an explicit one.
///
/// Renders as `yyyy-MM-dd HH:mm:ss.SSSuuu z`: three millisecond digits followed
/// by the three microsecond digits.
pub const DEFAULT_PATTERN: &str = "yyyy-MM-dd HH:mm:ss.SSSSSS z";

/// Largest millisecond value accepted at construction: 9999-12-31T23:59:59.999Z.
pub const MAX_MILLIS: i64 = 253_402_300_799_999;

/// Widest fractional-seconds field a pattern may declare.
const MAX_FRACTION_DIGITS: usize = 6;

/// Error type for timestamp construction, parsing and formatting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Time zone used to render or interpret wall-clock text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The system time zone.
    #[default]
    Local,
    /// An IANA zone such as `UTC` or `America/New_York`.
    Named(Tz),
}

impl Zone {
    /// Resolve a zone id. `local` (any case) selects the system zone.
    pub fn parse(id: &str) -> Result<Self, TimestampError> {
        if id.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        id.parse::<Tz>()
            .map(Zone::Named)
            .map_err(|e| TimestampError::Parse(format!("unknown time zone '{id}': {e}")))
    }

    pub fn utc() -> Self {
        Zone::Named(Tz::UTC)
    }

    fn render(&self, millis: i64, items: &[Item<'_>]) -> Result<String, TimestampError> {
        let rendered = match self {
            Zone::Local => Local
                .timestamp_millis_opt(millis)
                .single()
                .map(|dt| dt.format_with_items(items.iter()).to_string()),
            Zone::Named(tz) => tz
                .timestamp_millis_opt(millis)
                .single()
                .map(|dt| dt.format_with_items(items.iter()).to_string()),
        };
        rendered.ok_or_else(|| {
            TimestampError::InvalidArgument(format!("{millis} ms is outside the calendar range"))
        })
    }

    /// Map wall-clock time to epoch millis. Inside a DST fold the instant
    /// whose rendering with `items` reproduces `text` wins, else the earlier.
    fn resolve(&self, naive: &NaiveDateTime, items: &[Item<'_>], text: &str) -> Result<i64, TimestampError> {
        let millis = match self {
            Zone::Local => pick_instant(Local.from_local_datetime(naive), items, text),
            Zone::Named(tz) => pick_instant(tz.from_local_datetime(naive), items, text),
        };
        millis.ok_or_else(|| {
            TimestampError::Parse(format!("local time {naive} does not exist in {self:?}"))
        })
    }
}

fn pick_instant<Z>(local: LocalResult<DateTime<Z>>, items: &[Item<'_>], text: &str) -> Option<i64>
where
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    let latest = local.clone().latest()?;
    let earliest = local.earliest()?;
    if earliest != latest && latest.format_with_items(items.iter()).to_string() == text {
        return Some(latest.timestamp_millis());
    }
    Some(earliest.timestamp_millis())
}

/// A timestamp with microsecond accuracy.
///
/// Stored as `mmmmmmmmmm.uuu`: whole milliseconds since the Unix epoch plus a
/// fractional microsecond part that is always kept in `[0, 999]`. Arithmetic
/// carries into and borrows from the millisecond part. Construction accepts
/// milliseconds up to [`MAX_MILLIS`].
///
/// Ordering compares milliseconds first, then the microsecond fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimestampParts", into = "TimestampParts")]
pub struct PrecisionTimestamp {
    millis: i64,
    micros: i64,
}

#[derive(Serialize, Deserialize)]
struct TimestampParts {
    millis: i64,
    micros: i64,
}

impl From<PrecisionTimestamp> for TimestampParts {
    fn from(ts: PrecisionTimestamp) -> Self {
        Self {
            millis: ts.millis,
            micros: ts.micros,
        }
    }
}

impl TryFrom<TimestampParts> for PrecisionTimestamp {
    type Error = TimestampError;

    fn try_from(parts: TimestampParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.millis, parts.micros)
    }
}

impl PrecisionTimestamp {
    /// Current wall-clock time at millisecond resolution (zero fraction).
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Self { millis, micros: 0 }
    }

    /// Build from a total count of microseconds since the epoch.
    pub fn from_micros(usecs: i64) -> Result<Self, TimestampError> {
        if usecs < 0 {
            return Err(TimestampError::InvalidArgument(
                "microsecond time must be non-negative".into(),
            ));
        }
        Self::from_parts(usecs / 1000, usecs % 1000)
    }

    /// Build from milliseconds plus a fractional microsecond part in `[0, 999]`.
    pub fn from_parts(millis: i64, micros: i64) -> Result<Self, TimestampError> {
        if millis < 0 {
            return Err(TimestampError::InvalidArgument(
                "milliseconds must be non-negative".into(),
            ));
        }
        if millis > MAX_MILLIS {
            return Err(TimestampError::InvalidArgument(format!(
                "milliseconds must not exceed {MAX_MILLIS}"
            )));
        }
        if !(0..=999).contains(&micros) {
            return Err(TimestampError::InvalidArgument(
                "microsecond fraction must be in [0, 999]".into(),
            ));
        }
        Ok(Self { millis, micros })
    }

    /// Build from a chrono date-time, keeping its sub-millisecond digits.
    pub fn from_datetime<Z: TimeZone>(dt: &DateTime<Z>) -> Result<Self, TimestampError> {
        let micros = i64::from(dt.timestamp_subsec_micros() % 1000);
        Self::from_parts(dt.timestamp_millis(), micros)
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Fractional microseconds, always in `[0, 999]`.
    pub fn micros(&self) -> i64 {
        self.micros
    }

    /// Saturates at the `i64` bounds.
    pub fn total_micros(&self) -> i64 {
        self.millis.saturating_mul(1000).saturating_add(self.micros)
    }

    pub fn seconds(&self) -> i64 {
        self.millis / 1000
    }

    /// Microseconds elapsed since the last whole second (`sss.uuuuuu` view).
    pub fn sec_micros(&self) -> i64 {
        (self.millis % 1000) * 1000 + self.micros
    }

    /// Add another timestamp to this one, carrying overflowed microseconds.
    /// The millisecond part saturates instead of wrapping.
    pub fn add(&mut self, other: &Self) {
        self.millis = self.millis.saturating_add(other.millis);
        self.micros += other.micros;
        if self.micros > 999 {
            self.millis = self.millis.saturating_add(self.micros / 1000);
            self.micros %= 1000;
        }
    }

    /// Add raw values. `micros` may exceed 999; the excess is folded into
    /// milliseconds before the addition.
    pub fn add_parts(&mut self, millis: i64, micros: i64) -> Result<(), TimestampError> {
        let delta = Self::folded(millis, micros)?;
        self.add(&delta);
        Ok(())
    }

    /// Subtract another timestamp (`self = self - other`), borrowing a
    /// millisecond when the fraction underflows.
    ///
    /// Subtracting a later timestamp leaves a negative millisecond part. The
    /// value stays internally consistent but can no longer be formatted as a
    /// calendar date; avoiding that is the caller's responsibility.
    pub fn subtract(&mut self, other: &Self) {
        let mut millis = self.millis;
        let mut micros = self.micros;
        if micros < other.micros {
            millis = millis.saturating_sub(1);
            micros += 1000;
        }
        self.millis = millis.saturating_sub(other.millis);
        self.micros = micros - other.micros;
    }

    /// Subtract raw values; see [`subtract`](Self::subtract).
    pub fn subtract_parts(&mut self, millis: i64, micros: i64) -> Result<(), TimestampError> {
        let delta = Self::folded(millis, micros)?;
        self.subtract(&delta);
        Ok(())
    }

    /// `self - other` in microseconds. Negative when `self < other`.
    /// Saturates at the `i64` bounds.
    pub fn difference(&self, other: &Self) -> i64 {
        self.millis
            .saturating_sub(other.millis)
            .saturating_mul(1000)
            .saturating_add(self.micros - other.micros)
    }

    fn folded(millis: i64, micros: i64) -> Result<Self, TimestampError> {
        if millis < 0 || micros < 0 {
            return Err(TimestampError::InvalidArgument(
                "time values must be non-negative".into(),
            ));
        }
        Ok(Self {
            millis: millis.saturating_add(micros / 1000),
            micros: micros % 1000,
        })
    }

    /// Parse text written in `pattern` (default [`DEFAULT_PATTERN`]).
    ///
    /// Up to six fractional-second digits are honoured: the digit run is
    /// normalised to the pattern's declared width, the first three digits are
    /// parsed as milliseconds and the rest are added back as microseconds.
    /// Text without a numeric offset is interpreted in `zone` (default: local).
    /// Zone names in the text only settle which instant is meant when the
    /// wall-clock time repeats at a DST change.
    pub fn parse(text: &str, pattern: Option<&str>, zone: Option<Zone>) -> Result<Self, TimestampError> {
        let pattern = pattern.filter(|p| !p.is_empty()).unwrap_or(DEFAULT_PATTERN);
        let zone = zone.unwrap_or_default();

        let (text, pattern, micros) = splice_fraction(text, pattern)?;
        let translated = translate(&pattern)?;
        let parse_error =
            |e: chrono::ParseError| TimestampError::Parse(format!("'{text}' does not match '{pattern}': {e}"));

        let millis = if translated.has_offset {
            DateTime::parse_from_str(&text, &translated.format)
                .map_err(parse_error)?
                .timestamp_millis()
        } else {
            let naive = match NaiveDateTime::parse_from_str(&text, &translated.format) {
                Ok(naive) => naive,
                Err(_) if !translated.has_time => NaiveDate::parse_from_str(&text, &translated.format)
                    .map_err(parse_error)?
                    .and_time(NaiveTime::MIN),
                Err(e) => return Err(parse_error(e)),
            };
            let items: Vec<Item<'_>> = StrftimeItems::new(&translated.format).collect();
            zone.resolve(&naive, &items, &text)?
        };

        let mut ts = Self::from_parts(millis, 0)?;
        ts.add_parts(0, micros)?;
        Ok(ts)
    }

    /// Render using `pattern` (default [`DEFAULT_PATTERN`]) in `zone`
    /// (default: local). The first fractional-seconds run is rendered as
    /// three millisecond digits followed by the three microsecond digits.
    pub fn format(&self, pattern: Option<&str>, zone: Option<Zone>) -> Result<String, TimestampError> {
        let pattern = pattern.filter(|p| !p.is_empty()).unwrap_or(DEFAULT_PATTERN);
        let pattern = match fraction_run(pattern) {
            Some((start, end)) => format!(
                "{}SSS{:03}{}",
                &pattern[..start],
                self.micros,
                &pattern[end..]
            ),
            None => pattern.to_owned(),
        };

        let translated = translate(&pattern)?;
        let items: Vec<Item<'_>> = StrftimeItems::new(&translated.format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(TimestampError::Parse(format!("invalid pattern '{pattern}'")));
        }
        zone.unwrap_or_default().render(self.millis, &items)
    }
}

impl Default for PrecisionTimestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for PrecisionTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format(None, None) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}.{:03}ms", self.millis, self.micros),
        }
    }
}

/// Rewrites text and pattern so the fractional-seconds field is exactly three
/// millisecond digits. Returns the leftover microseconds.
fn splice_fraction(text: &str, pattern: &str) -> Result<(String, String, i64), TimestampError> {
    let Some((fmt_start, fmt_end)) = fraction_run(pattern) else {
        return Ok((text.to_owned(), pattern.to_owned(), 0));
    };

    let width = fmt_end - fmt_start;
    if width > MAX_FRACTION_DIGITS {
        return Err(TimestampError::Parse(format!(
            "pattern '{pattern}' declares {width} fractional-second digits; at most {MAX_FRACTION_DIGITS} are supported"
        )));
    }

    let spliced_pattern = format!("{}SSS{}", &pattern[..fmt_start], &pattern[fmt_end..]);

    let digits_start = match text.rfind('.') {
        Some(dot) if dot >= 2 => dot + 1,
        _ => return Ok((text.to_owned(), spliced_pattern, 0)),
    };
    let digit_count = text[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    let digits_end = digits_start + digit_count;

    let mut fraction: String = text[digits_start..digits_end].chars().take(width).collect();
    while fraction.len() < MAX_FRACTION_DIGITS {
        fraction.push('0');
    }

    let micros = fraction[3..]
        .parse::<i64>()
        .map_err(|e| TimestampError::Parse(format!("bad fractional seconds in '{text}': {e}")))?;
    let spliced_text = format!("{}{}{}", &text[..digits_start], &fraction[..3], &text[digits_end..]);

    Ok((spliced_text, spliced_pattern, micros))
}
