//! Date pattern translation.
//!
//! Patterns use the SimpleDateFormat letter vocabulary (`yyyy-MM-dd HH:mm:ss.SSS z`)
//! and are translated into chrono strftime strings before formatting or parsing.
//!
//! | letter | meaning              | chrono |
//! |--------|----------------------|--------|
//! | `y`    | year (`yy` = 2-digit) | `%Y` / `%y` |
//! | `M`    | month (`MMM` = name) | `%m` / `%b` / `%B` |
//! | `d`    | day of month         | `%d` |
//! | `D`    | day of year          | `%j` |
//! | `E`    | day name             | `%a` / `%A` |
//! | `u`    | day of week number   | `%u` |
//! | `a`    | AM/PM marker         | `%p` |
//! | `H`/`h`| hour (0-23 / 1-12)   | `%H` / `%I` |
//! | `m`/`s`| minute / second      | `%M` / `%S` |
//! | `S`    | fractional seconds   | `%3f` |
//! | `z`    | zone name            | `%Z` |
//! | `Z`/`X`| numeric offset       | `%z` / `%:z` |
//!
//! Text between single quotes is literal; `''` is a literal quote.

use super::timestamp::TimestampError;

/// A pattern rewritten into chrono's strftime syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Translated {
    pub format: String,
    /// Carries a numeric UTC offset, so the text fixes its own zone.
    pub has_offset: bool,
    /// Carries at least one time-of-day field.
    pub has_time: bool,
}

pub(crate) fn translate(pattern: &str) -> Result<Translated, TimestampError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut format = String::with_capacity(pattern.len() * 2);
    let mut has_offset = false;
    let mut has_time = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            i = copy_quoted(&chars, i, &mut format).ok_or_else(|| {
                TimestampError::Parse(format!("unterminated quote in pattern '{pattern}'"))
            })?;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut format, c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == c {
            i += 1;
        }
        let count = i - start;

        let item = match (c, count) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('u', _) => "%u",
            ('a', _) => "%p",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('z', _) => "%Z",
            ('Z', _) => "%z",
            ('X', _) => "%:z",
            _ => {
                return Err(TimestampError::Parse(format!(
                    "unsupported pattern letter '{c}' in '{pattern}'"
                )))
            }
        };

        if matches!(c, 'H' | 'h' | 'm' | 's' | 'S' | 'a') {
            has_time = true;
        }
        if matches!(c, 'Z' | 'X') {
            has_offset = true;
        }
        format.push_str(item);
    }

    Ok(Translated {
        format,
        has_offset,
        has_time,
    })
}

/// Byte range of the first unquoted run of `S` letters.
pub(crate) fn fraction_run(pattern: &str) -> Option<(usize, usize)> {
    let mut quoted = false;
    let mut iter = pattern.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        match c {
            '\'' => quoted = !quoted,
            'S' if !quoted => {
                let mut end = idx + 1;
                while let Some(&(next_idx, 'S')) = iter.peek() {
                    end = next_idx + 1;
                    iter.next();
                }
                return Some((idx, end));
            }
            _ => {}
        }
    }
    None
}

/// Copies a quoted literal starting at `chars[start] == '\''`.
/// Returns the index just past the closing quote.
fn copy_quoted(chars: &[char], start: usize, out: &mut String) -> Option<usize> {
    if chars.get(start + 1) == Some(&'\'') {
        out.push('\'');
        return Some(start + 2);
    }

    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        push_literal(out, chars[i]);
        i += 1;
    }
    None
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
