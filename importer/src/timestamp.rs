use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::error::{ImportError, Result};

/// A strftime-style layout plus a regex matching any text with the same
/// digit positions.
#[derive(Debug, Clone)]
pub struct TimestampFormat {
    format: String,
    shape: Regex,
}

impl TimestampFormat {
    pub fn new(format: &str) -> Result<Self> {
        let pattern = shape_pattern(format)?;
        let shape = Regex::new(&pattern).map_err(|e| ImportError::InvalidTimestampFormat {
            format: format.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            format: format.to_string(),
            shape,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.format
    }

    /// Shape only; the instant itself may still be invalid.
    pub fn matches(&self, value: &str) -> bool {
        self.shape.is_match(value)
    }

    /// Parse `value` with the layout. Layouts without an offset are read as
    /// UTC; date-only layouts resolve to midnight.
    pub fn parse(&self, value: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        if let Ok(dt) = DateTime::parse_from_str(value, &self.format) {
            return Ok(dt.with_timezone(&Utc));
        }
        match NaiveDateTime::parse_from_str(value, &self.format) {
            Ok(naive) => Ok(Utc.from_utc_datetime(&naive)),
            Err(err) => NaiveDate::parse_from_str(value, &self.format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
                .ok_or(err),
        }
    }
}

fn shape_pattern(format: &str) -> Result<String> {
    let invalid = |reason: String| ImportError::InvalidTimestampFormat {
        format: format.to_string(),
        reason,
    };

    let mut pattern = String::from("^");
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            continue;
        }

        // `%-d` style: no padding, so widths become ranges.
        let unpadded = chars.next_if_eq(&'-').is_some();
        let digits = |width: usize| {
            if unpadded {
                format!(r"\d{{1,{}}}", width)
            } else {
                format!(r"\d{{{}}}", width)
            }
        };

        let specifier = chars
            .next()
            .ok_or_else(|| invalid("dangling '%' at end of layout".to_string()))?;
        let piece = match specifier {
            'Y' => digits(4),
            'C' | 'y' | 'm' | 'd' | 'H' | 'I' | 'M' | 'S' | 'U' | 'W' | 'V' | 'g' => digits(2),
            'G' => digits(4),
            'e' | 'k' | 'l' => r"[ \d]\d".to_string(),
            'j' => digits(3),
            'u' | 'w' => r"\d".to_string(),
            's' | 'f' => r"\d+".to_string(),
            'F' => r"\d{4}-\d{2}-\d{2}".to_string(),
            'D' | 'x' => r"\d{2}/\d{2}/\d{2}".to_string(),
            'T' | 'X' => r"\d{2}:\d{2}:\d{2}".to_string(),
            'R' => r"\d{2}:\d{2}".to_string(),
            'b' | 'h' | 'a' => "[A-Za-z]{3}".to_string(),
            'B' | 'A' => "[A-Za-z]+".to_string(),
            'p' | 'P' => "[AaPp][Mm]".to_string(),
            'z' => r"[+-]\d{4}".to_string(),
            'Z' => "[A-Za-z]+".to_string(),
            ':' => match chars.next() {
                Some('z') => r"[+-]\d{2}:\d{2}".to_string(),
                other => return Err(invalid(format!("unsupported specifier '%:{}'", other.unwrap_or(' ')))),
            },
            '.' => match chars.next() {
                Some('f') => r"(?:\.\d+)?".to_string(),
                Some(n @ ('3' | '6' | '9')) if chars.next_if_eq(&'f').is_some() => {
                    format!(r"\.\d{{{}}}", n)
                }
                other => return Err(invalid(format!("unsupported specifier '%.{}'", other.unwrap_or(' ')))),
            },
            n @ ('3' | '6' | '9') if chars.next_if_eq(&'f').is_some() => format!(r"\d{{{}}}", n),
            '%' => "%".to_string(),
            't' => r"\t".to_string(),
            'n' => r"\n".to_string(),
            other => return Err(invalid(format!("unsupported specifier '%{}'", other))),
        };
        pattern.push_str(&piece);
    }
    pattern.push('$');
    Ok(pattern)
}
