//! Conversion of data rows into points.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use csv::StringRecord;
use log::warn;

use crate::classify::ColumnRole;
use crate::error::RowError;
use crate::infer::{ColumnKind, Schema, ValuePatterns};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}i", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::String(v) => write!(f, "{:?}", v),
            FieldValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

/// One time-series observation built from a data row.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    // None until stamped with the flush time
    pub timestamp: Option<DateTime<Utc>>,
}

pub struct PointConverter {
    measurement: String,
    schema: Schema,
    patterns: ValuePatterns,
}

impl PointConverter {
    pub fn new(measurement: impl Into<String>, schema: Schema, patterns: ValuePatterns) -> Self {
        Self {
            measurement: measurement.into(),
            schema,
            patterns,
        }
    }

    /// Convert data row number `row` (1-based, header excluded).
    pub fn convert(&self, row: u64, record: &StringRecord) -> Result<Point, RowError> {
        let mut point = Point {
            measurement: self.measurement.clone(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: None,
        };
        let timestamp = self.patterns.timestamp();

        for (idx, name, role) in self.schema.layout().iter() {
            let raw = record.get(idx).unwrap_or("");

            if role == ColumnRole::Tag {
                point.tags.insert(name.to_string(), raw.to_string());
                continue;
            }

            // Any column may carry a timestamp, not only the designated one
            if timestamp.matches(raw) {
                let instant = match timestamp.parse(raw) {
                    Ok(instant) => instant,
                    Err(e) => {
                        warn!("#{}: {}: Invalid time: {}", row, name, e);
                        continue;
                    }
                };
                if role == ColumnRole::Timestamp {
                    point.timestamp = Some(instant);
                } else {
                    point.fields.insert(name.to_string(), FieldValue::Timestamp(instant));
                }
                continue;
            }

            if role == ColumnRole::Timestamp {
                warn!(
                    "#{}: {}: value {:?} does not match layout {}",
                    row,
                    name,
                    raw,
                    timestamp.as_str()
                );
                continue;
            }

            let value = self.field_value(self.schema.kind_at(idx), raw);
            point.fields.insert(name.to_string(), value);
        }

        // Only possible when every field cell was an unparseable timestamp
        if point.fields.is_empty() {
            return Err(RowError::NoFields { row });
        }
        Ok(point)
    }

    // Blank cells and integer overflow give the kind's zero value; text that
    // is not of the column's kind at all is kept verbatim.
    fn field_value(&self, kind: Option<ColumnKind>, raw: &str) -> FieldValue {
        let text = || FieldValue::String(raw.to_string());
        match kind {
            Some(ColumnKind::Integer) => match raw.parse::<i64>() {
                Ok(v) => FieldValue::Integer(v),
                Err(_) if raw.is_empty() => FieldValue::Integer(0),
                Err(_) if self.patterns.is_integer(raw.trim_start_matches(['-', '+'])) => {
                    FieldValue::Integer(0)
                }
                Err(_) => text(),
            },
            Some(ColumnKind::Float) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => FieldValue::Float(v),
                _ if raw.is_empty() => FieldValue::Float(0.0),
                _ => text(),
            },
            Some(ColumnKind::Boolean) if raw.is_empty() => FieldValue::Boolean(false),
            Some(ColumnKind::Boolean) => match self.patterns.parse_bool(raw) {
                Some(b) => FieldValue::Boolean(b),
                None => text(),
            },
            _ => text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ColumnLayout;
    use crate::infer::{infer_schema, INFERENCE_WINDOW};
    use crate::timestamp::TimestampFormat;

    fn record(values: &[&str]) -> StringRecord {
        StringRecord::from(values.to_vec())
    }

    fn converter(headers: &[&str], tags: &[&str], sample: &[&[&str]]) -> PointConverter {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let tags: Vec<String> = tags.iter().map(|s| s.to_string()).collect();
        let layout = ColumnLayout::classify(&headers, "timestamp", &tags).unwrap();
        let rows = sample.iter().map(|r| Ok(record(r)));
        let schema = infer_schema(rows, layout, &patterns(), INFERENCE_WINDOW).unwrap();
        PointConverter::new("data", schema, patterns())
    }

    fn patterns() -> ValuePatterns {
        ValuePatterns::new(TimestampFormat::new("%Y-%m-%d %H:%M:%S").unwrap()).unwrap()
    }

    fn scenario() -> PointConverter {
        converter(
            &["timestamp", "host", "cpu", "ok"],
            &["host"],
            &[
                &["2021-01-01 00:00:00", "h1", "42", "true"],
                &["2021-01-01 00:00:01", "h1", "43", "false"],
                &["2021-01-01 00:00:02", "h1", "44", "true"],
            ],
        )
    }

    #[test]
    fn test_convert_typed_row() {
        let point = scenario()
            .convert(1, &record(&["2021-01-01 00:00:01", "h1", "43", "false"]))
            .unwrap();

        assert_eq!(point.measurement, "data");
        assert_eq!(point.tags.get("host").map(String::as_str), Some("h1"));
        assert_eq!(point.fields.get("cpu"), Some(&FieldValue::Integer(43)));
        assert_eq!(point.fields.get("ok"), Some(&FieldValue::Boolean(false)));
        assert_eq!(point.timestamp.map(|t| t.timestamp()), Some(1_609_459_201));
        assert!(!point.fields.contains_key("timestamp"));
    }

    #[test]
    fn test_out_of_sample_value_falls_back_to_string() {
        let point = scenario()
            .convert(4, &record(&["2021-01-01 00:00:03", "h1", "abc", "true"]))
            .unwrap();
        assert_eq!(point.fields.get("cpu"), Some(&FieldValue::String("abc".to_string())));
        assert_eq!(point.fields.get("ok"), Some(&FieldValue::Boolean(true)));
    }

    #[test]
    fn test_integer_overflow_becomes_zero() {
        let point = scenario()
            .convert(1, &record(&["2021-01-01 00:00:03", "h1", "99999999999999999999", "T"]))
            .unwrap();
        assert_eq!(point.fields.get("cpu"), Some(&FieldValue::Integer(0)));
    }

    #[test]
    fn test_timestamp_shaped_field_becomes_timestamp_value() {
        let point = scenario()
            .convert(1, &record(&["2021-01-01 00:00:03", "h1", "2021-06-01 12:00:00", "true"]))
            .unwrap();
        match point.fields.get("cpu") {
            Some(FieldValue::Timestamp(t)) => assert_eq!(t.timestamp(), 1_622_548_800),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_time_drops_only_that_value() {
        let point = scenario()
            .convert(1, &record(&["2021-13-45 00:00:00", "h1", "42", "true"]))
            .unwrap();
        assert_eq!(point.timestamp, None);
        assert_eq!(point.fields.len(), 2);

        let point = scenario()
            .convert(1, &record(&["2021-01-01 00:00:00", "h1", "2021-99-01 00:00:00", "true"]))
            .unwrap();
        assert!(!point.fields.contains_key("cpu"));
        assert_eq!(point.fields.get("ok"), Some(&FieldValue::Boolean(true)));
    }

    #[test]
    fn test_tags_are_copied_verbatim() {
        let point = scenario()
            .convert(1, &record(&["2021-01-01 00:00:00", " 2021-01-01 00:00:00 ", "1", "F"]))
            .unwrap();
        assert_eq!(
            point.tags.get("host").map(String::as_str),
            Some(" 2021-01-01 00:00:00 ")
        );
    }

    #[test]
    fn test_signed_integers_stay_integers() {
        let conv = scenario();
        let point = conv.convert(1, &record(&["2021-01-01 00:00:03", "h1", "-3", "T"])).unwrap();
        assert_eq!(point.fields.get("cpu"), Some(&FieldValue::Integer(-3)));

        let point = conv.convert(2, &record(&["2021-01-01 00:00:03", "h1", "+17", "T"])).unwrap();
        assert_eq!(point.fields.get("cpu"), Some(&FieldValue::Integer(17)));

        let point = conv
            .convert(3, &record(&["2021-01-01 00:00:03", "h1", "-99999999999999999999", "T"]))
            .unwrap();
        assert_eq!(point.fields.get("cpu"), Some(&FieldValue::Integer(0)));

        // not a number of any kind
        let point = conv.convert(4, &record(&["2021-01-01 00:00:03", "h1", "1.5", "T"])).unwrap();
        assert_eq!(point.fields.get("cpu"), Some(&FieldValue::String("1.5".to_string())));
    }

    #[test]
    fn test_float_column_accepts_any_number() {
        let conv = converter(
            &["timestamp", "temp"],
            &[],
            &[&["2021-01-01 00:00:00", ""], &["2021-01-01 00:00:00", "21.5"]],
        );
        let cases = [
            ("22.25", FieldValue::Float(22.25)),
            ("22", FieldValue::Float(22.0)),
            ("-1.5", FieldValue::Float(-1.5)),
            ("1e3", FieldValue::Float(1000.0)),
            ("warm", FieldValue::String("warm".to_string())),
            ("NaN", FieldValue::String("NaN".to_string())),
        ];
        for (raw, expected) in cases {
            let point = conv.convert(1, &record(&["2021-01-01 00:00:00", raw])).unwrap();
            assert_eq!(point.fields.get("temp"), Some(&expected), "{}", raw);
        }
    }

    #[test]
    fn test_blank_cells_become_zero_values() {
        let point = scenario()
            .convert(7, &record(&["2021-01-01 00:00:00", "h1", "", ""]))
            .unwrap();
        assert_eq!(point.fields.get("cpu"), Some(&FieldValue::Integer(0)));
        assert_eq!(point.fields.get("ok"), Some(&FieldValue::Boolean(false)));

        let conv = converter(&["timestamp", "temp"], &[], &[&["2021-01-01 00:00:00", "1.5"]]);
        let point = conv.convert(1, &record(&["2021-01-01 00:00:00", ""])).unwrap();
        assert_eq!(point.fields.get("temp"), Some(&FieldValue::Float(0.0)));
    }

    #[test]
    fn test_row_without_fields_is_rejected() {
        let conv = converter(&["timestamp", "seen"], &[], &[&["2021-01-01 00:00:00", "1"]]);
        let err = conv
            .convert(7, &record(&["2021-01-01 00:00:00", "2021-99-99 00:00:00"]))
            .unwrap_err();
        assert_eq!(err, RowError::NoFields { row: 7 });
    }

    #[test]
    fn test_explicit_string_kind() {
        let headers = vec!["timestamp".to_string(), "msg".to_string()];
        let layout = ColumnLayout::classify(&headers, "timestamp", &[]).unwrap();
        let schema = Schema::with_kinds(layout, [("msg", ColumnKind::String)]).unwrap();
        let conv = PointConverter::new("logs", schema, patterns());

        let point = conv.convert(1, &record(&["2021-01-01 00:00:00", "42"])).unwrap();
        assert_eq!(point.fields.get("msg"), Some(&FieldValue::String("42".to_string())));

        let point = conv.convert(2, &record(&["2021-01-01 00:00:00", ""])).unwrap();
        assert_eq!(point.fields.get("msg"), Some(&FieldValue::String(String::new())));
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Integer(42).to_string(), "42i");
        assert_eq!(FieldValue::Float(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::Boolean(true).to_string(), "true");
        assert_eq!(FieldValue::String("a\"b".to_string()).to_string(), "\"a\\\"b\"");
    }
}
