//! Field kind inference over a bounded sample of rows.
//!
//! A column's kind is fixed by the first sampled value that settles it and is
//! never revisited afterwards.

use std::fmt;

use csv::StringRecord;
use log::debug;
use regex::Regex;

use crate::classify::{ColumnLayout, ColumnRole};
use crate::error::{ImportError, Result};
use crate::timestamp::TimestampFormat;

/// Number of data rows sampled before kinds are frozen.
pub const INFERENCE_WINDOW: usize = 100;

const INTEGER_PATTERN: &str = r"^\d+$";
const FLOAT_PATTERN: &str = r"^\d+\.\d+$";
const TRUE_PATTERN: &str = r"^(true|T|True|TRUE)$";
const FALSE_PATTERN: &str = r"^(false|F|False|FALSE)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    String,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Integer => write!(f, "integer"),
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Boolean => write!(f, "boolean"),
            ColumnKind::String => write!(f, "string"),
        }
    }
}

/// The ordered set of value patterns: timestamp shape, integer, float,
/// true and false literals.
#[derive(Debug, Clone)]
pub struct ValuePatterns {
    timestamp: TimestampFormat,
    integer: Regex,
    float: Regex,
    truth: Regex,
    falsity: Regex,
}

impl ValuePatterns {
    pub fn new(timestamp: TimestampFormat) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ImportError::config(format!("bad value pattern: {}", e)))
        };
        Ok(Self {
            timestamp,
            integer: compile(INTEGER_PATTERN)?,
            float: compile(FLOAT_PATTERN)?,
            truth: compile(TRUE_PATTERN)?,
            falsity: compile(FALSE_PATTERN)?,
        })
    }

    pub fn timestamp(&self) -> &TimestampFormat {
        &self.timestamp
    }

    pub(crate) fn is_integer(&self, value: &str) -> bool {
        self.integer.is_match(value)
    }

    pub(crate) fn parse_bool(&self, value: &str) -> Option<bool> {
        if self.truth.is_match(value) {
            Some(true)
        } else if self.falsity.is_match(value) {
            Some(false)
        } else {
            None
        }
    }

    /// Classify one raw cell, first match wins. `None` means the value does
    /// not settle the column's kind; a timestamp-shaped value never does.
    pub fn classify(&self, value: &str) -> Option<ColumnKind> {
        if self.timestamp.matches(value) {
            None
        } else if self.integer.is_match(value) {
            Some(ColumnKind::Integer)
        } else if self.float.is_match(value) {
            Some(ColumnKind::Float)
        } else if self.parse_bool(value).is_some() {
            Some(ColumnKind::Boolean)
        } else {
            None
        }
    }
}

/// Frozen column roles and field kinds, indexed by header position.
#[derive(Debug, Clone)]
pub struct Schema {
    layout: ColumnLayout,
    kinds: Vec<Option<ColumnKind>>,
}

impl Schema {
    #[cfg(test)]
    pub(crate) fn with_kinds<'a, I>(layout: ColumnLayout, kinds: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, ColumnKind)>,
    {
        let mut resolved = vec![None; layout.len()];
        for (name, kind) in kinds {
            if let Some((idx, _)) = layout.fields().find(|(_, field)| *field == name) {
                resolved[idx] = Some(kind);
            }
        }
        Self::frozen(layout, resolved, 0)
    }

    fn frozen(layout: ColumnLayout, kinds: Vec<Option<ColumnKind>>, window: usize) -> Result<Self> {
        if let Some((_, column)) = layout.fields().find(|(idx, _)| kinds[*idx].is_none()) {
            return Err(ImportError::UnresolvedColumnType {
                column: column.to_string(),
                window,
            });
        }
        Ok(Self { layout, kinds })
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// `None` for tag and timestamp columns.
    pub fn kind_at(&self, idx: usize) -> Option<ColumnKind> {
        self.kinds.get(idx).copied().flatten()
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.layout
            .iter()
            .find(|(_, column, _)| *column == name)
            .and_then(|(idx, _, _)| self.kind_at(idx))
    }

    pub fn describe(&self) -> Vec<String> {
        self.layout
            .iter()
            .map(|(idx, name, role)| match (role, self.kind_at(idx)) {
                (ColumnRole::Field, Some(kind)) => format!("field {} : {}", name, kind),
                (ColumnRole::Tag, _) => format!("tag {} : string", name),
                (role, _) => format!("{} {}", role, name),
            })
            .collect()
    }
}

pub struct KindInference<'a> {
    layout: ColumnLayout,
    patterns: &'a ValuePatterns,
    kinds: Vec<Option<ColumnKind>>,
    unresolved: usize,
    rows_seen: usize,
}

impl<'a> KindInference<'a> {
    pub fn new(layout: ColumnLayout, patterns: &'a ValuePatterns) -> Self {
        let unresolved = layout.fields().count();
        Self {
            kinds: vec![None; layout.len()],
            layout,
            patterns,
            unresolved,
            rows_seen: 0,
        }
    }

    /// Inspect one sampled row. Returns `true` once every field column has
    /// a kind.
    pub fn observe(&mut self, row: &StringRecord) -> bool {
        self.rows_seen += 1;
        for (idx, name) in self.layout.fields() {
            if self.kinds[idx].is_some() {
                continue;
            }
            // Blank and ambiguous cells leave the column for a later row
            let value = row.get(idx).unwrap_or("");
            if let Some(kind) = self.patterns.classify(value) {
                debug!("column {} resolved as {} on sample row {}", name, kind, self.rows_seen);
                self.kinds[idx] = Some(kind);
                self.unresolved -= 1;
            }
        }
        self.unresolved == 0
    }

    /// Fails naming the first column left unresolved.
    pub fn finish(self) -> Result<Schema> {
        Schema::frozen(self.layout, self.kinds, self.rows_seen)
    }
}

/// Sample up to `window` rows and freeze the field kinds.
pub fn infer_schema<I>(
    rows: I,
    layout: ColumnLayout,
    patterns: &ValuePatterns,
    window: usize,
) -> Result<Schema>
where
    I: IntoIterator<Item = std::result::Result<StringRecord, csv::Error>>,
{
    let mut inference = KindInference::new(layout, patterns);
    for row in rows.into_iter().take(window) {
        if inference.observe(&row?) {
            break;
        }
    }
    inference.finish()
}
