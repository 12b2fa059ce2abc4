use std::collections::HashSet;
use std::fmt;

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Timestamp,
    Tag,
    Field,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRole::Timestamp => write!(f, "timestamp"),
            ColumnRole::Tag => write!(f, "tag"),
            ColumnRole::Field => write!(f, "field"),
        }
    }
}

/// A header together with the role of each of its columns, in header order.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    columns: Vec<(String, ColumnRole)>,
}

impl ColumnLayout {
    /// Assign roles to `headers`. A tag name equal to the timestamp column
    /// does not count as matched.
    pub fn classify(
        headers: &[String],
        timestamp_column: &str,
        tag_columns: &[String],
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(headers.len());
        for name in headers {
            if !seen.insert(name.as_str()) {
                return Err(ImportError::DuplicateHeaderName(name.clone()));
            }
        }

        let tags: HashSet<&str> = tag_columns.iter().map(String::as_str).collect();
        let columns: Vec<(String, ColumnRole)> = headers
            .iter()
            .map(|name| {
                let role = if name == timestamp_column {
                    ColumnRole::Timestamp
                } else if tags.contains(name.as_str()) {
                    ColumnRole::Tag
                } else {
                    ColumnRole::Field
                };
                (name.clone(), role)
            })
            .collect();

        if !columns.iter().any(|(_, role)| *role == ColumnRole::Field) {
            return Err(ImportError::MissingFieldColumn);
        }
        if !columns.iter().any(|(_, role)| *role == ColumnRole::Timestamp) {
            return Err(ImportError::MissingTimestampColumn {
                column: timestamp_column.to_string(),
                headers: headers.join(","),
            });
        }
        let matched_tags = columns
            .iter()
            .filter(|(_, role)| *role == ColumnRole::Tag)
            .count();
        if matched_tags < tags.len() {
            return Err(ImportError::UnmatchedTagColumn {
                tags: tag_columns.join(","),
                headers: headers.join(","),
            });
        }

        Ok(Self { columns })
    }

    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, ColumnRole)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, (name, role))| (idx, name.as_str(), *role))
    }

    pub fn fields(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.iter()
            .filter(|(_, _, role)| *role == ColumnRole::Field)
            .map(|(idx, name, _)| (idx, name))
    }

    #[cfg(test)]
    fn role_of(&self, name: &str) -> Option<ColumnRole> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, role)| *role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_roles() {
        let layout = ColumnLayout::classify(
            &names(&["timestamp", "host", "cpu", "ok"]),
            "timestamp",
            &names(&["host"]),
        )
        .unwrap();

        assert_eq!(layout.len(), 4);
        assert_eq!(layout.role_of("timestamp"), Some(ColumnRole::Timestamp));
        assert_eq!(layout.role_of("host"), Some(ColumnRole::Tag));
        assert_eq!(layout.role_of("cpu"), Some(ColumnRole::Field));
        assert_eq!(layout.role_of("ok"), Some(ColumnRole::Field));
        assert_eq!(layout.role_of("missing"), None);

        let fields: Vec<_> = layout.fields().collect();
        assert_eq!(fields, vec![(2, "cpu"), (3, "ok")]);
    }

    #[test]
    fn test_missing_field_column() {
        let err = ColumnLayout::classify(
            &names(&["timestamp", "host"]),
            "timestamp",
            &names(&["host"]),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::MissingFieldColumn));
    }

    #[test]
    fn test_missing_timestamp_column() {
        let err = ColumnLayout::classify(&names(&["time", "cpu"]), "timestamp", &[]).unwrap_err();
        match err {
            ImportError::MissingTimestampColumn { column, headers } => {
                assert_eq!(column, "timestamp");
                assert_eq!(headers, "time,cpu");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_tag_column_reports_everything() {
        let err = ColumnLayout::classify(
            &names(&["timestamp", "host", "cpu"]),
            "timestamp",
            &names(&["host", "region"]),
        )
        .unwrap_err();
        match err {
            ImportError::UnmatchedTagColumn { tags, headers } => {
                assert_eq!(tags, "host,region");
                assert_eq!(headers, "timestamp,host,cpu");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_tag_named_like_timestamp_is_unmatched() {
        let err = ColumnLayout::classify(
            &names(&["timestamp", "cpu"]),
            "timestamp",
            &names(&["timestamp"]),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::UnmatchedTagColumn { .. }));
    }

    #[test]
    fn test_duplicate_header_name() {
        let err = ColumnLayout::classify(&names(&["timestamp", "cpu", "cpu"]), "timestamp", &[])
            .unwrap_err();
        match err {
            ImportError::DuplicateHeaderName(name) => assert_eq!(name, "cpu"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_field_requirement_checked_first() {
        // neither a field nor the timestamp column
        let err = ColumnLayout::classify(&names(&["host"]), "timestamp", &names(&["host"]))
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingFieldColumn));
    }
}
