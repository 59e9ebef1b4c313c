use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::GridError;

/// A column field: either a column of the base table or one column of a
/// directly related table (`Author.Name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Local(String),
    Related { relation: String, field: String },
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, GridError> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let second = segments.next();
        if segments.next().is_some() {
            return Err(GridError::Config(format!(
                "field `{path}` traverses more than one relation"
            )));
        }

        for segment in std::iter::once(first).chain(second) {
            if !is_identifier(segment) {
                return Err(GridError::Config(format!(
                    "field `{path}` is not a plain identifier path"
                )));
            }
        }

        Ok(match second {
            Some(field) => FieldPath::Related {
                relation: first.to_string(),
                field: field.to_string(),
            },
            None => FieldPath::Local(first.to_string()),
        })
    }

    pub fn relation(&self) -> Option<&str> {
        match self {
            FieldPath::Local(_) => None,
            FieldPath::Related { relation, .. } => Some(relation),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FieldPath::Local(field) => field,
            FieldPath::Related { field, .. } => field,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Local(field) => write!(f, "{field}"),
            FieldPath::Related { relation, field } => write!(f, "{relation}.{field}"),
        }
    }
}

pub fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn default_true() -> bool {
    true
}

fn default_width() -> u32 {
    150
}

fn default_responsive() -> u32 {
    1
}

/// One configured, allow-listed column of a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub editable: bool,
    #[serde(default = "default_width")]
    pub width: u32,
    /// Collapse priority: `0` never collapses, higher values collapse first.
    #[serde(default = "default_responsive")]
    pub responsive: u32,
}

impl ColumnSpec {
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            title: field.clone(),
            field,
            sortable: true,
            filterable: false,
            editable: false,
            width: default_width(),
            responsive: default_responsive(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn responsive(mut self, priority: u32) -> Self {
        self.responsive = priority;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    pub spec: ColumnSpec,
    pub path: FieldPath,
}

/// The immutable allow-list of columns for one grid instance.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    columns: Vec<ResolvedColumn>,
}

impl ColumnSet {
    pub fn new(specs: Vec<ColumnSpec>) -> Result<Self, GridError> {
        if specs.is_empty() {
            return Err(GridError::Config("a grid needs at least one column".into()));
        }

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(specs.len());
        for mut spec in specs {
            if !seen.insert(spec.field.clone()) {
                return Err(GridError::Config(format!(
                    "duplicate column field `{}`",
                    spec.field
                )));
            }
            if spec.title.is_empty() {
                spec.title = spec.field.clone();
            }
            let path = FieldPath::parse(&spec.field)?;
            columns.push(ResolvedColumn { spec, path });
        }

        Ok(Self { columns })
    }

    pub fn get(&self, field: &str) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|column| column.spec.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns.iter()
    }

    pub fn specs(&self) -> Vec<ColumnSpec> {
        self.columns.iter().map(|column| column.spec.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_path_allows_one_relation_level() {
        assert_eq!(
            FieldPath::parse("Name").expect("local field"),
            FieldPath::Local("Name".into())
        );
        assert_eq!(
            FieldPath::parse("Author.Name").expect("related field"),
            FieldPath::Related {
                relation: "Author".into(),
                field: "Name".into()
            }
        );
        assert!(FieldPath::parse("Author.Publisher.Name").is_err());
        assert!(FieldPath::parse("Name; DROP TABLE books").is_err());
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("Author.").is_err());
    }

    #[test]
    fn column_set_rejects_duplicate_fields() {
        let err = ColumnSet::new(vec![ColumnSpec::new("Name"), ColumnSpec::new("Name")])
            .expect_err("duplicate fields should be rejected");
        assert!(err.to_string().contains("duplicate column field"));
    }

    #[test]
    fn column_set_defaults_title_to_field() {
        let columns = ColumnSet::new(vec![ColumnSpec {
            title: String::new(),
            ..ColumnSpec::new("Status")
        }])
        .expect("column set should build");
        assert_eq!(columns.get("Status").map(|c| c.spec.title.as_str()), Some("Status"));
    }
}
