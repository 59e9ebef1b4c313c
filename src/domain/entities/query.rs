use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Compiled size bound for `regex` filter patterns.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Compiles a `regex` filter pattern; matching is case-insensitive like every
/// other string comparison in the protocol.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unsupported sort direction `{other}`")),
        }
    }
}

/// The closed set of filter operators understood by the data protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Like,
    Keywords,
    Starts,
    Ends,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Regex,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 12] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Like,
        FilterOperator::Keywords,
        FilterOperator::Starts,
        FilterOperator::Ends,
        FilterOperator::Lt,
        FilterOperator::Le,
        FilterOperator::Gt,
        FilterOperator::Ge,
        FilterOperator::In,
        FilterOperator::Regex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::Like => "like",
            FilterOperator::Keywords => "keywords",
            FilterOperator::Starts => "starts",
            FilterOperator::Ends => "ends",
            FilterOperator::Lt => "<",
            FilterOperator::Le => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::Ge => ">=",
            FilterOperator::In => "in",
            FilterOperator::Regex => "regex",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FilterOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == value)
            .ok_or_else(|| format!("unsupported filter operator `{value}`"))
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Single(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Set members for `in`: list items as given, or a comma separated
    /// single value. Blank members are dropped.
    pub fn members(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            FilterValue::Single(value) => value.split(',').collect(),
            FilterValue::List(values) => values.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The scalar form; lists are joined with commas.
    pub fn text(&self) -> String {
        match self {
            FilterValue::Single(value) => value.clone(),
            FilterValue::List(values) => values.join(","),
        }
    }
}

impl Default for FilterValue {
    fn default() -> Self {
        FilterValue::Single(String::new())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Single(value.to_string())
    }
}

/// A sort entry as received; the handler validates field and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRequest {
    pub field: String,
    pub dir: String,
}

impl SortRequest {
    pub fn new(field: impl Into<String>, dir: SortDirection) -> Self {
        Self {
            field: field.into(),
            dir: dir.as_str().to_string(),
        }
    }
}

/// A filter entry as received; the handler validates field and operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    pub field: String,
    pub operator: String,
    pub value: FilterValue,
}

impl FilterRequest {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator: operator.as_str().to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub page: i64,
    pub page_size: i64,
    pub sort: Vec<SortRequest>,
    pub filter: Vec<FilterRequest>,
}

impl QueryRequest {
    pub fn page(page: i64, page_size: i64) -> Self {
        Self {
            page,
            page_size,
            sort: Vec::new(),
            filter: Vec::new(),
        }
    }

    pub fn sorted_by(mut self, field: impl Into<String>, dir: SortDirection) -> Self {
        self.sort.push(SortRequest::new(field, dir));
        self
    }

    pub fn filtered_by(
        mut self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.filter
            .push(FilterRequest::new(field, operator, value.into()));
        self
    }
}
