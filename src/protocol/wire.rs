//! Query-string request and JSON response encoding of the data protocol.
//!
//! Requests look like
//! `page=2&size=20&sort[0][field]=Name&sort[0][dir]=asc&filter[0][field]=Status&filter[0][type]==&filter[0][value]=ACTIVE`;
//! responses are `{"last_row": n, "last_page": n, "data": [...]}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::domain::entities::page::{ResultPage, RowData};
use crate::domain::entities::query::{
    FilterRequest, FilterValue, QueryRequest, SortDirection, SortRequest,
};
use crate::domain::error::GridError;

/// Highest accepted `sort[i]` / `filter[i]` index.
pub const MAX_CLAUSE_INDEX: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePage {
    pub last_row: u64,
    pub last_page: u64,
    pub data: Vec<RowData>,
}

impl From<ResultPage> for WirePage {
    fn from(page: ResultPage) -> Self {
        Self {
            last_row: page.total_rows,
            last_page: page.total_pages,
            data: page.rows,
        }
    }
}

impl From<WirePage> for ResultPage {
    fn from(page: WirePage) -> Self {
        Self {
            rows: page.data,
            total_rows: page.last_row,
            total_pages: page.last_page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub error: String,
    pub message: String,
}

impl From<&GridError> for WireError {
    fn from(err: &GridError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// HTTP status an error is reported with.
pub fn status_code(err: &GridError) -> u16 {
    match err {
        GridError::UnknownGrid(_) => 404,
        err if err.is_client_error() => 400,
        _ => 500,
    }
}

#[derive(Debug, Default)]
struct PartialSort {
    field: Option<String>,
    dir: Option<String>,
}

#[derive(Debug, Default)]
struct PartialFilter {
    field: Option<String>,
    operator: Option<String>,
    value: Option<String>,
    list: Vec<String>,
}

enum ParamKey<'a> {
    Page,
    Size,
    Sort { index: usize, part: &'a str },
    Filter { index: usize, part: &'a str, list: bool },
    Other,
}

fn malformed(key: &str) -> GridError {
    GridError::InvalidRequest(format!("malformed parameter `{key}`"))
}

fn bracket_parts(rest: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut remaining = rest;
    while !remaining.is_empty() {
        let inner = remaining.strip_prefix('[')?;
        let end = inner.find(']')?;
        parts.push(&inner[..end]);
        remaining = &inner[end + 1..];
    }
    Some(parts)
}

fn clause_index(key: &str, raw: &str) -> Result<usize, GridError> {
    let index: usize = raw.parse().map_err(|_| malformed(key))?;
    if index > MAX_CLAUSE_INDEX {
        return Err(GridError::InvalidRequest(format!(
            "parameter `{key}` exceeds the limit of {} clauses",
            MAX_CLAUSE_INDEX + 1
        )));
    }
    Ok(index)
}

fn clause_suffix<'a>(key: &'a str, name: &str) -> Option<&'a str> {
    key.strip_prefix(name)
        .filter(|rest| rest.is_empty() || rest.starts_with('['))
}

fn parse_key(key: &str) -> Result<ParamKey<'_>, GridError> {
    match key {
        "page" => return Ok(ParamKey::Page),
        "size" => return Ok(ParamKey::Size),
        _ => {}
    }

    if let Some(rest) = clause_suffix(key, "sort") {
        let parts = bracket_parts(rest).ok_or_else(|| malformed(key))?;
        return match parts.as_slice() {
            [index, part @ ("field" | "dir")] => Ok(ParamKey::Sort {
                index: clause_index(key, index)?,
                part: *part,
            }),
            _ => Err(malformed(key)),
        };
    }

    if let Some(rest) = clause_suffix(key, "filter") {
        let parts = bracket_parts(rest).ok_or_else(|| malformed(key))?;
        return match parts.as_slice() {
            [index, part @ ("field" | "type" | "value")] => Ok(ParamKey::Filter {
                index: clause_index(key, index)?,
                part: *part,
                list: false,
            }),
            [index, "value", item] if item.is_empty() || item.parse::<usize>().is_ok() => {
                Ok(ParamKey::Filter {
                    index: clause_index(key, index)?,
                    part: "value",
                    list: true,
                })
            }
            _ => Err(malformed(key)),
        };
    }

    Ok(ParamKey::Other)
}

fn parse_number(name: &str, value: &str) -> Result<i64, GridError> {
    value.trim().parse().map_err(|_| {
        GridError::InvalidRequest(format!("`{name}` must be an integer, got `{value}`"))
    })
}

/// Parses a request query string. Oversized `size` values are clamped to
/// `limits.max_page_size`; everything else is left for the handler to
/// validate.
pub fn parse_query(query: &str, limits: WireLimits) -> Result<QueryRequest, GridError> {
    let mut page = 1_i64;
    let mut page_size = i64::from(limits.default_page_size);
    let mut sorts = BTreeMap::<usize, PartialSort>::new();
    let mut filters = BTreeMap::<usize, PartialFilter>::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match parse_key(&key)? {
            ParamKey::Page => page = parse_number("page", &value)?,
            ParamKey::Size => page_size = parse_number("size", &value)?,
            ParamKey::Sort { index, part } => {
                let entry = sorts.entry(index).or_default();
                match part {
                    "field" => entry.field = Some(value.into_owned()),
                    _ => entry.dir = Some(value.into_owned()),
                }
            }
            ParamKey::Filter { index, part, list } => {
                let entry = filters.entry(index).or_default();
                match (part, list) {
                    ("field", _) => entry.field = Some(value.into_owned()),
                    ("type", _) => entry.operator = Some(value.into_owned()),
                    (_, true) => entry.list.push(value.into_owned()),
                    _ => entry.value = Some(value.into_owned()),
                }
            }
            ParamKey::Other => {}
        }
    }

    page_size = page_size.min(i64::from(limits.max_page_size));

    let sort = sorts
        .into_iter()
        .map(|(index, entry)| {
            let field = entry.field.ok_or_else(|| {
                GridError::InvalidRequest(format!("sort[{index}] is missing a field"))
            })?;
            Ok(SortRequest {
                field,
                dir: entry
                    .dir
                    .unwrap_or_else(|| SortDirection::Asc.as_str().to_string()),
            })
        })
        .collect::<Result<Vec<_>, GridError>>()?;

    let filter = filters
        .into_iter()
        .map(|(index, entry)| {
            let field = entry.field.ok_or_else(|| {
                GridError::InvalidRequest(format!("filter[{index}] is missing a field"))
            })?;
            let operator = entry.operator.ok_or_else(|| {
                GridError::InvalidRequest(format!("filter[{index}] is missing a type"))
            })?;
            let value = if entry.list.is_empty() {
                FilterValue::Single(entry.value.unwrap_or_default())
            } else {
                FilterValue::List(entry.list)
            };
            Ok(FilterRequest {
                field,
                operator,
                value,
            })
        })
        .collect::<Result<Vec<_>, GridError>>()?;

    Ok(QueryRequest {
        page,
        page_size,
        sort,
        filter,
    })
}

pub fn encode_query(request: &QueryRequest) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("page", &request.page.to_string());
    serializer.append_pair("size", &request.page_size.to_string());

    for (index, entry) in request.sort.iter().enumerate() {
        serializer.append_pair(&format!("sort[{index}][field]"), &entry.field);
        serializer.append_pair(&format!("sort[{index}][dir]"), &entry.dir);
    }

    for (index, entry) in request.filter.iter().enumerate() {
        serializer.append_pair(&format!("filter[{index}][field]"), &entry.field);
        serializer.append_pair(&format!("filter[{index}][type]"), &entry.operator);
        match &entry.value {
            FilterValue::Single(value) => {
                serializer.append_pair(&format!("filter[{index}][value]"), value);
            }
            FilterValue::List(values) => {
                for value in values {
                    serializer.append_pair(&format!("filter[{index}][value][]"), value);
                }
            }
        }
    }

    serializer.finish()
}
