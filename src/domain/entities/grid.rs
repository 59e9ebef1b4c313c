use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::entities::column::ColumnSpec;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    #[default]
    FitData,
    FitColumns,
    FitDataFill,
    FitDataStretch,
    FitDataTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsiveMode {
    Hide,
    Collapse,
}

/// A row identifier as written in configuration: `1` and `"1"` are the same
/// row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdValue::Number(number) => write!(f, "{number}"),
            IdValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrozenRowsSetting {
    Enabled(bool),
    Count(usize),
    Ids(Vec<IdValue>),
}

impl Default for FrozenRowsSetting {
    fn default() -> Self {
        FrozenRowsSetting::Enabled(false)
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_index() -> String {
    "id".to_string()
}

/// Construction-time behaviour shared by the server and the grid widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOptions {
    #[serde(default)]
    pub layout: LayoutMode,
    #[serde(default)]
    pub responsive_layout: Option<ResponsiveMode>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default)]
    pub frozen_rows: FrozenRowsSetting,
    #[serde(default)]
    pub reactive_data: bool,
    #[serde(default = "default_true")]
    pub auto_resize: bool,
    /// Row field used as the row identity on the client.
    #[serde(default = "default_index")]
    pub index: String,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            layout: LayoutMode::default(),
            responsive_layout: None,
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            frozen_rows: FrozenRowsSetting::default(),
            reactive_data: false,
            auto_resize: true,
            index: default_index(),
        }
    }
}

/// What a client needs to configure itself for a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDefinition {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(flatten)]
    pub options: GridOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        frozen_rows: FrozenRowsSetting,
    }

    #[test]
    fn frozen_rows_accepts_bool_count_and_ids() {
        let parsed: Holder = serde_json::from_str(r#"{"frozen_rows": true}"#).expect("bool");
        assert_eq!(parsed.frozen_rows, FrozenRowsSetting::Enabled(true));

        let parsed: Holder = serde_json::from_str(r#"{"frozen_rows": 3}"#).expect("count");
        assert_eq!(parsed.frozen_rows, FrozenRowsSetting::Count(3));

        let parsed: Holder = serde_json::from_str(r#"{"frozen_rows": [4, "a-7"]}"#).expect("ids");
        assert_eq!(
            parsed.frozen_rows,
            FrozenRowsSetting::Ids(vec![IdValue::Number(4), IdValue::Text("a-7".into())])
        );
    }

    #[test]
    fn layout_modes_use_kebab_case() {
        let layout: LayoutMode = serde_json::from_str(r#""fit-data-stretch""#).expect("layout");
        assert_eq!(layout, LayoutMode::FitDataStretch);
    }
}
