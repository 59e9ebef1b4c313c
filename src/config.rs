//! Grid declarations and runtime settings.
//!
//! Grids are declared in a TOML file:
//!
//! ```toml
//! bind = "127.0.0.1:8080"
//!
//! [[grids]]
//! name = "books"
//! page_size = 10
//! responsive_layout = "collapse"
//!
//! [grids.source]
//! table = "books"
//!
//! [grids.source.relations.Author]
//! table = "authors"
//! foreign_key = "author_id"
//!
//! [[grids.columns]]
//! field = "Title"
//! filterable = true
//!
//! [[grids.columns]]
//! field = "Author.Name"
//! title = "Author"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::entities::column::{is_identifier, ColumnSet, ColumnSpec, FieldPath};
use crate::domain::entities::grid::{
    FrozenRowsSetting, GridDefinition, GridOptions, LayoutMode, ResponsiveMode,
};
use crate::domain::error::GridError;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

fn default_key() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationBinding {
    pub table: String,
    /// Column of the base table holding the related row's key.
    pub foreign_key: String,
    #[serde(default = "default_key")]
    pub references: String,
}

/// Where a grid's records live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBinding {
    pub table: String,
    #[serde(default = "default_key")]
    pub primary_key: String,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationBinding>,
}

impl TableBinding {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: default_key(),
            relations: BTreeMap::new(),
        }
    }

    pub fn relation(
        mut self,
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations.insert(
            name.into(),
            RelationBinding {
                table: table.into(),
                foreign_key: foreign_key.into(),
                references: default_key(),
            },
        );
        self
    }

    fn validate(&self) -> Result<(), GridError> {
        let mut names = vec![self.table.as_str(), self.primary_key.as_str()];
        for (name, relation) in &self.relations {
            names.extend([
                name.as_str(),
                relation.table.as_str(),
                relation.foreign_key.as_str(),
                relation.references.as_str(),
            ]);
        }
        match names.into_iter().find(|name| !is_identifier(name)) {
            Some(bad) => Err(GridError::Config(format!(
                "`{bad}` is not a valid table or column name"
            ))),
            None => Ok(()),
        }
    }
}

/// Rows whose `field` holds one of `hidden_values` are not shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    pub field: String,
    pub hidden_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub name: String,
    pub source: TableBinding,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub visibility: Option<VisibilityConfig>,
    #[serde(flatten)]
    pub options: GridOptions,
}

impl GridConfig {
    /// Checks the declaration and resolves its columns.
    pub fn column_set(&self) -> Result<ColumnSet, GridError> {
        self.source.validate()?;
        let columns = ColumnSet::new(self.columns.clone())?;
        for column in columns.iter() {
            if let Some(relation) = column.path.relation() {
                if !self.source.relations.contains_key(relation) {
                    return Err(GridError::Config(format!(
                        "grid `{}`: column `{}` uses undeclared relation `{relation}`",
                        self.name, column.spec.field
                    )));
                }
            }
        }
        if let Some(visibility) = &self.visibility {
            let path = FieldPath::parse(&visibility.field)?;
            if let Some(relation) = path.relation() {
                if !self.source.relations.contains_key(relation) {
                    return Err(GridError::Config(format!(
                        "grid `{}`: visibility field uses undeclared relation `{relation}`",
                        self.name
                    )));
                }
            }
        }
        if self.options.page_size == 0 || self.options.page_size > self.options.max_page_size {
            return Err(GridError::Config(format!(
                "grid `{}`: page_size must be between 1 and max_page_size ({})",
                self.name, self.options.max_page_size
            )));
        }
        Ok(columns)
    }

    pub fn definition(&self) -> GridDefinition {
        GridDefinition {
            name: self.name.clone(),
            columns: self.columns.clone(),
            options: self.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridsConfig {
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub grids: Vec<GridConfig>,
}

impl GridsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("failed to load config: {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: GridsConfig = toml::from_str(text).context("invalid config syntax")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grids.is_empty() {
            return Err(anyhow!("config declares no grids"));
        }
        let mut names = HashSet::new();
        for grid in &self.grids {
            if !names.insert(grid.name.as_str()) {
                return Err(anyhow!("duplicate grid name `{}`", grid.name));
            }
            grid.column_set()?;
        }
        Ok(())
    }

    /// The built-in `books` grid over the seeded demo tables.
    pub fn demo() -> Self {
        let books = GridConfig {
            name: "books".to_string(),
            source: TableBinding::new("books").relation("Author", "authors", "author_id"),
            columns: vec![
                ColumnSpec::new("id").title("#").width(60).responsive(0),
                ColumnSpec::new("Title")
                    .filterable(true)
                    .editable(true)
                    .width(260)
                    .responsive(0),
                ColumnSpec::new("Author.Name")
                    .title("Author")
                    .filterable(true)
                    .width(200),
                ColumnSpec::new("Status").filterable(true).width(110).responsive(2),
                ColumnSpec::new("Year").filterable(true).width(80).responsive(3),
                ColumnSpec::new("Price").filterable(true).width(90).responsive(4),
                ColumnSpec::new("Author.Country")
                    .title("Country")
                    .sortable(false)
                    .width(160)
                    .responsive(5),
            ],
            visibility: Some(VisibilityConfig {
                field: "Status".to_string(),
                hidden_values: vec!["ARCHIVED".to_string()],
            }),
            options: GridOptions {
                layout: LayoutMode::FitColumns,
                responsive_layout: Some(ResponsiveMode::Collapse),
                page_size: 5,
                frozen_rows: FrozenRowsSetting::Enabled(false),
                ..GridOptions::default()
            },
        };

        Self {
            database: None,
            bind: None,
            grids: vec![books],
        }
    }

    pub fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "gridbridge", "grid-bridge")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().join("grids.sqlite"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("grids.toml"))
}

/// WebView profile directory for the desktop viewer, created on demand.
pub fn default_webview_dir() -> Result<PathBuf> {
    let dir = project_dirs()?.data_local_dir().join("webview");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create webview dir: {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
bind = "0.0.0.0:9000"

[[grids]]
name = "books"
page_size = 10
layout = "fit-columns"
responsive_layout = "hide"
frozen_rows = [1, 3]

[grids.source]
table = "books"

[grids.source.relations.Author]
table = "authors"
foreign_key = "author_id"

[[grids.columns]]
field = "Title"
filterable = true

[[grids.columns]]
field = "Author.Name"
title = "Author"
sortable = false
"#;

    #[test]
    fn parses_toml_grid_declarations() {
        let config = GridsConfig::parse(SAMPLE).expect("config should parse");
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");

        let grid = &config.grids[0];
        assert_eq!(grid.options.page_size, 10);
        assert_eq!(grid.options.max_page_size, 100);
        assert_eq!(grid.options.layout, LayoutMode::FitColumns);
        assert_eq!(grid.options.responsive_layout, Some(ResponsiveMode::Hide));
        assert!(grid.options.auto_resize);
        assert_eq!(grid.source.primary_key, "id");
        assert_eq!(grid.source.relations["Author"].references, "id");
        assert!(!grid.columns[1].sortable);
        assert_eq!(grid.columns[0].title, "");
    }

    #[test]
    fn rejects_columns_on_undeclared_relations() {
        let text = SAMPLE.replace("field = \"Author.Name\"", "field = \"Publisher.Name\"");
        let err = GridsConfig::parse(&text).expect_err("undeclared relation should fail");
        assert!(format!("{err:#}").contains("undeclared relation `Publisher`"));
    }

    #[test]
    fn rejects_table_names_that_are_not_identifiers() {
        let text = SAMPLE.replace("table = \"books\"", "table = \"books; --\"");
        let err = GridsConfig::parse(&text).expect_err("bad table name should fail");
        assert!(format!("{err:#}").contains("not a valid table or column name"));
    }

    #[test]
    fn demo_config_is_valid() {
        GridsConfig::demo()
            .validate()
            .expect("demo config should validate");
    }
}
