use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::params_from_iter;
use rusqlite::types::Value;

use crate::domain::entities::column::is_identifier;
use crate::infra::sqlite::queries::quote_ident;
use crate::infra::sqlite::schema::{ensure_parent_dir, open_connection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub table: String,
    pub columns: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    pub row_count: i64,
}

/// Storage class picked for an imported column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    /// INTEGER when every non-blank value is an integer, REAL when every one
    /// is a finite number, TEXT otherwise. A column with only blanks is TEXT.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut kind = None;
        for value in values.into_iter().map(str::trim).filter(|v| !v.is_empty()) {
            let this = if value.parse::<i64>().is_ok() {
                ColumnKind::Integer
            } else if value.parse::<f64>().is_ok_and(f64::is_finite) {
                ColumnKind::Real
            } else {
                return ColumnKind::Text;
            };
            kind = Some(match (kind, this) {
                (None | Some(ColumnKind::Integer), ColumnKind::Integer) => ColumnKind::Integer,
                _ => ColumnKind::Real,
            });
        }
        kind.unwrap_or(ColumnKind::Text)
    }

    fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }

    /// Blank cells in numeric columns are stored as NULL.
    fn bind(self, raw: &str) -> Value {
        let trimmed = raw.trim();
        match self {
            ColumnKind::Text => Value::Text(raw.to_string()),
            _ if trimmed.is_empty() => Value::Null,
            ColumnKind::Integer => trimmed
                .parse()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            ColumnKind::Real => trimmed
                .parse()
                .map(Value::Real)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
        }
    }
}

/// Loads a CSV file into a new table named `table`. Each column is typed
/// from its values (see [`ColumnKind::infer`]); an `id` key column is added
/// unless the file has one.
pub fn import_csv_to_sqlite(db_path: &Path, csv_path: &Path, table: &str) -> Result<ImportResult> {
    if !is_identifier(table) {
        anyhow::bail!("table name `{table}` is not a plain identifier")
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open csv: {}", csv_path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read headers from csv: {}", csv_path.display()))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    if headers.is_empty() {
        anyhow::bail!("csv header is required")
    }
    if let Some(bad) = headers.iter().find(|header| !is_identifier(header)) {
        anyhow::bail!("csv header `{bad}` is not a plain identifier")
    }

    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to parse csv record")?;
    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|col_idx| {
            ColumnKind::infer(records.iter().map(|record| record.get(col_idx).unwrap_or("")))
        })
        .collect();

    let has_id = headers.iter().any(|header| header == "id");
    let mut column_defs = Vec::with_capacity(headers.len() + 1);
    if !has_id {
        column_defs.push("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string());
    }
    column_defs.extend(
        headers
            .iter()
            .zip(&kinds)
            .map(|(header, kind)| format!("{} {}", quote_ident(header), kind.sql_type())),
    );

    ensure_parent_dir(db_path)?;
    let mut conn = open_connection(db_path)?;
    let tx = conn.transaction().context("failed to start transaction")?;

    tx.execute(
        &format!(
            "CREATE TABLE {} ({})",
            quote_ident(table),
            column_defs.join(", ")
        ),
        [],
    )
    .with_context(|| format!("failed to create table `{table}`"))?;

    let placeholders = std::iter::repeat_n("?", headers.len())
        .collect::<Vec<_>>()
        .join(", ");
    let column_list = headers
        .iter()
        .map(|header| quote_ident(header))
        .collect::<Vec<_>>()
        .join(", ");
    let mut insert_row = tx
        .prepare(&format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            quote_ident(table)
        ))
        .context("failed to prepare row insert")?;

    let mut row_count = 0_i64;
    for record in &records {
        let values = kinds
            .iter()
            .enumerate()
            .map(|(col_idx, kind)| kind.bind(record.get(col_idx).unwrap_or("")));
        insert_row
            .execute(params_from_iter(values))
            .context("failed to insert row")?;
        row_count += 1;
    }
    drop(insert_row);

    tx.commit().context("failed to commit import transaction")?;

    Ok(ImportResult {
        table: table.to_string(),
        columns: headers,
        kinds,
        row_count,
    })
}
