use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::domain::entities::column::{ColumnSet, FieldPath};

/// One projected row as it travels over the wire.
pub type RowData = Map<String, Value>;

/// A raw record from a collection, keyed by field path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &FieldPath, value: Value) {
        self.values.insert(path.to_string(), value);
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        self.values.get(&path.to_string())
    }

    /// Keeps only the configured columns; related fields are nested under
    /// their relation name.
    pub fn project(&self, columns: &ColumnSet) -> RowData {
        let mut row = RowData::new();
        for column in columns.iter() {
            let value = self.get(&column.path).cloned().unwrap_or(Value::Null);
            match &column.path {
                FieldPath::Local(field) => {
                    row.insert(field.clone(), value);
                }
                FieldPath::Related { relation, field } => {
                    let nested = row
                        .entry(relation.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(nested) = nested {
                        nested.insert(field.clone(), value);
                    }
                }
            }
        }
        row
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub rows: Vec<RowData>,
    pub total_rows: u64,
    pub total_pages: u64,
}

impl ResultPage {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total_rows: 0,
            total_pages: 0,
        }
    }
}

pub fn total_pages(total_rows: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_rows.div_ceil(page_size)
}

/// Looks a field up in a projected row, following relation nesting.
pub fn row_value<'a>(row: &'a RowData, path: &FieldPath) -> Option<&'a Value> {
    match path {
        FieldPath::Local(field) => row.get(field),
        FieldPath::Related { relation, field } => row
            .get(relation)
            .and_then(Value::as_object)
            .and_then(|nested| nested.get(field)),
    }
}

/// Renders a scalar value for display or comparison.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::entities::column::ColumnSpec;

    #[test]
    fn projection_nests_related_fields_and_drops_extras() {
        let columns = ColumnSet::new(vec![
            ColumnSpec::new("Title"),
            ColumnSpec::new("Author.Name"),
            ColumnSpec::new("Author.Country"),
        ])
        .expect("columns should build");

        let mut record = Record::new();
        record.insert(&FieldPath::Local("Title".into()), json!("Dune"));
        record.insert(&FieldPath::Local("Status".into()), json!("ACTIVE"));
        record.insert(
            &FieldPath::Related {
                relation: "Author".into(),
                field: "Name".into(),
            },
            json!("Frank Herbert"),
        );

        let row = record.project(&columns);

        assert_eq!(
            Value::Object(row),
            json!({
                "Title": "Dune",
                "Author": {"Name": "Frank Herbert", "Country": null}
            })
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(5, 2), 3);
        assert_eq!(total_pages(4, 2), 2);
        assert_eq!(total_pages(0, 10), 0);
    }
}
