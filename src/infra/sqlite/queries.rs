use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rusqlite::types::{Value, ValueRef};
use tracing::debug;

use crate::config::TableBinding;
use crate::domain::entities::column::FieldPath;
use crate::domain::entities::page::Record;
use crate::domain::entities::query::{FilterOperator, SortDirection};
use crate::infra::sqlite::schema::{open_connection, UNICASE};
use crate::usecase::ports::collection::{FilterClause, QueryPlan};

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn relation_alias(relation: &str) -> String {
    quote_ident(&format!("rel_{relation}"))
}

fn field_expr(field: &FieldPath) -> String {
    match field {
        FieldPath::Local(column) => format!("base.{}", quote_ident(column)),
        FieldPath::Related { relation, field } => {
            format!("{}.{}", relation_alias(relation), quote_ident(field))
        }
    }
}

/// Lowercases `text` and escapes `%`, `_` and `\` so user text only ever
/// matches literally. Pair it with `casefold()` on the column side.
fn like_pattern(text: &str, leading: bool, trailing: bool) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    if leading {
        pattern.push('%');
    }
    for ch in text.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    if trailing {
        pattern.push('%');
    }
    pattern
}

fn from_sql(binding: &TableBinding, plan: &QueryPlan) -> Result<String> {
    let mut sql = format!("FROM {} base", quote_ident(&binding.table));
    for relation in &plan.joins {
        let target = binding
            .relations
            .get(relation)
            .ok_or_else(|| anyhow!("relation `{relation}` is not bound to a table"))?;
        let alias = relation_alias(relation);
        sql.push_str(&format!(
            " LEFT JOIN {} {alias} ON {alias}.{} = base.{}",
            quote_ident(&target.table),
            quote_ident(&target.references),
            quote_ident(&target.foreign_key),
        ));
    }
    Ok(sql)
}

fn filter_sql(filter: &FilterClause, params: &mut Vec<Value>) -> Option<String> {
    let expr = field_expr(&filter.field);
    let text = filter.value.text();
    let like = |pattern: String, params: &mut Vec<Value>| {
        params.push(Value::Text(pattern));
        format!("casefold({expr}) LIKE ? ESCAPE '\\'")
    };

    let clause = match filter.operator {
        FilterOperator::Eq => {
            params.push(Value::Text(text));
            format!("{expr} = ? COLLATE {UNICASE}")
        }
        FilterOperator::Ne => {
            params.push(Value::Text(text));
            format!("({expr} IS NULL OR {expr} <> ? COLLATE {UNICASE})")
        }
        FilterOperator::Like => like(like_pattern(&text, true, true), params),
        FilterOperator::Starts => like(like_pattern(&text, false, true), params),
        FilterOperator::Ends => like(like_pattern(&text, true, false), params),
        FilterOperator::Keywords => {
            let terms: Vec<String> = text
                .split_whitespace()
                .map(|term| like(like_pattern(term, true, true), params))
                .collect();
            if terms.is_empty() {
                return None;
            }
            terms.join(" AND ")
        }
        FilterOperator::Lt | FilterOperator::Le | FilterOperator::Gt | FilterOperator::Ge => {
            params.push(Value::Text(text));
            format!("{expr} {} ? COLLATE {UNICASE}", filter.operator.as_str())
        }
        FilterOperator::In => {
            let members = filter.value.members();
            if members.is_empty() {
                return Some("0".to_string());
            }
            let placeholders = std::iter::repeat_n("?", members.len())
                .collect::<Vec<_>>()
                .join(", ");
            params.extend(members.into_iter().map(Value::Text));
            format!("{expr} COLLATE {UNICASE} IN ({placeholders})")
        }
        FilterOperator::Regex => {
            params.push(Value::Text(text));
            format!("regexp(?, {expr})")
        }
    };
    Some(clause)
}

fn where_sql(plan: &QueryPlan, params: &mut Vec<Value>) -> String {
    let clauses: Vec<String> = plan
        .filters
        .iter()
        .filter_map(|filter| filter_sql(filter, params))
        .collect();
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

fn order_sql(binding: &TableBinding, plan: &QueryPlan) -> String {
    let mut terms: Vec<String> = plan
        .sort
        .iter()
        .map(|clause| {
            let direction = match clause.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!("{} COLLATE {UNICASE} {direction}", field_expr(&clause.field))
        })
        .collect();
    terms.push(format!("base.{} ASC", quote_ident(&binding.primary_key)));
    format!(" ORDER BY {}", terms.join(", "))
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(number) => serde_json::Value::from(number),
        ValueRef::Real(number) => serde_json::Number::from_f64(number)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

pub fn count_records(db_path: &Path, binding: &TableBinding, plan: &QueryPlan) -> Result<u64> {
    let mut params = Vec::<Value>::new();
    let sql = format!(
        "SELECT COUNT(*) {}{}",
        from_sql(binding, plan)?,
        where_sql(plan, &mut params)
    );
    debug!(%sql, "counting grid records");

    let conn = open_connection(db_path)?;
    let total: i64 = conn
        .query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))
        .context("failed to query filtered row count")?;
    Ok(total.max(0) as u64)
}

pub fn fetch_records(
    db_path: &Path,
    binding: &TableBinding,
    plan: &QueryPlan,
    offset: u64,
    limit: u64,
) -> Result<Vec<Record>> {
    if plan.select.is_empty() {
        anyhow::bail!("query selects no fields")
    }

    let select = plan
        .select
        .iter()
        .map(field_expr)
        .collect::<Vec<_>>()
        .join(", ");
    let mut params = Vec::<Value>::new();
    let from = from_sql(binding, plan)?;
    let filters = where_sql(plan, &mut params);
    let sql = format!(
        "SELECT {select} {from}{filters}{} LIMIT ? OFFSET ?",
        order_sql(binding, plan)
    );
    params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    params.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));
    debug!(%sql, offset, limit, "fetching grid records");

    let conn = open_connection(db_path)?;
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare page query")?;
    let records = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            let mut record = Record::new();
            for (idx, field) in plan.select.iter().enumerate() {
                record.insert(field, json_value(row.get_ref(idx)?));
            }
            Ok(record)
        })
        .context("failed to query page")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect page rows")?;

    Ok(records)
}
