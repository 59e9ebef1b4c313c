use crate::domain::entities::column::FieldPath;
use crate::domain::entities::page::Record;
use crate::domain::entities::query::{FilterOperator, FilterValue, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    Message(String),
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoError::Message(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<anyhow::Error> for RepoError {
    fn from(err: anyhow::Error) -> Self {
        RepoError::Message(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub field: FieldPath,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub field: FieldPath,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

/// A fully validated query. Every field in it comes from the grid's column
/// allow-list or its view policy, never from request text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    /// Relation names to join, each at most once, in first-use order.
    pub joins: Vec<String>,
    pub select: Vec<FieldPath>,
    pub filters: Vec<FilterClause>,
    pub sort: Vec<SortClause>,
}

impl QueryPlan {
    pub fn require_join(&mut self, field: &FieldPath) {
        if let Some(relation) = field.relation() {
            if !self.joins.iter().any(|joined| joined == relation) {
                self.joins.push(relation.to_string());
            }
        }
    }

    pub fn select_field(&mut self, field: &FieldPath) {
        if !self.select.contains(field) {
            self.require_join(field);
            self.select.push(field.clone());
        }
    }
}

/// An ordered, filterable, countable source of records.
pub trait RecordCollection: Send + Sync {
    /// Number of records matching the plan's filters.
    fn count(&self, plan: &QueryPlan) -> Result<u64, RepoError>;

    /// The `limit` records starting at `offset` in the plan's order.
    fn fetch(&self, plan: &QueryPlan, offset: u64, limit: u64) -> Result<Vec<Record>, RepoError>;
}

/// Per-record visibility check applied after pagination.
pub trait ViewPolicy: Send + Sync {
    fn can_view(&self, record: &Record) -> bool;

    /// Fields the policy reads, fetched alongside the columns.
    fn required_fields(&self) -> Vec<FieldPath> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_are_deduplicated_by_relation_name() {
        let mut plan = QueryPlan::default();
        let name = FieldPath::parse("Author.Name").expect("path");
        let country = FieldPath::parse("Author.Country").expect("path");
        let title = FieldPath::parse("Title").expect("path");

        plan.select_field(&name);
        plan.select_field(&title);
        plan.require_join(&country);
        plan.require_join(&name);

        assert_eq!(plan.joins, vec!["Author".to_string()]);
        assert_eq!(plan.select, vec![name, title]);
    }
}
