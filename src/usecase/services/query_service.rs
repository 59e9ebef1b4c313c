use std::sync::Arc;

use tracing::debug;

use crate::domain::entities::column::ColumnSet;
use crate::domain::entities::page::{total_pages, ResultPage, RowData};
use crate::domain::entities::query::{
    compile_pattern, FilterOperator, QueryRequest, SortDirection,
};
use crate::domain::error::GridError;
use crate::usecase::ports::collection::{
    FilterClause, QueryPlan, RecordCollection, SortClause, ViewPolicy,
};

/// Serves pages of one grid: validates each request against the column
/// allow-list, runs it against the collection and projects the visible rows.
pub struct QueryService {
    columns: ColumnSet,
    collection: Arc<dyn RecordCollection>,
    policy: Arc<dyn ViewPolicy>,
    max_page_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl QueryService {
    pub fn new(
        columns: ColumnSet,
        collection: Arc<dyn RecordCollection>,
        policy: Arc<dyn ViewPolicy>,
        max_page_size: u64,
    ) -> Self {
        Self {
            columns,
            collection,
            policy,
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }

    pub fn handle(&self, request: &QueryRequest) -> Result<ResultPage, GridError> {
        let window = self.window(request)?;
        let plan = self.plan(request)?;

        let total_rows = self.collection.count(&plan)?;
        let records = if window.offset >= total_rows {
            Vec::new()
        } else {
            self.collection.fetch(&plan, window.offset, window.limit)?
        };

        let fetched = records.len();
        let rows: Vec<RowData> = records
            .iter()
            .filter(|record| self.policy.can_view(record))
            .map(|record| record.project(&self.columns))
            .collect();
        if rows.len() < fetched {
            debug!(hidden = fetched - rows.len(), "records hidden by view policy");
        }

        debug!(
            page = request.page,
            page_size = window.limit,
            total_rows,
            rows = rows.len(),
            "served grid page"
        );

        Ok(ResultPage {
            rows,
            total_rows,
            total_pages: total_pages(total_rows, window.limit),
        })
    }

    /// Checks `page` and `page_size` and turns them into an offset window.
    pub fn window(&self, request: &QueryRequest) -> Result<PageWindow, GridError> {
        if request.page < 1 {
            return Err(GridError::InvalidRequest(format!(
                "page must be at least 1, got {}",
                request.page
            )));
        }
        if request.page_size < 1 || request.page_size as u64 > self.max_page_size {
            return Err(GridError::InvalidRequest(format!(
                "page size must be between 1 and {}, got {}",
                self.max_page_size, request.page_size
            )));
        }

        let offset = (request.page - 1)
            .checked_mul(request.page_size)
            .ok_or_else(|| {
                GridError::InvalidRequest(format!("page {} is out of range", request.page))
            })?;

        Ok(PageWindow {
            offset: offset as u64,
            limit: request.page_size as u64,
        })
    }

    /// Validates sort and filter entries against the allow-list. Nothing is
    /// queried unless every entry passes.
    pub fn plan(&self, request: &QueryRequest) -> Result<QueryPlan, GridError> {
        let mut plan = QueryPlan::default();
        for column in self.columns.iter() {
            plan.select_field(&column.path);
        }
        for field in self.policy.required_fields() {
            plan.select_field(&field);
        }

        for entry in &request.sort {
            let column = self
                .columns
                .get(&entry.field)
                .filter(|column| column.spec.sortable)
                .ok_or_else(|| {
                    GridError::InvalidSortField(format!(
                        "`{}` is not a sortable column",
                        entry.field
                    ))
                })?;
            let direction = entry
                .dir
                .parse::<SortDirection>()
                .map_err(|err| GridError::InvalidSortField(format!("{}: {err}", entry.field)))?;

            plan.require_join(&column.path);
            plan.sort.push(SortClause {
                field: column.path.clone(),
                direction,
            });
        }

        for entry in &request.filter {
            let column = self
                .columns
                .get(&entry.field)
                .filter(|column| column.spec.filterable)
                .ok_or_else(|| {
                    GridError::InvalidFilterField(format!(
                        "`{}` is not a filterable column",
                        entry.field
                    ))
                })?;
            let operator = entry
                .operator
                .parse::<FilterOperator>()
                .map_err(GridError::InvalidOperator)?;

            if operator == FilterOperator::Regex {
                compile_pattern(&entry.value.text()).map_err(|err| {
                    GridError::InvalidRequest(format!(
                        "invalid pattern for `{}`: {err}",
                        entry.field
                    ))
                })?;
            }

            plan.require_join(&column.path);
            plan.filters.push(FilterClause {
                field: column.path.clone(),
                operator,
                value: entry.value.clone(),
            });
        }

        Ok(plan)
    }
}
