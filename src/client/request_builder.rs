use tracing::{debug, warn};

use crate::client::transport::TransportError;
use crate::domain::entities::page::{ResultPage, RowData};
use crate::domain::entities::query::{
    FilterOperator, FilterRequest, FilterValue, QueryRequest, SortDirection, SortRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    /// The last request failed; the previous rows are still shown.
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub token: RequestToken,
    pub query: QueryRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer request was issued after this one; the result was dropped.
    Stale,
}

/// Client-side page state for one remote grid.
///
/// Every change issues a new [`PendingRequest`]; only the newest token's
/// result is applied.
#[derive(Debug)]
pub struct GridRequestBuilder {
    default_page_size: i64,
    page: i64,
    page_size: i64,
    sort: Vec<SortRequest>,
    filter: Vec<FilterRequest>,
    state: LoadState,
    issued: u64,
    current: Option<RequestToken>,
    rows: Vec<RowData>,
    total_rows: u64,
    last_page: u64,
}

impl GridRequestBuilder {
    pub fn new(page_size: u32) -> Self {
        let page_size = i64::from(page_size.max(1));
        Self {
            default_page_size: page_size,
            page: 1,
            page_size,
            sort: Vec::new(),
            filter: Vec::new(),
            state: LoadState::Idle,
            issued: 0,
            current: None,
            rows: Vec::new(),
            total_rows: 0,
            last_page: 0,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn rows(&self) -> &[RowData] {
        &self.rows
    }

    /// Loaded rows for local edits that bypass the server.
    pub(crate) fn rows_mut(&mut self) -> &mut Vec<RowData> {
        &mut self.rows
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn last_page(&self) -> u64 {
        self.last_page
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn sort(&self) -> &[SortRequest] {
        &self.sort
    }

    pub fn filters(&self) -> &[FilterRequest] {
        &self.filter
    }

    /// Direction of `field` if it is the primary sort.
    pub fn sort_direction(&self, field: &str) -> Option<SortDirection> {
        self.sort
            .first()
            .filter(|sort| sort.field == field)
            .and_then(|sort| sort.dir.parse().ok())
    }

    pub fn query(&self) -> QueryRequest {
        QueryRequest {
            page: self.page,
            page_size: self.page_size,
            sort: self.sort.clone(),
            filter: self.filter.clone(),
        }
    }

    pub fn set_page(&mut self, page: i64) -> PendingRequest {
        self.page = page.max(1);
        self.issue()
    }

    pub fn set_page_size(&mut self, size: i64) -> PendingRequest {
        self.page_size = size.max(1);
        self.page = 1;
        self.issue()
    }

    /// Header click: unsorted becomes ascending, then the direction flips.
    /// The clicked column becomes the only sort.
    pub fn toggle_sort(&mut self, field: &str) -> PendingRequest {
        let dir = self
            .sort_direction(field)
            .map_or(SortDirection::Asc, SortDirection::flipped);
        self.set_sort(vec![SortRequest::new(field, dir)])
    }

    pub fn set_sort(&mut self, sort: Vec<SortRequest>) -> PendingRequest {
        self.sort = sort;
        self.page = 1;
        self.issue()
    }

    /// Sets the filter for `field`, replacing any earlier one on it.
    pub fn set_filter(
        &mut self,
        field: &str,
        operator: FilterOperator,
        value: FilterValue,
    ) -> PendingRequest {
        let filter = FilterRequest::new(field, operator, value);
        match self.filter.iter_mut().find(|existing| existing.field == field) {
            Some(existing) => *existing = filter,
            None => self.filter.push(filter),
        }
        self.page = 1;
        self.issue()
    }

    pub fn clear_filter(&mut self, field: &str) -> PendingRequest {
        self.filter.retain(|filter| filter.field != field);
        self.page = 1;
        self.issue()
    }

    /// Re-issues the current state unchanged.
    pub fn refresh(&mut self) -> PendingRequest {
        self.issue()
    }

    /// Back to the first page with no sort or filter.
    pub fn reload(&mut self) -> PendingRequest {
        self.page = 1;
        self.page_size = self.default_page_size;
        self.sort.clear();
        self.filter.clear();
        self.issue()
    }

    /// Forgets the in-flight request so its result will be stale.
    pub fn cancel(&mut self) {
        if self.current.take().is_some() && self.is_loading() {
            self.state = LoadState::Idle;
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current == Some(token)
    }

    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<ResultPage, TransportError>,
    ) -> Completion {
        if !self.is_current(token) {
            debug!(token = token.0, "discarding stale response");
            return Completion::Stale;
        }
        self.current = None;

        match result {
            Ok(page) => {
                debug!(
                    token = token.0,
                    rows = page.rows.len(),
                    total = page.total_rows,
                    "page loaded"
                );
                self.rows = page.rows;
                self.total_rows = page.total_rows;
                self.last_page = page.total_pages;
                self.state = LoadState::Idle;
            }
            Err(err) => {
                warn!(token = token.0, error = %err, "page request failed");
                self.state = LoadState::Error(err.to_string());
            }
        }
        Completion::Applied
    }

    fn issue(&mut self) -> PendingRequest {
        self.issued += 1;
        let token = RequestToken(self.issued);
        self.current = Some(token);
        self.state = LoadState::Loading;
        debug!(token = token.0, page = self.page, size = self.page_size, "page requested");
        PendingRequest {
            token,
            query: self.query(),
        }
    }
}
