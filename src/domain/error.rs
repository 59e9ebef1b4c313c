use thiserror::Error;

use crate::usecase::ports::collection::RepoError;

/// Everything that can abort a grid request.
///
/// Per-record view denials are not errors: those rows are dropped from the
/// page instead.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid sort field: {0}")]
    InvalidSortField(String),

    #[error("invalid filter field: {0}")]
    InvalidFilterField(String),

    #[error("invalid filter operator: {0}")]
    InvalidOperator(String),

    #[error("unknown grid: {0}")]
    UnknownGrid(String),

    #[error("invalid grid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepoError),
}

impl GridError {
    /// Stable machine-readable kind used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            GridError::InvalidRequest(_) => "invalid_request",
            GridError::InvalidSortField(_) => "invalid_sort_field",
            GridError::InvalidFilterField(_) => "invalid_filter_field",
            GridError::InvalidOperator(_) => "invalid_operator",
            GridError::UnknownGrid(_) => "unknown_grid",
            GridError::Config(_) => "config",
            GridError::Storage(_) => "storage",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GridError::InvalidRequest(_)
                | GridError::InvalidSortField(_)
                | GridError::InvalidFilterField(_)
                | GridError::InvalidOperator(_)
                | GridError::UnknownGrid(_)
        )
    }
}
