use std::path::PathBuf;

use crate::config::TableBinding;
use crate::domain::entities::page::Record;
use crate::infra::sqlite::queries::{count_records, fetch_records};
use crate::usecase::ports::collection::{QueryPlan, RecordCollection, RepoError};

/// A grid's records in one SQLite table, plus its declared relations.
pub struct SqliteCollection {
    pub db_path: PathBuf,
    pub binding: TableBinding,
}

impl SqliteCollection {
    pub fn new(db_path: impl Into<PathBuf>, binding: TableBinding) -> Self {
        Self {
            db_path: db_path.into(),
            binding,
        }
    }
}

impl RecordCollection for SqliteCollection {
    fn count(&self, plan: &QueryPlan) -> Result<u64, RepoError> {
        count_records(&self.db_path, &self.binding, plan).map_err(RepoError::from)
    }

    fn fetch(&self, plan: &QueryPlan, offset: u64, limit: u64) -> Result<Vec<Record>, RepoError> {
        fetch_records(&self.db_path, &self.binding, plan, offset, limit).map_err(RepoError::from)
    }
}
