use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::GridsConfig;
use crate::domain::entities::column::FieldPath;
use crate::domain::error::GridError;
use crate::infra::sqlite::repo::SqliteCollection;
use crate::usecase::ports::collection::ViewPolicy;
use crate::usecase::services::grid_registry::GridRegistry;
use crate::usecase::services::query_service::QueryService;
use crate::usecase::services::view_policy::{AllowAll, HiddenValues};

/// Wires every configured grid to its SQLite table.
pub fn build_registry(config: &GridsConfig, db_path: &Path) -> Result<GridRegistry, GridError> {
    let mut registry = GridRegistry::new();
    for grid in &config.grids {
        let columns = grid.column_set()?;
        let policy: Arc<dyn ViewPolicy> = match &grid.visibility {
            Some(visibility) => Arc::new(HiddenValues::new(
                FieldPath::parse(&visibility.field)?,
                visibility.hidden_values.clone(),
            )),
            None => Arc::new(AllowAll),
        };
        let collection = Arc::new(SqliteCollection::new(db_path, grid.source.clone()));
        let service = QueryService::new(
            columns,
            collection,
            policy,
            u64::from(grid.options.max_page_size),
        );
        registry.register(grid.definition(), service)?;
        info!(grid = %grid.name, table = %grid.source.table, "registered grid");
    }
    Ok(registry)
}
