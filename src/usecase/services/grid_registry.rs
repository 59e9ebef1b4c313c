use std::collections::BTreeMap;

use crate::domain::entities::grid::GridDefinition;
use crate::domain::entities::page::ResultPage;
use crate::domain::entities::query::QueryRequest;
use crate::domain::error::GridError;
use crate::protocol::wire::{parse_query, WireLimits, WirePage};
use crate::usecase::services::query_service::QueryService;

struct RegisteredGrid {
    definition: GridDefinition,
    service: QueryService,
}

/// All grids served by one process, by name.
#[derive(Default)]
pub struct GridRegistry {
    grids: BTreeMap<String, RegisteredGrid>,
}

impl GridRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        definition: GridDefinition,
        service: QueryService,
    ) -> Result<(), GridError> {
        if self.grids.contains_key(&definition.name) {
            return Err(GridError::Config(format!(
                "grid `{}` is registered twice",
                definition.name
            )));
        }
        self.grids.insert(
            definition.name.clone(),
            RegisteredGrid {
                definition,
                service,
            },
        );
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.grids.keys().cloned().collect()
    }

    fn grid(&self, name: &str) -> Result<&RegisteredGrid, GridError> {
        self.grids
            .get(name)
            .ok_or_else(|| GridError::UnknownGrid(name.to_string()))
    }

    pub fn definition(&self, name: &str) -> Result<&GridDefinition, GridError> {
        Ok(&self.grid(name)?.definition)
    }

    pub fn handle(&self, name: &str, request: &QueryRequest) -> Result<ResultPage, GridError> {
        self.grid(name)?.service.handle(request)
    }

    /// Runs one data-protocol call given its raw query string.
    pub fn handle_query_string(&self, name: &str, query: &str) -> Result<WirePage, GridError> {
        let grid = self.grid(name)?;
        let limits = WireLimits {
            default_page_size: grid.definition.options.page_size,
            max_page_size: grid.definition.options.max_page_size,
        };
        let request = parse_query(query, limits)?;
        grid.service.handle(&request).map(WirePage::from)
    }
}
