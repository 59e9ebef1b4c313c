pub mod grid_registry;
pub mod import_service;
pub mod query_service;
pub mod view_policy;
