pub mod http;
pub mod import;
pub mod registry;
pub mod sqlite;
