pub mod column;
pub mod grid;
pub mod page;
pub mod query;
