//! Remote data grids over SQLite: a query-string data protocol served over
//! HTTP, and the client-side state that drives a paged grid against it.

pub mod client;
pub mod config;
pub mod domain;
pub mod infra;
pub mod protocol;
pub mod usecase;

#[cfg(feature = "desktop")]
pub mod platform;
#[cfg(feature = "desktop")]
pub mod ui;
