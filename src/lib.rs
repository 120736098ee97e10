//! Portfolio analytics dashboard core: fetches holdings, allocation and
//! performance from the backend, derives metrics and drives the holdings table.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod metrics;
pub mod models;
pub mod report;
pub mod summary;
pub mod table;
pub mod utils;
