//! Company lookups against the sec-api.io ticker mapping endpoint, throttled
//! and retried through `sluice`.

pub mod client;
pub mod config;
pub mod types;

pub use client::EdgarClient;
pub use config::EdgarConfig;
pub use types::{CompanyData, MappingRecord};
