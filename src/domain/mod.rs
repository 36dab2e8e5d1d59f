//! Core domain types and the reconciliation pipeline.

pub mod aggregate;
pub mod category;
pub mod config_validation;
pub mod currency;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod firm_lookup;
pub mod holdings;
pub mod loader;
pub mod period;
pub mod ranking;
pub mod record;
pub mod schema;
pub mod territory;
