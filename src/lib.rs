//! Normalizes the food donation datasets (providers, receivers, food
//! listings, claims) and rebuilds the relational store the dashboard reads.

pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod storage;

pub use config::{Config, ReferencePolicy};
pub use error::{EtlError, Result};
pub use pipeline::{Pipeline, RunSummary};
pub use storage::Store;
