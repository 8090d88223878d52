// Data processing pipeline: ingestion, normalization, validation, and the orchestrator that loads the store

pub mod ingestion;
pub mod orchestrator;
pub mod processing;

// Re-export key types for the binary and integration tests
pub use orchestrator::{Pipeline, RunSummary, Staged, TableCount};
