use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::processing::validate::Violation;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to read CSV '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to replace store at '{}': {source}", .path.display())]
    StoreReplace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation failed with {} violation(s): {}", .0.len(), summarize(.0))]
    Validation(Vec<Violation>),

    #[error("Foreign key check failed after load: {}", .0.join("; "))]
    ConstraintViolation(Vec<String>),
}

fn summarize(violations: &[Violation]) -> String {
    const SHOWN: usize = 5;
    let mut parts: Vec<String> = violations.iter().take(SHOWN).map(|v| v.to_string()).collect();
    if violations.len() > SHOWN {
        parts.push(format!("... and {} more", violations.len() - SHOWN));
    }
    parts.join("; ")
}

pub type Result<T> = std::result::Result<T, EtlError>;
