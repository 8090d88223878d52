use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::EntityKind;
use crate::error::Result;
use crate::pipeline::ingestion::{self, RawTables};
use crate::pipeline::processing::normalize::{self, NormalizedTables, RowIssues};
use crate::pipeline::processing::validate::{self, ValidationReport, Violation};
use crate::storage::{self, Store};

/// Rows per table at one point of the run
#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: EntityKind,
    pub rows: usize,
}

fn counts(pairs: Vec<(EntityKind, usize)>) -> Vec<TableCount> {
    pairs
        .into_iter()
        .map(|(table, rows)| TableCount { table, rows })
        .collect()
}

/// Result of a pipeline run, serializable as the run report
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_rows: Vec<TableCount>,
    pub loaded_rows: Vec<TableCount>,
    pub issue_counts: BTreeMap<&'static str, usize>,
    pub row_issues: Vec<RowIssues>,
    pub violations: Vec<Violation>,
    pub store_path: Option<PathBuf>,
    pub store_digest: Option<String>,
}

impl RunSummary {
    fn new(run_id: Uuid, started_at: DateTime<Utc>, raw: &RawTables, staged: &Staged) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            input_rows: counts(raw.row_counts()),
            loaded_rows: Vec::new(),
            issue_counts: staged.tables.issue_counts(),
            row_issues: staged.tables.issues.clone(),
            violations: staged.report.violations.clone(),
            store_path: None,
            store_digest: None,
        }
    }
}

/// Normalized tables that passed through validation, not yet written anywhere
pub struct Staged {
    pub tables: NormalizedTables,
    pub report: ValidationReport,
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Normalize and validate already-read raw tables
    pub fn stage(&self, raw: &RawTables) -> Staged {
        let tables = normalize::normalize_tables(raw);
        let report = validate::validate(&tables, self.config.validation.reference_policy);
        Staged { tables, report }
    }

    fn read_and_stage(&self) -> Result<(RawTables, Staged)> {
        let raw = ingestion::read_inputs(&self.config.inputs)?;
        for (kind, rows) in raw.row_counts() {
            println!("{} rows: {}", kind, rows);
        }
        let staged = self.stage(&raw);
        Ok((raw, staged))
    }

    /// Read, normalize and validate without touching the store.
    /// Fatal violations are returned in the summary rather than as an error.
    pub fn check(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("check", run_id = %run_id);
        let _enter = span.enter();
        let started_at = Utc::now();

        let (raw, staged) = self.read_and_stage()?;
        Ok(RunSummary::new(run_id, started_at, &raw, &staged))
    }

    /// Full rebuild: read the inputs, normalize, validate, then destroy and
    /// recreate the store. The caller owns the returned handle.
    pub fn rebuild(&self) -> Result<(Store, RunSummary)> {
        let run_id = Uuid::new_v4();
        let span = info_span!("rebuild", run_id = %run_id);
        let _enter = span.enter();
        let started_at = Utc::now();
        let timer = Instant::now();
        metrics::counter!("etl_runs_total").increment(1);

        let (raw, staged) = self.read_and_stage()?;
        let mut summary = RunSummary::new(run_id, started_at, &raw, &staged);

        // Nothing is destroyed unless the staged rows are loadable
        let report = staged.report.into_result()?;
        let store_path = &self.config.store.path;
        let store = storage::rebuild(store_path, &staged.tables, report.policy)?;

        summary.loaded_rows = counts(store.row_counts()?);
        summary.store_path = Some(store_path.clone());
        summary.store_digest = Some(store.content_digest()?);
        summary.finished_at = Utc::now();

        let elapsed = timer.elapsed().as_secs_f64();
        metrics::histogram!("etl_run_duration_seconds").record(elapsed);
        info!(
            store = %store_path.display(),
            duration_secs = elapsed,
            "Store rebuilt"
        );

        Ok((store, summary))
    }
}
