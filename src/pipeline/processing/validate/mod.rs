//! Staging validation: every primary and foreign key constraint of the store
//! is checked in one pass over the normalized tables before anything is
//! written, producing a single aggregated list of violations.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{info, instrument, warn};

use crate::config::ReferencePolicy;
use crate::domain::EntityKind;
use crate::error::{EtlError, Result};
use crate::pipeline::processing::normalize::NormalizedTables;

/// A constraint the staged rows would break once loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Identity absent after coercion
    MissingPrimaryKey { table: EntityKind, row: usize },
    /// Identity already used by an earlier row
    DuplicatePrimaryKey {
        table: EntityKind,
        row: usize,
        id: i64,
        first_row: usize,
    },
    /// Foreign key pointing at no row of the referenced table
    DanglingReference {
        table: EntityKind,
        row: usize,
        column: &'static str,
        value: i64,
        references: EntityKind,
    },
}

impl Violation {
    pub fn table(&self) -> EntityKind {
        match self {
            Violation::MissingPrimaryKey { table, .. }
            | Violation::DuplicatePrimaryKey { table, .. }
            | Violation::DanglingReference { table, .. } => *table,
        }
    }

    /// Key violations always abort; dangling references depend on the policy
    pub fn is_fatal(&self, policy: ReferencePolicy) -> bool {
        match self {
            Violation::MissingPrimaryKey { .. } | Violation::DuplicatePrimaryKey { .. } => true,
            Violation::DanglingReference { .. } => policy == ReferencePolicy::Strict,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Violation::MissingPrimaryKey { .. } => "missing_primary_key",
            Violation::DuplicatePrimaryKey { .. } => "duplicate_primary_key",
            Violation::DanglingReference { .. } => "dangling_reference",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingPrimaryKey { table, row } => {
                write!(f, "{} row {}: missing {}", table, row, table.id_column())
            }
            Violation::DuplicatePrimaryKey {
                table,
                row,
                id,
                first_row,
            } => write!(
                f,
                "{} row {}: duplicate {} {} (first seen at row {})",
                table,
                row,
                table.id_column(),
                id,
                first_row
            ),
            Violation::DanglingReference {
                table,
                row,
                column,
                value,
                references,
            } => write!(
                f,
                "{} row {}: {} {} not found in {}",
                table, row, column, value, references
            ),
        }
    }
}

/// Outcome of the validation pass
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub policy: ReferencePolicy,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.is_fatal(self.policy))
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| !v.is_fatal(self.policy))
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal().next().is_some()
    }

    /// Fail with every fatal violation at once, or hand the report back
    pub fn into_result(self) -> Result<Self> {
        let fatal: Vec<Violation> = self.fatal().cloned().collect();
        if fatal.is_empty() {
            Ok(self)
        } else {
            Err(EtlError::Validation(fatal))
        }
    }
}

/// Collects identities of one table while flagging missing and duplicate keys
fn check_keys(
    table: EntityKind,
    ids: impl Iterator<Item = Option<i64>>,
    violations: &mut Vec<Violation>,
) -> HashSet<i64> {
    let mut first_seen: HashMap<i64, usize> = HashMap::new();

    for (i, id) in ids.enumerate() {
        let row = i + 1;
        match id {
            None => violations.push(Violation::MissingPrimaryKey { table, row }),
            Some(id) => {
                if let Some(&first_row) = first_seen.get(&id) {
                    violations.push(Violation::DuplicatePrimaryKey {
                        table,
                        row,
                        id,
                        first_row,
                    });
                } else {
                    first_seen.insert(id, row);
                }
            }
        }
    }

    first_seen.into_keys().collect()
}

fn check_references(
    table: EntityKind,
    column: &'static str,
    references: EntityKind,
    values: impl Iterator<Item = Option<i64>>,
    known: &HashSet<i64>,
    violations: &mut Vec<Violation>,
) {
    for (i, value) in values.enumerate() {
        if let Some(value) = value {
            if !known.contains(&value) {
                violations.push(Violation::DanglingReference {
                    table,
                    row: i + 1,
                    column,
                    value,
                    references,
                });
            }
        }
    }
}

/// Check primary-key presence and uniqueness for all four tables and every
/// foreign key against the staged rows of the table it references.
#[instrument(skip(tables))]
pub fn validate(tables: &NormalizedTables, policy: ReferencePolicy) -> ValidationReport {
    let mut violations = Vec::new();

    let provider_ids = check_keys(
        EntityKind::Provider,
        tables.providers.iter().map(|p| p.provider_id),
        &mut violations,
    );
    let receiver_ids = check_keys(
        EntityKind::Receiver,
        tables.receivers.iter().map(|r| r.receiver_id),
        &mut violations,
    );
    let food_ids = check_keys(
        EntityKind::FoodListing,
        tables.food_listings.iter().map(|f| f.food_id),
        &mut violations,
    );
    check_keys(
        EntityKind::Claim,
        tables.claims.iter().map(|c| c.claim_id),
        &mut violations,
    );

    check_references(
        EntityKind::FoodListing,
        "Provider_ID",
        EntityKind::Provider,
        tables.food_listings.iter().map(|f| f.provider_id),
        &provider_ids,
        &mut violations,
    );
    check_references(
        EntityKind::Claim,
        "Food_ID",
        EntityKind::FoodListing,
        tables.claims.iter().map(|c| c.food_id),
        &food_ids,
        &mut violations,
    );
    check_references(
        EntityKind::Claim,
        "Receiver_ID",
        EntityKind::Receiver,
        tables.claims.iter().map(|c| c.receiver_id),
        &receiver_ids,
        &mut violations,
    );

    for violation in &violations {
        metrics::counter!("etl_violations_total", "table" => violation.table().table(), "kind" => violation.label())
            .increment(1);
    }

    let report = ValidationReport { policy, violations };
    for warning in report.warnings() {
        warn!("Loading despite violation: {}", warning);
    }
    info!(
        violations = report.violations.len(),
        fatal = report.fatal().count(),
        "Validation complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Claim, FoodListing, Provider, Receiver};

    fn provider(id: Option<i64>) -> Provider {
        Provider {
            provider_id: id,
            name: "P".to_string(),
            provider_type: String::new(),
            address: String::new(),
            city: String::new(),
            contact: None,
        }
    }

    fn receiver(id: i64) -> Receiver {
        Receiver {
            receiver_id: Some(id),
            name: "R".to_string(),
            receiver_type: String::new(),
            city: String::new(),
            contact: None,
        }
    }

    fn listing(id: i64, provider_id: Option<i64>) -> FoodListing {
        FoodListing {
            food_id: Some(id),
            food_name: "F".to_string(),
            quantity: 1,
            expiry_date: None,
            provider_id,
            provider_type: String::new(),
            location: String::new(),
            food_type: String::new(),
            meal_type: String::new(),
        }
    }

    fn claim(id: i64, food_id: Option<i64>, receiver_id: Option<i64>) -> Claim {
        Claim {
            claim_id: Some(id),
            food_id,
            receiver_id,
            status: "Pending".to_string(),
            timestamp: None,
        }
    }

    fn consistent() -> NormalizedTables {
        NormalizedTables {
            providers: vec![provider(Some(1)), provider(Some(2))],
            receivers: vec![receiver(10)],
            food_listings: vec![listing(100, Some(1)), listing(101, None)],
            claims: vec![claim(1000, Some(100), Some(10)), claim(1001, Some(101), None)],
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_consistent_tables_are_clean() {
        let report = validate(&consistent(), ReferencePolicy::Strict);
        assert!(report.is_clean());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_all_violations_are_aggregated() {
        let mut tables = consistent();
        tables.providers.push(provider(None));
        tables.providers.push(provider(Some(2)));
        tables.food_listings.push(listing(102, Some(99)));
        tables.claims.push(claim(1002, Some(555), Some(77)));

        let report = validate(&tables, ReferencePolicy::Strict);

        assert_eq!(report.violations.len(), 5);
        assert!(report.violations.contains(&Violation::MissingPrimaryKey {
            table: EntityKind::Provider,
            row: 3
        }));
        assert!(report.violations.contains(&Violation::DuplicatePrimaryKey {
            table: EntityKind::Provider,
            row: 4,
            id: 2,
            first_row: 2
        }));
        assert!(report.violations.contains(&Violation::DanglingReference {
            table: EntityKind::Claim,
            row: 3,
            column: "Receiver_ID",
            value: 77,
            references: EntityKind::Receiver
        }));

        match report.into_result() {
            Err(EtlError::Validation(v)) => assert_eq!(v.len(), 5),
            other => panic!("expected validation error, got {:?}", other.map(|r| r.violations)),
        }
    }

    #[test]
    fn test_permissive_policy_only_fails_on_keys() {
        let mut tables = consistent();
        tables.food_listings.push(listing(102, Some(99)));

        let report = validate(&tables, ReferencePolicy::Permissive);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.warnings().count(), 1);
        assert!(!report.has_fatal());
        assert!(report.into_result().is_ok());

        tables.claims.push(claim(1000, None, None));
        let report = validate(&tables, ReferencePolicy::Permissive);
        assert!(report.has_fatal());
    }
}
