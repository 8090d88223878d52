use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, instrument, warn};

pub mod fields;
pub mod normalizers;

pub use normalizers::{
    ClaimNormalizer, EntityNormalizer, FoodListingNormalizer, ProviderNormalizer, ReceiverNormalizer,
};

use crate::domain::{Claim, EntityKind, FoodListing, Provider, Receiver};
use crate::pipeline::ingestion::{RawTable, RawTables};

/// A fallback taken while normalizing one field of one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldIssue {
    /// The source has no such column; the field took its empty/absent default
    MissingColumn { column: &'static str },
    /// Identity could not be coerced to an integer. Fatal at validation.
    InvalidId { column: &'static str, value: String },
    /// Foreign key present but not an integer; stored as absent
    InvalidReference { column: &'static str, value: String },
    /// Contact present but without a single digit; stored as absent
    InvalidContact { column: &'static str, value: String },
    /// Quantity absent or non-numeric; stored as 0
    InvalidQuantity { value: Option<String> },
    /// Quantity below zero; stored as 0
    NegativeQuantity { value: String },
    /// Date present but unreadable; stored as absent
    UnparseableDate { column: &'static str, value: String },
    /// Status absent; stored as `Pending`
    DefaultedStatus,
    /// Status outside the known labels; kept verbatim
    UnknownStatus { value: String },
}

impl FieldIssue {
    /// Stable label used for tallies and metrics
    pub fn label(&self) -> &'static str {
        match self {
            FieldIssue::MissingColumn { .. } => "missing_column",
            FieldIssue::InvalidId { .. } => "invalid_id",
            FieldIssue::InvalidReference { .. } => "invalid_reference",
            FieldIssue::InvalidContact { .. } => "invalid_contact",
            FieldIssue::InvalidQuantity { .. } => "invalid_quantity",
            FieldIssue::NegativeQuantity { .. } => "negative_quantity",
            FieldIssue::UnparseableDate { .. } => "unparseable_date",
            FieldIssue::DefaultedStatus => "defaulted_status",
            FieldIssue::UnknownStatus { .. } => "unknown_status",
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::MissingColumn { column } => write!(f, "missing column '{}'", column),
            FieldIssue::InvalidId { column, value } => {
                write!(f, "invalid identity '{}' in {}", value, column)
            }
            FieldIssue::InvalidReference { column, value } => {
                write!(f, "invalid reference '{}' in {}", value, column)
            }
            FieldIssue::InvalidContact { column, value } => {
                write!(f, "no digits in contact '{}' ({})", value, column)
            }
            FieldIssue::InvalidQuantity { value: Some(v) } => {
                write!(f, "non-numeric quantity '{}', using 0", v)
            }
            FieldIssue::InvalidQuantity { value: None } => write!(f, "missing quantity, using 0"),
            FieldIssue::NegativeQuantity { value } => {
                write!(f, "negative quantity '{}', using 0", value)
            }
            FieldIssue::UnparseableDate { column, value } => {
                write!(f, "unparseable date '{}' in {}", value, column)
            }
            FieldIssue::DefaultedStatus => write!(f, "missing status, using Pending"),
            FieldIssue::UnknownStatus { value } => write!(f, "unknown status '{}'", value),
        }
    }
}

/// The fallbacks taken for one row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldIssues(Vec<FieldIssue>);

impl FieldIssues {
    pub fn push(&mut self, issue: FieldIssue) {
        self.0.push(issue);
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldIssue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the row's identity failed coercion
    pub fn has_invalid_id(&self) -> bool {
        self.0.iter().any(|i| matches!(i, FieldIssue::InvalidId { .. }))
    }
}

impl fmt::Display for FieldIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}

/// A normalized record together with the fallbacks taken to produce it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized<T> {
    pub record: T,
    pub issues: FieldIssues,
}

impl<T> Normalized<T> {
    /// `Err` only when the identity failed; every other fallback is soft
    pub fn into_result(self) -> Result<T, FieldIssues> {
        if self.issues.has_invalid_id() {
            Err(self.issues)
        } else {
            Ok(self.record)
        }
    }
}

/// Issues for one source row, kept for the run report
#[derive(Debug, Clone, Serialize)]
pub struct RowIssues {
    pub table: EntityKind,
    pub row_number: usize,
    pub issues: FieldIssues,
}

/// The four normalized tables, ready for staging and load
#[derive(Debug, Clone, Default)]
pub struct NormalizedTables {
    pub providers: Vec<Provider>,
    pub receivers: Vec<Receiver>,
    pub food_listings: Vec<FoodListing>,
    pub claims: Vec<Claim>,
    pub issues: Vec<RowIssues>,
}

impl NormalizedTables {
    pub fn row_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Provider => self.providers.len(),
            EntityKind::Receiver => self.receivers.len(),
            EntityKind::FoodListing => self.food_listings.len(),
            EntityKind::Claim => self.claims.len(),
        }
    }

    /// Count of each issue label across all tables
    pub fn issue_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.issues {
            for issue in row.issues.iter() {
                *counts.entry(issue.label()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Normalize every row of one raw table, keeping row order
pub fn normalize_table<N: EntityNormalizer>(
    normalizer: &N,
    table: &RawTable,
    issues: &mut Vec<RowIssues>,
) -> Vec<N::Record> {
    let kind = normalizer.kind();
    let mut records = Vec::with_capacity(table.len());

    for row in &table.rows {
        let Normalized { record, issues: row_issues } = normalizer.normalize(row);
        if !row_issues.is_empty() {
            debug!(table = %kind, row = row.row_number, "Field fallbacks: {}", row_issues);
            for issue in row_issues.iter() {
                metrics::counter!("etl_field_issues_total", "table" => kind.table(), "issue" => issue.label())
                    .increment(1);
            }
            issues.push(RowIssues {
                table: kind,
                row_number: row.row_number,
                issues: row_issues,
            });
        }
        records.push(record);
    }

    records
}

/// Normalize all four raw tables
#[instrument(skip_all)]
pub fn normalize_tables(raw: &RawTables) -> NormalizedTables {
    let mut issues = Vec::new();

    let providers = normalize_table(&ProviderNormalizer, &raw.providers, &mut issues);
    let receivers = normalize_table(&ReceiverNormalizer, &raw.receivers, &mut issues);
    let food_listings = normalize_table(&FoodListingNormalizer, &raw.food_listings, &mut issues);
    let claims = normalize_table(&ClaimNormalizer, &raw.claims, &mut issues);

    let tables = NormalizedTables {
        providers,
        receivers,
        food_listings,
        claims,
        issues,
    };

    let affected = tables.issues.len();
    if affected > 0 {
        warn!("{} row(s) needed field fallbacks during normalization", affected);
    }
    info!(
        providers = tables.providers.len(),
        receivers = tables.receivers.len(),
        food_listings = tables.food_listings.len(),
        claims = tables.claims.len(),
        "Normalization complete"
    );

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tables_tallies_issues() {
        let raw = RawTables {
            providers: RawTable::from_reader(
                "Provider_ID,Name,Type,Address,City,Contact\n1,Acme,Restaurant,1 Main St,Springfield,N/A\n"
                    .as_bytes(),
            )
            .unwrap(),
            receivers: RawTable::from_reader("Receiver_ID,Name,Type,City,Contact\n".as_bytes()).unwrap(),
            food_listings: RawTable::from_reader(
                "Food_ID,Food_Name,Quantity,Expiry_Date,Provider_ID,Provider_Type,Location,Food_Type,Meal_Type\n\
                 5,Bread,ten,2024-03-15,1,Restaurant,Springfield,Vegetarian,Breakfast\n"
                    .as_bytes(),
            )
            .unwrap(),
            claims: RawTable::from_reader("Claim_ID,Food_ID,Receiver_ID,Status,Timestamp\n".as_bytes())
                .unwrap(),
        };

        let tables = normalize_tables(&raw);

        assert_eq!(tables.row_count(EntityKind::Provider), 1);
        assert_eq!(tables.row_count(EntityKind::FoodListing), 1);
        assert_eq!(tables.food_listings[0].quantity, 0);
        assert_eq!(tables.providers[0].contact, None);

        let counts = tables.issue_counts();
        assert_eq!(counts.get("invalid_contact"), Some(&1));
        assert_eq!(counts.get("invalid_quantity"), Some(&1));
        assert_eq!(tables.issues.len(), 2);
    }

    #[test]
    fn test_into_result_fails_only_on_identity() {
        let mut soft = FieldIssues::default();
        soft.push(FieldIssue::DefaultedStatus);
        assert_eq!(Normalized { record: 1, issues: soft }.into_result(), Ok(1));

        let mut hard = FieldIssues::default();
        hard.push(FieldIssue::InvalidId {
            column: "claim_id",
            value: "x".to_string(),
        });
        assert!(Normalized { record: 1, issues: hard }.into_result().is_err());
    }
}
