use super::base::EntityNormalizer;
use crate::constants::columns;
use crate::domain::{Claim, EntityKind};
use crate::pipeline::ingestion::RawRow;
use crate::pipeline::processing::normalize::fields::FieldReader;
use crate::pipeline::processing::normalize::Normalized;

/// Normalizer for rows of the claims file
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaimNormalizer;

impl EntityNormalizer for ClaimNormalizer {
    type Record = Claim;

    fn kind(&self) -> EntityKind {
        EntityKind::Claim
    }

    fn normalize(&self, row: &RawRow) -> Normalized<Claim> {
        let mut fields = FieldReader::new(row);

        let record = Claim {
            claim_id: fields.id(columns::CLAIM_ID),
            food_id: fields.reference(columns::FOOD_ID),
            receiver_id: fields.reference(columns::RECEIVER_ID),
            status: fields.status(columns::STATUS),
            timestamp: fields.date(columns::TIMESTAMP),
        };

        Normalized {
            record,
            issues: fields.finish(),
        }
    }
}
