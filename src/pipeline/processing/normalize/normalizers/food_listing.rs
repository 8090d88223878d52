use super::base::EntityNormalizer;
use crate::constants::columns;
use crate::domain::{EntityKind, FoodListing};
use crate::pipeline::ingestion::RawRow;
use crate::pipeline::processing::normalize::fields::FieldReader;
use crate::pipeline::processing::normalize::Normalized;

/// Normalizer for rows of the food listings file
#[derive(Debug, Default, Clone, Copy)]
pub struct FoodListingNormalizer;

impl EntityNormalizer for FoodListingNormalizer {
    type Record = FoodListing;

    fn kind(&self) -> EntityKind {
        EntityKind::FoodListing
    }

    fn normalize(&self, row: &RawRow) -> Normalized<FoodListing> {
        let mut fields = FieldReader::new(row);

        let record = FoodListing {
            food_id: fields.id(columns::FOOD_ID),
            food_name: fields.text(columns::FOOD_NAME),
            quantity: fields.quantity(columns::QUANTITY),
            expiry_date: fields.date(columns::EXPIRY_DATE),
            provider_id: fields.reference(columns::PROVIDER_ID),
            provider_type: fields.text(columns::PROVIDER_TYPE),
            location: fields.text(columns::LOCATION),
            food_type: fields.text(columns::FOOD_TYPE),
            meal_type: fields.text(columns::MEAL_TYPE),
        };

        Normalized {
            record,
            issues: fields.finish(),
        }
    }
}
