use super::base::EntityNormalizer;
use crate::constants::columns;
use crate::domain::{EntityKind, Provider};
use crate::pipeline::ingestion::RawRow;
use crate::pipeline::processing::normalize::fields::FieldReader;
use crate::pipeline::processing::normalize::Normalized;

/// Normalizer for rows of the providers file
#[derive(Debug, Default, Clone, Copy)]
pub struct ProviderNormalizer;

impl EntityNormalizer for ProviderNormalizer {
    type Record = Provider;

    fn kind(&self) -> EntityKind {
        EntityKind::Provider
    }

    fn normalize(&self, row: &RawRow) -> Normalized<Provider> {
        let mut fields = FieldReader::new(row);

        let record = Provider {
            provider_id: fields.id(columns::PROVIDER_ID),
            name: fields.text(columns::NAME),
            provider_type: fields.text(columns::TYPE),
            address: fields.text(columns::ADDRESS),
            city: fields.text(columns::CITY),
            contact: fields.phone(columns::CONTACT),
        };

        Normalized {
            record,
            issues: fields.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::FieldIssue;

    #[test]
    fn test_clean_provider_row() {
        let row = RawRow::from_pairs(
            1,
            [
                ("Provider_ID", "17"),
                ("Name", "  Gonzales Bakery "),
                ("Type", "Restaurant"),
                ("Address", "74347 Christopher Extensions"),
                ("City", "New Jessica"),
                ("Contact", "+1-600-220-0480x3"),
            ],
        );

        let normalized = ProviderNormalizer.normalize(&row);
        assert!(normalized.issues.is_empty());
        assert_eq!(
            normalized.record,
            Provider {
                provider_id: Some(17),
                name: "Gonzales Bakery".to_string(),
                provider_type: "Restaurant".to_string(),
                address: "74347 Christopher Extensions".to_string(),
                city: "New Jessica".to_string(),
                contact: Some("160022004803".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_address_column_defaults_to_empty() {
        let row = RawRow::from_pairs(
            2,
            [
                ("Provider_ID", "3"),
                ("Name", "Acme"),
                ("Type", "Grocery Store"),
                ("City", "Lake Amy"),
                ("Contact", ""),
            ],
        );

        let normalized = ProviderNormalizer.normalize(&row);
        assert_eq!(normalized.record.address, "");
        assert_eq!(normalized.record.contact, None);
        assert_eq!(
            normalized.issues.iter().collect::<Vec<_>>(),
            vec![&FieldIssue::MissingColumn { column: "address" }]
        );
    }

    #[test]
    fn test_bad_identity_is_reported() {
        let row = RawRow::from_pairs(4, [("Provider_ID", "P-1"), ("Name", "Acme")]);

        let normalized = ProviderNormalizer.normalize(&row);
        assert_eq!(normalized.record.provider_id, None);
        assert!(normalized.issues.has_invalid_id());
        assert!(normalized.into_result().is_err());
    }
}
