use super::base::EntityNormalizer;
use crate::constants::columns;
use crate::domain::{EntityKind, Receiver};
use crate::pipeline::ingestion::RawRow;
use crate::pipeline::processing::normalize::fields::FieldReader;
use crate::pipeline::processing::normalize::Normalized;

/// Normalizer for rows of the receivers file
#[derive(Debug, Default, Clone, Copy)]
pub struct ReceiverNormalizer;

impl EntityNormalizer for ReceiverNormalizer {
    type Record = Receiver;

    fn kind(&self) -> EntityKind {
        EntityKind::Receiver
    }

    fn normalize(&self, row: &RawRow) -> Normalized<Receiver> {
        let mut fields = FieldReader::new(row);

        let record = Receiver {
            receiver_id: fields.id(columns::RECEIVER_ID),
            name: fields.text(columns::NAME),
            receiver_type: fields.text(columns::TYPE),
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

    #[test]
    fn test_receiver_row() {
        let row = RawRow::from_pairs(
            1,
            [
                (" Receiver_ID", "9.0"),
                ("Name ", "Shelter Hope"),
                ("TYPE", " Shelter"),
                ("City", "Port Lisa"),
                ("Contact", "N/A"),
            ],
        );

        let normalized = ReceiverNormalizer.normalize(&row);
        let receiver = &normalized.record;
        assert_eq!(receiver.receiver_id, Some(9));
        assert_eq!(receiver.receiver_type, "Shelter");
        assert_eq!(receiver.contact, None);
        assert_eq!(normalized.issues.len(), 1);
        assert!(!normalized.issues.has_invalid_id());
    }
}
