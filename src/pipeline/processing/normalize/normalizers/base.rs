use crate::domain::EntityKind;
use crate::pipeline::ingestion::RawRow;
use crate::pipeline::processing::normalize::Normalized;

/// Base trait for entity normalizers.
///
/// Implementations are pure: the same raw row always yields the same record
/// and the same issues, and normalization never fails outright.
pub trait EntityNormalizer {
    type Record;

    /// Which entity this normalizer produces
    fn kind(&self) -> EntityKind;

    /// Normalize one raw row
    fn normalize(&self, row: &RawRow) -> Normalized<Self::Record>;
}
