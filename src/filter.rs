//! Drops records that cannot be placed on any sequence.

use tracing::debug;

use crate::model::SubSnpCoreFields;

/// Keeps records with chromosome or contig coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingCoordinatesFilter;

impl MissingCoordinatesFilter {
    pub fn new() -> Self {
        Self
    }

    /// `Some(record)` unchanged when it has a placement, `None` otherwise.
    pub fn process(&self, record: SubSnpCoreFields) -> Option<SubSnpCoreFields> {
        if record.variant_coordinates().is_none() {
            debug!(
                ss_id = record.ss_id,
                rs_id = record.rs_id,
                batch = %record.batch_name,
                "Variant filtered out because it does not have a genomic location"
            );
            return None;
        }

        Some(record)
    }
}
