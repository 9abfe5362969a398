use serde::Serialize;

use crate::models::shipment::{ShipmentKind, ShipmentRecord};
use crate::shipments::checklist::Checklist;
use crate::shipments::notes::{parse_notes_column, NoteEntry};
use crate::shipments::status::{classify, CanonicalStatus};

/// A shipment as the rest of the service sees it.
///
/// Canonical status, checklist and notes are decoded once here, when a row
/// leaves the database layer, and carried alongside the raw record.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "", rename_all = "camelCase")]
pub struct ShipmentView<R: ShipmentRecord> {
    pub kind: ShipmentKind,
    #[serde(flatten)]
    pub record: R,
    pub canonical_status: CanonicalStatus,
    pub checklist: R::Checklist,
    pub progress: u8,
    pub notes: Vec<NoteEntry>,
}

impl<R: ShipmentRecord> ShipmentView<R> {
    pub fn from_record(record: R, placeholder_author: &str) -> Self {
        let canonical_status = classify(record.status());
        let checklist = R::Checklist::decode(record.checklist_blob());
        let notes = parse_notes_column(record.notes_blob(), placeholder_author);
        Self {
            kind: R::KIND,
            progress: checklist.progress(),
            canonical_status,
            checklist,
            notes,
            record,
        }
    }
}
