use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shipments::checklist::{
    infer_export_checklist, infer_import_checklist, Checklist, ExportChecklist, ImportChecklist,
};
use crate::shipments::form::FormFields;

/// Incoming (`import`) or outgoing (`export`) shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentKind {
    Import,
    Export,
}

impl ShipmentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
        }
    }

    pub const fn table(self) -> &'static str {
        match self {
            Self::Import => "imports",
            Self::Export => "exports",
        }
    }

    /// Column holding the natural identifier (import/export number).
    pub const fn key_column(self) -> &'static str {
        match self {
            Self::Import => "import_number",
            Self::Export => "export_number",
        }
    }
}

impl fmt::Display for ShipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub import_number: String,
    pub sending_lab: Option<String>,
    pub courier: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub lab_contact_name: Option<String>,
    pub lab_contact_email: Option<String>,
    pub animal_type: Option<String>,
    pub quantity: Option<i32>,
    pub protocol_number: Option<String>,
    pub status: Option<String>,
    #[serde(skip_serializing)]
    pub checklist: Option<String>,
    #[serde(skip_serializing)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub export_number: String,
    pub sending_lab: Option<String>,
    pub destination_lab: Option<String>,
    pub courier: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub lab_contact_name: Option<String>,
    pub lab_contact_email: Option<String>,
    pub animal_type: Option<String>,
    pub quantity: Option<i32>,
    pub protocol_number: Option<String>,
    pub status: Option<String>,
    #[serde(skip_serializing)]
    pub checklist: Option<String>,
    #[serde(skip_serializing)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-side behaviour shared by both shipment tables.
pub trait ShipmentRecord: Serialize + Send + Sync + Unpin + 'static {
    type Checklist: Checklist + Send + Sync;

    const KIND: ShipmentKind;

    fn number(&self) -> &str;
    fn status(&self) -> Option<&str>;
    fn checklist_blob(&self) -> Option<&str>;
    fn notes_blob(&self) -> Option<&str>;
    fn updated_at(&self) -> DateTime<Utc>;

    /// Arrival date for imports, departure date for exports.
    fn shipment_date(&self) -> Option<NaiveDate>;

    /// Free-text fields matched by list search.
    fn searchable(&self) -> Vec<&str>;

    /// The record as form values, the base that edits are merged over.
    fn to_form(&self) -> FormFields;

    fn infer_checklist(fields: &FormFields, existing: &Self::Checklist) -> Self::Checklist;
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

impl ShipmentRecord for ImportRow {
    type Checklist = ImportChecklist;

    const KIND: ShipmentKind = ShipmentKind::Import;

    fn number(&self) -> &str {
        &self.import_number
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn checklist_blob(&self) -> Option<&str> {
        self.checklist.as_deref()
    }

    fn notes_blob(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn shipment_date(&self) -> Option<NaiveDate> {
        self.arrival_date
    }

    fn searchable(&self) -> Vec<&str> {
        [
            Some(self.import_number.as_str()),
            self.sending_lab.as_deref(),
            self.courier.as_deref(),
            self.animal_type.as_deref(),
            self.lab_contact_name.as_deref(),
            self.protocol_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn to_form(&self) -> FormFields {
        FormFields {
            shipment_number: Some(self.import_number.clone()),
            sending_lab: self.sending_lab.clone(),
            destination_lab: None,
            courier: self.courier.clone(),
            arrival_date: date_text(self.arrival_date),
            departure_date: None,
            lab_contact_name: self.lab_contact_name.clone(),
            lab_contact_email: self.lab_contact_email.clone(),
            animal_type: self.animal_type.clone(),
            quantity: self.quantity.map(|q| q.to_string()),
            protocol_number: self.protocol_number.clone(),
            status: self.status.clone(),
        }
    }

    fn infer_checklist(fields: &FormFields, existing: &ImportChecklist) -> ImportChecklist {
        infer_import_checklist(fields, existing)
    }
}

impl ShipmentRecord for ExportRow {
    type Checklist = ExportChecklist;

    const KIND: ShipmentKind = ShipmentKind::Export;

    fn number(&self) -> &str {
        &self.export_number
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn checklist_blob(&self) -> Option<&str> {
        self.checklist.as_deref()
    }

    fn notes_blob(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn shipment_date(&self) -> Option<NaiveDate> {
        self.departure_date
    }

    fn searchable(&self) -> Vec<&str> {
        [
            Some(self.export_number.as_str()),
            self.sending_lab.as_deref(),
            self.destination_lab.as_deref(),
            self.courier.as_deref(),
            self.animal_type.as_deref(),
            self.lab_contact_name.as_deref(),
            self.protocol_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn to_form(&self) -> FormFields {
        FormFields {
            shipment_number: Some(self.export_number.clone()),
            sending_lab: self.sending_lab.clone(),
            destination_lab: self.destination_lab.clone(),
            courier: self.courier.clone(),
            arrival_date: None,
            departure_date: date_text(self.departure_date),
            lab_contact_name: self.lab_contact_name.clone(),
            lab_contact_email: self.lab_contact_email.clone(),
            animal_type: self.animal_type.clone(),
            quantity: self.quantity.map(|q| q.to_string()),
            protocol_number: self.protocol_number.clone(),
            status: self.status.clone(),
        }
    }

    fn infer_checklist(fields: &FormFields, existing: &ExportChecklist) -> ExportChecklist {
        infer_export_checklist(fields, existing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub shipment_kind: String,
    pub shipment_number: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing)]
    pub s3_key: String,
    pub uploaded_at: DateTime<Utc>,
}
