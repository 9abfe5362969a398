//! Coordinator checklists and their inference from form fields.
//!
//! Each shipment kind has a fixed six-item checklist. Items are set either by
//! an explicit checkbox action or inferred from which form fields are filled
//! in. Inference only ever turns items on: `result[k] = existing[k] || predicate[k]`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shipments::form::{is_set, FormFields};

/// Behaviour shared by the import and export checklist shapes.
pub trait Checklist: Default + Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Wire keys, in the same order as [`Checklist::flags`].
    const KEYS: [&'static str; 6];

    fn flags(&self) -> [bool; 6];

    fn from_flags(flags: [bool; 6]) -> Self;

    fn completed(&self) -> usize {
        self.flags().iter().filter(|f| **f).count()
    }

    /// Percentage of items done, rounded to the nearest integer.
    fn progress(&self) -> u8 {
        let total = Self::KEYS.len();
        ((100 * self.completed()) as f64 / total as f64).round() as u8
    }

    /// Decodes a persisted checklist blob.
    ///
    /// Never fails: absent, malformed or partial blobs decode with every
    /// missing or non-boolean item treated as not done.
    fn decode(blob: Option<&str>) -> Self {
        let parsed = blob
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| serde_json::from_str::<Value>(s).ok());
        let Some(Value::Object(map)) = parsed else {
            return Self::default();
        };
        let mut flags = [false; 6];
        for (flag, key) in flags.iter_mut().zip(Self::KEYS) {
            *flag = map.get(key).and_then(Value::as_bool).unwrap_or(false);
        }
        Self::from_flags(flags)
    }

    fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Applies explicit checkbox changes. Unlike inference these may clear an
    /// item. Unknown keys are rejected and leave the checklist untouched.
    fn apply(&self, changes: &BTreeMap<String, bool>) -> Result<Self, String> {
        if let Some(unknown) = changes.keys().find(|k| !Self::KEYS.contains(&k.as_str())) {
            return Err(format!(
                "unknown checklist item '{unknown}', expected one of: {}",
                Self::KEYS.join(", ")
            ));
        }
        let mut flags = self.flags();
        for (flag, key) in flags.iter_mut().zip(Self::KEYS) {
            if let Some(value) = changes.get(key) {
                *flag = *value;
            }
        }
        Ok(Self::from_flags(flags))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportChecklist {
    pub transfer_forms: bool,
    pub health_cert: bool,
    pub import_permit: bool,
    pub courier: bool,
    pub animal_receipt: bool,
    pub facilities_ready: bool,
}

impl Checklist for ImportChecklist {
    const KEYS: [&'static str; 6] = [
        "transferForms",
        "healthCert",
        "importPermit",
        "courier",
        "animalReceipt",
        "facilitiesReady",
    ];

    fn flags(&self) -> [bool; 6] {
        [
            self.transfer_forms,
            self.health_cert,
            self.import_permit,
            self.courier,
            self.animal_receipt,
            self.facilities_ready,
        ]
    }

    fn from_flags(flags: [bool; 6]) -> Self {
        let [transfer_forms, health_cert, import_permit, courier, animal_receipt, facilities_ready] =
            flags;
        Self {
            transfer_forms,
            health_cert,
            import_permit,
            courier,
            animal_receipt,
            facilities_ready,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportChecklist {
    pub transfer_forms: bool,
    pub health_cert: bool,
    pub export_permit: bool,
    pub courier: bool,
    pub pickup_date: bool,
    pub package_ready: bool,
}

impl Checklist for ExportChecklist {
    const KEYS: [&'static str; 6] = [
        "transferForms",
        "healthCert",
        "exportPermit",
        "courier",
        "pickupDate",
        "packageReady",
    ];

    fn flags(&self) -> [bool; 6] {
        [
            self.transfer_forms,
            self.health_cert,
            self.export_permit,
            self.courier,
            self.pickup_date,
            self.package_ready,
        ]
    }

    fn from_flags(flags: [bool; 6]) -> Self {
        let [transfer_forms, health_cert, export_permit, courier, pickup_date, package_ready] =
            flags;
        Self {
            transfer_forms,
            health_cert,
            export_permit,
            courier,
            pickup_date,
            package_ready,
        }
    }
}

fn status_says_ready(fields: &FormFields) -> bool {
    fields
        .status
        .as_deref()
        .is_some_and(|s| s.to_lowercase().contains("ready"))
}

fn contact_complete(fields: &FormFields) -> bool {
    is_set(&fields.lab_contact_email) && is_set(&fields.lab_contact_name)
}

fn animals_described(fields: &FormFields) -> bool {
    is_set(&fields.animal_type) && is_set(&fields.quantity)
}

pub fn infer_import_checklist(fields: &FormFields, existing: &ImportChecklist) -> ImportChecklist {
    ImportChecklist {
        transfer_forms: existing.transfer_forms || is_set(&fields.sending_lab),
        health_cert: existing.health_cert || animals_described(fields),
        import_permit: existing.import_permit || contact_complete(fields),
        courier: existing.courier || is_set(&fields.courier),
        animal_receipt: existing.animal_receipt || is_set(&fields.arrival_date),
        facilities_ready: existing.facilities_ready || status_says_ready(fields),
    }
}

pub fn infer_export_checklist(fields: &FormFields, existing: &ExportChecklist) -> ExportChecklist {
    ExportChecklist {
        transfer_forms: existing.transfer_forms
            || (is_set(&fields.sending_lab) && is_set(&fields.destination_lab)),
        health_cert: existing.health_cert || animals_described(fields),
        export_permit: existing.export_permit || contact_complete(fields),
        courier: existing.courier || is_set(&fields.courier),
        pickup_date: existing.pickup_date || is_set(&fields.departure_date),
        package_ready: existing.package_ready || status_says_ready(fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_import_only_sending_lab() {
        let fields = FormFields {
            sending_lab: s("Lab A"),
            courier: s(""),
            arrival_date: None,
            lab_contact_email: s(""),
            lab_contact_name: s(""),
            animal_type: s(""),
            quantity: s(""),
            ..Default::default()
        };
        let result = infer_import_checklist(&fields, &ImportChecklist::default());
        assert_eq!(
            result,
            ImportChecklist {
                transfer_forms: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_import_all_predicates() {
        let fields = FormFields {
            sending_lab: s("Lab A"),
            courier: s("World Courier"),
            arrival_date: s("2024-05-01"),
            lab_contact_email: s("pi@lab-a.org"),
            lab_contact_name: s("Dr. Rivera"),
            animal_type: s("Mouse"),
            quantity: s("12"),
            status: s("Facilities READY"),
            ..Default::default()
        };
        let result = infer_import_checklist(&fields, &ImportChecklist::default());
        assert_eq!(result.completed(), 6);
        assert_eq!(result.progress(), 100);
    }

    #[test]
    fn test_import_pairs_need_both_fields() {
        let fields = FormFields {
            lab_contact_email: s("pi@lab-a.org"),
            animal_type: s("Rat"),
            ..Default::default()
        };
        let result = infer_import_checklist(&fields, &ImportChecklist::default());
        assert!(!result.import_permit);
        assert!(!result.health_cert);
    }

    #[test]
    fn test_export_transfer_forms_needs_both_labs() {
        let only_sender = FormFields {
            sending_lab: s("Lab A"),
            ..Default::default()
        };
        assert!(!infer_export_checklist(&only_sender, &ExportChecklist::default()).transfer_forms);

        let both = FormFields {
            sending_lab: s("Lab A"),
            destination_lab: s("Lab B"),
            departure_date: s("2024-06-02"),
            status: s("Ready for Pickup"),
            ..Default::default()
        };
        let result = infer_export_checklist(&both, &ExportChecklist::default());
        assert!(result.transfer_forms);
        assert!(result.pickup_date);
        assert!(result.package_ready);
        assert!(!result.courier);
    }

    #[test]
    fn test_existing_true_survives_empty_form() {
        let existing = ExportChecklist {
            courier: true,
            export_permit: true,
            ..Default::default()
        };
        let result = infer_export_checklist(&FormFields::default(), &existing);
        assert_eq!(result, existing);
    }

    #[test]
    fn test_progress_rounding() {
        let three = ImportChecklist::from_flags([true, true, true, false, false, false]);
        assert_eq!(three.progress(), 50);
        assert_eq!(ImportChecklist::default().progress(), 0);
        assert_eq!(ImportChecklist::from_flags([true; 6]).progress(), 100);
        let one = ExportChecklist::from_flags([false, false, false, false, false, true]);
        assert_eq!(one.progress(), 17);
        let two = ExportChecklist::from_flags([true, true, false, false, false, false]);
        assert_eq!(two.progress(), 33);
    }

    #[test]
    fn test_json_round_trip_uses_wire_keys() {
        let checklist = ImportChecklist {
            transfer_forms: true,
            animal_receipt: true,
            ..Default::default()
        };
        let json = checklist.encode().unwrap();
        for key in ImportChecklist::KEYS {
            assert!(json.contains(key), "missing {key} in {json}");
        }
        assert_eq!(ImportChecklist::decode(Some(&json)), checklist);
    }

    #[test]
    fn test_decode_tolerates_bad_blobs() {
        assert_eq!(ImportChecklist::decode(None), ImportChecklist::default());
        assert_eq!(ImportChecklist::decode(Some("")), ImportChecklist::default());
        assert_eq!(
            ImportChecklist::decode(Some("{not json")),
            ImportChecklist::default()
        );
        assert_eq!(ImportChecklist::decode(Some("[true]")), ImportChecklist::default());

        let partial = ExportChecklist::decode(Some(r#"{"courier":true,"pickupDate":"yes"}"#));
        assert_eq!(
            partial,
            ExportChecklist {
                courier: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_apply_can_clear_and_rejects_unknown_keys() {
        let existing = ImportChecklist::from_flags([true; 6]);
        let mut changes = BTreeMap::new();
        changes.insert("courier".to_string(), false);
        let updated = existing.apply(&changes).unwrap();
        assert!(!updated.courier);
        assert_eq!(updated.completed(), 5);

        changes.insert("exportPermit".to_string(), true);
        assert!(existing.apply(&changes).is_err());
    }

    fn form_strategy() -> impl Strategy<Value = FormFields> {
        let field = || prop::option::of(prop::sample::select(vec!["", " ", "x", "Lab B", "ready"]));
        (
            (field(), field(), field(), field(), field(), field()),
            (field(), field(), field(), field()),
        )
            .prop_map(|((a, b, c, d, e, f), (g, h, i, j))| FormFields {
                sending_lab: a.map(String::from),
                destination_lab: b.map(String::from),
                courier: c.map(String::from),
                arrival_date: d.map(String::from),
                departure_date: e.map(String::from),
                lab_contact_name: f.map(String::from),
                lab_contact_email: g.map(String::from),
                animal_type: h.map(String::from),
                quantity: i.map(String::from),
                status: j.map(String::from),
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn import_inference_never_clears(flags in any::<[bool; 6]>(), fields in form_strategy()) {
            let existing = ImportChecklist::from_flags(flags);
            let result = infer_import_checklist(&fields, &existing);
            for (before, after) in existing.flags().iter().zip(result.flags()) {
                prop_assert!(!before || after);
            }
        }

        #[test]
        fn export_inference_never_clears(flags in any::<[bool; 6]>(), fields in form_strategy()) {
            let existing = ExportChecklist::from_flags(flags);
            let result = infer_export_checklist(&fields, &existing);
            for (before, after) in existing.flags().iter().zip(result.flags()) {
                prop_assert!(!before || after);
            }
            // Re-running on its own output is a fixed point.
            prop_assert_eq!(infer_export_checklist(&fields, &result), result);
        }

        #[test]
        fn progress_is_bounded(flags in any::<[bool; 6]>()) {
            prop_assert!(ImportChecklist::from_flags(flags).progress() <= 100);
        }
    }
}
