use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// Loosely-typed bag of shipment form values as the client submits them.
///
/// Every field is optional. Strings, numbers and booleans are all accepted and
/// kept in their textual form; `null` and missing fields are unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        alias = "importNumber",
        alias = "exportNumber"
    )]
    pub shipment_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sending_lab: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub destination_lab: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub courier: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arrival_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub departure_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lab_contact_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lab_contact_email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub animal_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub protocol_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        // Arrays and objects have no meaning for a form field.
        Some(_) => None,
    })
}

/// True when the field holds a non-blank value.
pub fn is_set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Trimmed value of a set field; `None` for blank or missing fields.
pub fn text(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Form values after validation, typed for storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedForm {
    pub sending_lab: Option<String>,
    pub destination_lab: Option<String>,
    pub courier: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub departure_date: Option<NaiveDate>,
    pub lab_contact_name: Option<String>,
    pub lab_contact_email: Option<String>,
    pub animal_type: Option<String>,
    pub quantity: Option<i32>,
    pub protocol_number: Option<String>,
    pub status: Option<String>,
}

impl FormFields {
    /// Overlays `self` on top of `base`: set fields replace, unset fields keep
    /// the base value.
    pub fn merged_over(&self, base: &FormFields) -> FormFields {
        let pick = |new: &Option<String>, old: &Option<String>| {
            if new.is_some() {
                new.clone()
            } else {
                old.clone()
            }
        };
        FormFields {
            shipment_number: pick(&self.shipment_number, &base.shipment_number),
            sending_lab: pick(&self.sending_lab, &base.sending_lab),
            destination_lab: pick(&self.destination_lab, &base.destination_lab),
            courier: pick(&self.courier, &base.courier),
            arrival_date: pick(&self.arrival_date, &base.arrival_date),
            departure_date: pick(&self.departure_date, &base.departure_date),
            lab_contact_name: pick(&self.lab_contact_name, &base.lab_contact_name),
            lab_contact_email: pick(&self.lab_contact_email, &base.lab_contact_email),
            animal_type: pick(&self.animal_type, &base.animal_type),
            quantity: pick(&self.quantity, &base.quantity),
            protocol_number: pick(&self.protocol_number, &base.protocol_number),
            status: pick(&self.status, &base.status),
        }
    }

    /// Checks field formats and converts to storage types.
    ///
    /// The natural shipment number is validated separately by the caller,
    /// since it is only required on create.
    pub fn validate(&self) -> Result<ValidatedForm, AppError> {
        let lab_contact_email = text(&self.lab_contact_email);
        if let Some(email) = &lab_contact_email {
            if !email.contains('@') {
                return Err(AppError::Validation(format!(
                    "labContactEmail '{email}' is not a valid email address"
                )));
            }
        }

        let quantity = match text(&self.quantity) {
            None => None,
            Some(q) => match q.parse::<i32>() {
                Ok(n) if n >= 0 => Some(n),
                _ => {
                    return Err(AppError::Validation(format!(
                        "quantity '{q}' must be a non-negative whole number"
                    )))
                }
            },
        };

        Ok(ValidatedForm {
            sending_lab: text(&self.sending_lab),
            destination_lab: text(&self.destination_lab),
            courier: text(&self.courier),
            arrival_date: parse_date("arrivalDate", &self.arrival_date)?,
            departure_date: parse_date("departureDate", &self.departure_date)?,
            lab_contact_name: text(&self.lab_contact_name),
            lab_contact_email,
            animal_type: text(&self.animal_type),
            quantity,
            protocol_number: text(&self.protocol_number),
            status: text(&self.status),
        })
    }

    /// The trimmed natural shipment number, required on create.
    pub fn require_number(&self) -> Result<String, AppError> {
        text(&self.shipment_number)
            .ok_or_else(|| AppError::Validation("shipmentNumber cannot be empty".to_string()))
    }
}

fn parse_date(name: &str, field: &Option<String>) -> Result<Option<NaiveDate>, AppError> {
    text(field)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
                AppError::Validation(format!("{name} '{s}' must be a date in YYYY-MM-DD format"))
            })
        })
        .transpose()
}
