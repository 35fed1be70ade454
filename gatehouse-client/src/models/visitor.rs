use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::{optional_relation, relation_list, Record, RecordMeta};
use crate::utils::validation::{license_plate, not_blank, phone_number};

pub const COLLECTION: &str = "visitor";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub id_card: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub visit_purpose: String,
    #[serde(default)]
    pub vehicle_plate: String,
    #[serde(default, deserialize_with = "optional_relation")]
    pub house: Option<String>,
    #[serde(default, deserialize_with = "optional_relation")]
    pub issuer: Option<String>,
    #[serde(default, deserialize_with = "relation_list")]
    pub authorized_area: Vec<String>,
    #[serde(default)]
    pub note: String,
}

impl Visitor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewVisitor {
    #[validate(custom(function = "not_blank", message = "First name is required"))]
    pub first_name: String,
    #[validate(custom(function = "not_blank", message = "Last name is required"))]
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_card: Option<String>,
    #[validate(custom(function = "phone_number", message = "Invalid phone number"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_purpose: Option<String>,
    #[validate(custom(function = "license_plate", message = "Invalid license plate"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default)]
    pub authorized_area: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Record for Visitor {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visitor() -> NewVisitor {
        NewVisitor {
            first_name: "Somchai".to_string(),
            last_name: "Jaidee".to_string(),
            phone: Some("081-234-5678".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_visitor() {
        assert!(visitor().validate().is_ok());
    }

    #[test]
    fn test_blank_first_name_rejected() {
        let mut v = visitor();
        v.first_name = String::new();

        let errors = v.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("first_name"));
    }

    #[test]
    fn test_optional_fields_only_checked_when_present() {
        let mut v = visitor();
        v.phone = None;
        v.vehicle_plate = None;
        assert!(v.validate().is_ok());

        v.phone = Some("not a phone".to_string());
        assert!(v.validate().unwrap_err().field_errors().contains_key("phone"));
    }

    #[test]
    fn test_payload_omits_unset_fields() {
        let payload = serde_json::to_value(visitor()).unwrap();
        assert!(payload.get("note").is_none());
        assert_eq!(payload["authorized_area"], serde_json::json!([]));
    }
}
