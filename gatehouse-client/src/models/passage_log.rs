use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use super::record::{optional_relation, parse_datetime, Record, RecordMeta};
use crate::utils::validation::not_blank;

pub const COLLECTION: &str = "passage_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassageType {
    Entry,
    Exit,
}

impl PassageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassageType::Entry => "entry",
            PassageType::Exit => "exit",
        }
    }
}

impl fmt::Display for PassageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" => Ok(PassageType::Entry),
            "exit" => Ok(PassageType::Exit),
            other => Err(format!("unknown passage type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    QrCode,
    Manual,
    LicensePlate,
    Face,
}

impl FromStr for VerificationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qr_code" => Ok(VerificationMethod::QrCode),
            "manual" => Ok(VerificationMethod::Manual),
            "license_plate" => Ok(VerificationMethod::LicensePlate),
            "face" => Ok(VerificationMethod::Face),
            other => Err(format!("unknown verification method '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageLog {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, deserialize_with = "optional_relation")]
    pub visitor: Option<String>,
    #[serde(default, deserialize_with = "optional_relation")]
    pub invitation: Option<String>,
    /// Kept as sent so unknown values from older rows still load.
    pub passage_type: String,
    #[serde(default, deserialize_with = "optional_relation")]
    pub location_area: Option<String>,
    #[serde(default)]
    pub verification_method: String,
    #[serde(default, deserialize_with = "optional_relation")]
    pub staff: Option<String>,
    #[serde(default)]
    pub passage_time: String,
    #[serde(default)]
    pub notes: String,
}

impl PassageLog {
    pub fn kind(&self) -> Option<PassageType> {
        self.passage_type.parse().ok()
    }

    /// `passage_time` when recorded, else the record's creation time.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.passage_time).or_else(|| self.meta.created_at())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewPassageLog {
    #[validate(custom(function = "not_blank", message = "Visitor is required"))]
    pub visitor: String,
    #[validate(custom(function = "passage_type", message = "Passage type must be entry or exit"))]
    pub passage_type: String,
    #[validate(custom(function = "not_blank", message = "Location area is required"))]
    pub location_area: String,
    #[validate(custom(function = "verification_method", message = "Unknown verification method"))]
    pub verification_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn passage_type(value: &str) -> Result<(), ValidationError> {
    value.parse::<PassageType>().map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("passage_type");
        err.message = Some(Cow::Owned(e));
        err
    })
}

fn verification_method(value: &str) -> Result<(), ValidationError> {
    value.parse::<VerificationMethod>().map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("verification_method");
        err.message = Some(Cow::Owned(e));
        err
    })
}

impl Record for PassageLog {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> NewPassageLog {
        NewPassageLog {
            visitor: "v1".to_string(),
            passage_type: "entry".to_string(),
            location_area: "a1".to_string(),
            verification_method: "qr_code".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_passage_type_parsing() {
        assert_eq!("Entry".parse::<PassageType>().unwrap(), PassageType::Entry);
        assert_eq!(" exit ".parse::<PassageType>().unwrap(), PassageType::Exit);
        assert!("visit".parse::<PassageType>().is_err());
    }

    #[test]
    fn test_invalid_enum_values_rejected() {
        assert!(entry().validate().is_ok());

        let mut bad = entry();
        bad.passage_type = "sideways".to_string();
        assert!(bad.validate().unwrap_err().field_errors().contains_key("passage_type"));

        let mut bad = entry();
        bad.verification_method = "telepathy".to_string();
        assert!(bad
            .validate()
            .unwrap_err()
            .field_errors()
            .contains_key("verification_method"));
    }

    #[test]
    fn test_occurred_at_falls_back_to_created() {
        let log: PassageLog = serde_json::from_value(json!({
            "id": "p1",
            "created": "2024-05-01 09:30:00.000Z",
            "passage_type": "entry",
            "visitor": "v1"
        }))
        .unwrap();

        assert_eq!(log.kind(), Some(PassageType::Entry));
        assert_eq!(log.occurred_at(), log.meta.created_at());
        assert!(log.occurred_at().is_some());
    }
}
