use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::record::{format_datetime, optional_relation, parse_datetime, relation_list, Record, RecordMeta};
use crate::utils::validation::not_blank;

pub const COLLECTION: &str = "invitation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub visitor_name: String,
    #[serde(default, deserialize_with = "optional_relation")]
    pub house: Option<String>,
    #[serde(default, deserialize_with = "optional_relation")]
    pub issuer: Option<String>,
    #[serde(default, deserialize_with = "relation_list")]
    pub authorized_area: Vec<String>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub note: String,
}

impl Invitation {
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.start_time)
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.end_time)
    }

    /// Active flag set and `at` inside the window. An open end means no
    /// expiry.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        let started = self.starts_at().map_or(true, |start| start <= at);
        let not_ended = self.ends_at().map_or(true, |end| at < end);
        started && not_ended
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct NewInvitation {
    #[validate(custom(function = "not_blank", message = "Visitor name is required"))]
    pub visitor_name: String,
    #[validate(custom(function = "not_blank", message = "House is required"))]
    pub house: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub authorized_area: Vec<String>,
    #[serde(serialize_with = "backend_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(serialize_with = "backend_datetime")]
    pub end_time: DateTime<Utc>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn validate_window(invitation: &NewInvitation) -> Result<(), ValidationError> {
    if invitation.end_time <= invitation.start_time {
        let mut err = ValidationError::new("window");
        err.message = Some(Cow::Borrowed("End time must be after start time"));
        return Err(err);
    }
    Ok(())
}

fn backend_datetime<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_datetime(value))
}

impl Record for Invitation {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn new_invitation(hours: i64) -> NewInvitation {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        NewInvitation {
            visitor_name: "Courier".to_string(),
            house: "h1".to_string(),
            issuer: None,
            authorized_area: vec!["a1".to_string()],
            start_time: start,
            end_time: start + Duration::hours(hours),
            active: true,
            note: None,
        }
    }

    #[test]
    fn test_window_must_be_positive() {
        assert!(new_invitation(4).validate().is_ok());
        assert!(new_invitation(0).validate().is_err());
        assert!(new_invitation(-1).validate().is_err());
    }

    #[test]
    fn test_payload_uses_backend_timestamps() {
        let payload = serde_json::to_value(new_invitation(4)).unwrap();
        assert_eq!(payload["start_time"], "2024-05-01 09:00:00.000Z");
        assert_eq!(payload["end_time"], "2024-05-01 13:00:00.000Z");
    }

    #[test]
    fn test_is_valid_at() {
        let invitation: Invitation = serde_json::from_value(json!({
            "id": "i1",
            "visitor_name": "Courier",
            "start_time": "2024-05-01 09:00:00.000Z",
            "end_time": "2024-05-01 13:00:00.000Z",
            "active": true
        }))
        .unwrap();

        let at = |h| Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap();
        assert!(!invitation.is_valid_at(at(8)));
        assert!(invitation.is_valid_at(at(9)));
        assert!(!invitation.is_valid_at(at(13)));

        let inactive = Invitation {
            active: false,
            ..invitation
        };
        assert!(!inactive.is_valid_at(at(10)));
    }
}
